//! Start-up configuration for the trail API server.
//!
//! Read from the environment once in [`crate::run_server`] and handed to
//! request handlers through [`crate::AppState`].

/// Page size used when neither the request nor `API_PAGE_SIZE` sets one.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Largest page a client may request when `API_MAX_PAGE_SIZE` is unset.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 5040;

/// Listing page-size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    default_size: u32,
    max_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_MAX_PAGE_SIZE)
    }
}

impl PaginationConfig {
    /// Builds a config. Zero falls back to the built-in value, and a
    /// default larger than the maximum is clamped to it.
    #[must_use]
    pub fn new(default_size: u32, max_size: u32) -> Self {
        let max_size = if max_size == 0 {
            DEFAULT_MAX_PAGE_SIZE
        } else {
            max_size
        };
        let default_size = if default_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            default_size
        };

        Self {
            default_size: default_size.min(max_size),
            max_size,
        }
    }

    /// Reads `API_PAGE_SIZE` and `API_MAX_PAGE_SIZE`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(
            env_u32("API_PAGE_SIZE").unwrap_or(DEFAULT_PAGE_SIZE),
            env_u32("API_MAX_PAGE_SIZE").unwrap_or(DEFAULT_MAX_PAGE_SIZE),
        )
    }

    /// The page size used when the client does not ask for one.
    #[must_use]
    pub const fn default_size(&self) -> u32 {
        self.default_size
    }

    /// The hard upper bound.
    #[must_use]
    pub const fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Resolves a `page_size` query value. Missing, unparseable or zero
    /// values use the default; larger values are capped at the maximum.
    #[must_use]
    pub fn page_size(&self, requested: Option<&str>) -> u32 {
        requested
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|size| *size > 0)
            .map_or(self.default_size, |size| size.min(self.max_size))
    }
}

/// Listen address and pagination limits.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind.
    pub bind_addr: String,
    /// TCP port.
    pub port: u16,
    /// Listing limits.
    pub pagination: PaginationConfig,
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, `PORT` and the pagination variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            pagination: PaginationConfig::from_env(),
        }
    }
}

fn env_u32(name: &str) -> Option<u32> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::warn!("Ignoring {name}={value:?}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PaginationConfig::default();
        assert_eq!(config.default_size(), 200);
        assert_eq!(config.max_size(), 5040);
    }

    #[test]
    fn clamps_default_to_max() {
        let config = PaginationConfig::new(500, 100);
        assert_eq!(config.default_size(), 100);
        assert_eq!(config.max_size(), 100);
    }

    #[test]
    fn zero_falls_back() {
        assert_eq!(PaginationConfig::new(0, 0), PaginationConfig::default());
    }

    #[test]
    fn resolves_requested_page_size() {
        let config = PaginationConfig::new(20, 50);
        assert_eq!(config.page_size(None), 20);
        assert_eq!(config.page_size(Some("10")), 10);
        assert_eq!(config.page_size(Some("500")), 50);
        assert_eq!(config.page_size(Some("0")), 20);
        assert_eq!(config.page_size(Some("-3")), 20);
        assert_eq!(config.page_size(Some("ten")), 20);
    }
}
