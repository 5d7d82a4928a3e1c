#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Trail record kinds, the difficulty taxonomy, and the fixed-point length
//! type shared by every ihike crate.
//!
//! Route and way records are structurally identical. Everything that
//! differs between them (the categorical property key, its default value,
//! and the placeholder name) lives on [`TrailKind`], so the import and
//! query code is written once and parameterized by kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

/// The two record kinds imported from OSM exports.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrailKind {
    /// OSM `route=*` relations (hiking routes).
    Route,
    /// OSM `highway=*` ways (paths, tracks, footways).
    Ways,
}

impl TrailKind {
    /// Every kind, in a stable order.
    pub const ALL: &[Self] = &[Self::Route, Self::Ways];

    /// The feature property (and API field) holding this kind's category.
    #[must_use]
    pub const fn category_key(self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Ways => "highway",
        }
    }

    /// Category stored when the source feature does not supply one.
    #[must_use]
    pub const fn default_category(self) -> &'static str {
        match self {
            Self::Route => "hiking",
            Self::Ways => "path",
        }
    }

    /// Name stored when the source feature does not supply one.
    #[must_use]
    pub const fn default_name(self) -> &'static str {
        match self {
            Self::Route => "Unnamed Route",
            Self::Ways => "Unnamed Path",
        }
    }
}

/// Internal difficulty tier derived from the OSM `sac_scale` value.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Difficulty {
    /// No scale supplied, or a scale outside the known vocabulary.
    #[default]
    Unknown,
    /// `hiking`
    Easy,
    /// `mountain_hiking`
    Moderate,
    /// `demanding_mountain_hiking`
    Challenging,
    /// `alpine_hiking`
    Hard,
    /// `demanding_alpine_hiking`
    VeryHard,
    /// `difficult_alpine_hiking`
    Expert,
}

impl Difficulty {
    /// Every tier, from least to most difficult.
    pub const ALL: &[Self] = &[
        Self::Unknown,
        Self::Easy,
        Self::Moderate,
        Self::Challenging,
        Self::Hard,
        Self::VeryHard,
        Self::Expert,
    ];
}

/// The six-level SAC hiking scale as tagged in OSM (`sac_scale=*`).
///
/// Parsing is exact and case-sensitive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum SacScale {
    /// T1
    Hiking,
    /// T2
    MountainHiking,
    /// T3
    DemandingMountainHiking,
    /// T4
    AlpineHiking,
    /// T5
    DemandingAlpineHiking,
    /// T6
    DifficultAlpineHiking,
}

impl SacScale {
    /// Every scale value, T1 through T6.
    pub const ALL: &[Self] = &[
        Self::Hiking,
        Self::MountainHiking,
        Self::DemandingMountainHiking,
        Self::AlpineHiking,
        Self::DemandingAlpineHiking,
        Self::DifficultAlpineHiking,
    ];

    /// The difficulty tier this scale value maps to.
    #[must_use]
    pub const fn difficulty(self) -> Difficulty {
        match self {
            Self::Hiking => Difficulty::Easy,
            Self::MountainHiking => Difficulty::Moderate,
            Self::DemandingMountainHiking => Difficulty::Challenging,
            Self::AlpineHiking => Difficulty::Hard,
            Self::DemandingAlpineHiking => Difficulty::VeryHard,
            Self::DifficultAlpineHiking => Difficulty::Expert,
        }
    }
}

/// Errors produced when constructing a [`LengthKm`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LengthError {
    /// Input was NaN or infinite.
    #[error("length is not a finite number")]
    NotFinite,
    /// Input was below zero.
    #[error("length must not be negative")]
    Negative,
    /// Input does not fit `NUMERIC(9,3)`.
    #[error("length exceeds {max} km")]
    TooLarge {
        /// Largest representable length, formatted.
        max: String,
    },
    /// Input was not a decimal number.
    #[error("invalid length {value:?}")]
    Unparseable {
        /// The rejected input.
        value: String,
    },
}

/// A non-negative length in kilometres with exactly three decimal places.
///
/// Stored as an integer count of thousandths (metres), matching the
/// `NUMERIC(9,3)` column it is persisted to. Zero is a valid value but
/// never a final one: it marks a record whose length still needs to be
/// computed from its geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LengthKm(i64);

impl LengthKm {
    /// The "needs backfill" sentinel.
    pub const ZERO: Self = Self(0);

    /// Largest value `NUMERIC(9,3)` can hold, in thousandths.
    pub const MAX_MILLIS: i64 = 999_999_999;

    /// Creates a length from a count of thousandths of a kilometre.
    ///
    /// # Errors
    ///
    /// Returns [`LengthError`] if `millis` is negative or too large.
    pub fn from_millis(millis: i64) -> Result<Self, LengthError> {
        if millis < 0 {
            return Err(LengthError::Negative);
        }
        if millis > Self::MAX_MILLIS {
            return Err(LengthError::TooLarge {
                max: Self(Self::MAX_MILLIS).to_string(),
            });
        }
        Ok(Self(millis))
    }

    /// Creates a length from kilometres, rounding half away from zero to
    /// three decimal places.
    ///
    /// # Errors
    ///
    /// Returns [`LengthError`] if `km` is not finite, negative, or too
    /// large.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn from_km(km: f64) -> Result<Self, LengthError> {
        if !km.is_finite() {
            return Err(LengthError::NotFinite);
        }
        if km < 0.0 {
            return Err(LengthError::Negative);
        }
        let millis = (km * 1000.0).round();
        if millis > Self::MAX_MILLIS as f64 {
            return Err(LengthError::TooLarge {
                max: Self(Self::MAX_MILLIS).to_string(),
            });
        }
        Self::from_millis(millis as i64)
    }

    /// Thousandths of a kilometre.
    #[must_use]
    pub const fn millis(self) -> i64 {
        self.0
    }

    /// Kilometres as a float, for display and arithmetic only.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn km(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Whether this is a usable final length (strictly above zero).
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for LengthKm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.0 / 1000, self.0 % 1000)
    }
}

impl FromStr for LengthKm {
    type Err = LengthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let km: f64 = trimmed.parse().map_err(|_| LengthError::Unparseable {
            value: trimmed.to_string(),
        })?;
        Self::from_km(km)
    }
}

impl Serialize for LengthKm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LengthKm {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LengthVisitor;

        impl serde::de::Visitor<'_> for LengthVisitor {
            type Value = LengthKm;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative decimal number of kilometres")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Self::Value, E> {
                LengthKm::from_km(v).map_err(E::custom)
            }

            #[allow(clippy::cast_precision_loss)]
            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                LengthKm::from_km(v as f64).map_err(E::custom)
            }

            #[allow(clippy::cast_precision_loss)]
            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                LengthKm::from_km(v as f64).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(LengthVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sac_scale_maps_to_one_tier_each() {
        let tiers: Vec<Difficulty> = SacScale::ALL.iter().map(|s| s.difficulty()).collect();
        assert_eq!(tiers, Difficulty::ALL[1..].to_vec());
    }

    #[test]
    fn sac_scale_parses_osm_values() {
        assert_eq!(
            "demanding_mountain_hiking".parse::<SacScale>().unwrap(),
            SacScale::DemandingMountainHiking
        );
        assert!("Hiking".parse::<SacScale>().is_err());
        assert!("T1".parse::<SacScale>().is_err());
    }

    #[test]
    fn difficulty_uses_snake_case_names() {
        assert_eq!(Difficulty::VeryHard.to_string(), "very_hard");
        assert_eq!("very_hard".parse::<Difficulty>().unwrap(), Difficulty::VeryHard);
        assert_eq!(
            serde_json::to_string(&Difficulty::Unknown).unwrap(),
            "\"unknown\""
        );
    }

    #[test]
    fn kind_descriptors() {
        assert_eq!(TrailKind::Route.category_key(), "route");
        assert_eq!(TrailKind::Ways.category_key(), "highway");
        assert_eq!(TrailKind::Route.default_category(), "hiking");
        assert_eq!(TrailKind::Ways.default_name(), "Unnamed Path");
        assert_eq!("ways".parse::<TrailKind>().unwrap(), TrailKind::Ways);
    }

    #[test]
    fn length_rounds_to_three_places() {
        assert_eq!(LengthKm::from_km(12.5).unwrap().millis(), 12_500);
        assert_eq!(LengthKm::from_km(1.234_56).unwrap().millis(), 1_235);
        assert_eq!(LengthKm::from_km(0.000_4).unwrap(), LengthKm::ZERO);
    }

    #[test]
    fn length_rejects_out_of_range() {
        assert_eq!(LengthKm::from_km(f64::NAN), Err(LengthError::NotFinite));
        assert_eq!(LengthKm::from_km(-1.0), Err(LengthError::Negative));
        assert!(matches!(
            LengthKm::from_km(1_000_000.0),
            Err(LengthError::TooLarge { .. })
        ));
        assert!(LengthKm::from_km(999_999.999).is_ok());
    }

    #[test]
    fn length_displays_fixed_point() {
        assert_eq!(LengthKm::from_millis(12_500).unwrap().to_string(), "12.500");
        assert_eq!(LengthKm::from_millis(7).unwrap().to_string(), "0.007");
        assert_eq!(LengthKm::ZERO.to_string(), "0.000");
    }

    #[test]
    fn length_parses_and_serializes() {
        let length: LengthKm = " 3.25 ".parse().unwrap();
        assert_eq!(length.millis(), 3_250);
        assert_eq!(serde_json::to_string(&length).unwrap(), "\"3.250\"");
        let from_number: LengthKm = serde_json::from_str("4.5").unwrap();
        assert_eq!(from_number.millis(), 4_500);
        assert!("abc".parse::<LengthKm>().is_err());
    }
}
