#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature records as read from OSM `GeoJSON` exports, and the normalized
//! attribute set the importer works with.
//!
//! Export properties are loosely typed: `osm_id` shows up as a number or a
//! string, `length` as a number, a numeric string, or `"null"`. The
//! [`FeatureProperties`] record names every key the importer understands
//! and keeps the two numeric ones raw so the normalizer can decide how
//! forgiving to be.

use ihike_trail_models::{Difficulty, LengthKm, TrailKind};
use serde::Serialize;
use serde_json::{Map, Value};

/// The properties of one source feature that the importer reads.
///
/// String fields hold the value exactly as supplied (numbers are
/// stringified); `None` means the key was missing or `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureProperties {
    /// `osm_id`, uninterpreted.
    pub osm_id: Option<Value>,
    /// `name`
    pub name: Option<String>,
    /// `route` (route relations only)
    pub route: Option<String>,
    /// `highway` (ways only)
    pub highway: Option<String>,
    /// `sac_scale`
    pub sac_scale: Option<String>,
    /// `length` in kilometres, uninterpreted.
    pub length: Option<Value>,
    /// `website`
    pub website: Option<String>,
}

impl FeatureProperties {
    /// Reads the known keys out of a `GeoJSON` properties object. Unknown
    /// keys are ignored.
    #[must_use]
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            osm_id: raw_value(map, "osm_id"),
            name: string_value(map, "name"),
            route: string_value(map, "route"),
            highway: string_value(map, "highway"),
            sac_scale: string_value(map, "sac_scale"),
            length: raw_value(map, "length"),
            website: string_value(map, "website"),
        }
    }

    /// The raw category value for `kind` (`route` or `highway`).
    #[must_use]
    pub fn category(&self, kind: TrailKind) -> Option<&str> {
        match kind {
            TrailKind::Route => self.route.as_deref(),
            TrailKind::Ways => self.highway.as_deref(),
        }
    }
}

fn raw_value(map: &Map<String, Value>, key: &str) -> Option<Value> {
    map.get(key).filter(|v| !v.is_null()).cloned()
}

fn string_value(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// One feature pulled from a source document.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeature {
    /// Zero-based position in the source document.
    pub index: usize,
    /// Known properties (empty when the feature had none).
    pub properties: FeatureProperties,
    /// The `geometry` member, or `None` when it was missing, `null`, or
    /// an empty object.
    pub geometry: Option<Value>,
}

/// A feature's attributes after normalization.
///
/// Optional fields stay optional here; defaults for new records are
/// applied through the `*_or_default` accessors so the update path can
/// still tell "not supplied" from "supplied".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedFeature {
    /// Parsed `osm_id`.
    pub external_id: Option<i64>,
    /// Non-blank name.
    pub name: Option<String>,
    /// Non-blank category for the record kind.
    pub category: Option<String>,
    /// Raw `sac_scale`, preserved for provenance.
    pub scale_raw: Option<String>,
    /// Tier derived from `scale_raw`.
    pub difficulty: Difficulty,
    /// Supplied positive length.
    pub length: Option<LengthKm>,
    /// Non-blank website.
    pub website: Option<String>,
}

impl NormalizedFeature {
    /// Name to store on a new record.
    #[must_use]
    pub fn name_or_default(&self, kind: TrailKind) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| kind.default_name().to_string())
    }

    /// Category to store on a new record.
    #[must_use]
    pub fn category_or_default(&self, kind: TrailKind) -> String {
        self.category
            .clone()
            .unwrap_or_else(|| kind.default_category().to_string())
    }

    /// Website to store on a new record (empty when not supplied).
    #[must_use]
    pub fn website_or_default(&self) -> String {
        self.website.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_known_keys() {
        let map = json!({
            "osm_id": 42,
            "name": "Höhenweg",
            "route": "hiking",
            "sac_scale": "alpine_hiking",
            "length": "12.5",
            "website": "https://example.org",
            "operator": "ignored"
        });
        let props = FeatureProperties::from_map(map.as_object().unwrap());
        assert_eq!(props.osm_id, Some(json!(42)));
        assert_eq!(props.name.as_deref(), Some("Höhenweg"));
        assert_eq!(props.category(TrailKind::Route), Some("hiking"));
        assert_eq!(props.category(TrailKind::Ways), None);
        assert_eq!(props.length, Some(json!("12.5")));
    }

    #[test]
    fn null_values_are_absent() {
        let map = json!({"osm_id": null, "name": null, "highway": 7});
        let props = FeatureProperties::from_map(map.as_object().unwrap());
        assert_eq!(props.osm_id, None);
        assert_eq!(props.name, None);
        assert_eq!(props.highway.as_deref(), Some("7"));
    }

    #[test]
    fn defaults_follow_kind() {
        let feature = NormalizedFeature {
            external_id: None,
            name: None,
            category: None,
            scale_raw: None,
            difficulty: Difficulty::Unknown,
            length: None,
            website: None,
        };
        assert_eq!(feature.name_or_default(TrailKind::Route), "Unnamed Route");
        assert_eq!(feature.category_or_default(TrailKind::Ways), "path");
        assert_eq!(feature.website_or_default(), "");
    }
}
