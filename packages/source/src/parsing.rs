//! Attribute normalization for OSM trail features.
//!
//! None of these functions fail. Values that cannot be interpreted degrade
//! to "absent" (or [`Difficulty::Unknown`]) and the importer carries on;
//! an absent length means the datastore computes one from the geometry.

use ihike_source_models::{NormalizedFeature, RawFeature};
use ihike_trail_models::{Difficulty, LengthKm, SacScale, TrailKind};
use serde_json::Value;

/// Literal some exporters write instead of an actual JSON `null`.
const NULL_MARKER: &str = "null";

/// Maps a raw `sac_scale` value to its difficulty tier.
///
/// The value is trimmed and then matched exactly (case-sensitive) against
/// the six SAC scale names. Anything else, including an empty or missing
/// value, is [`Difficulty::Unknown`].
#[must_use]
pub fn difficulty_for(scale_raw: Option<&str>) -> Difficulty {
    scale_raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<SacScale>().ok())
        .map_or(Difficulty::Unknown, SacScale::difficulty)
}

/// Parses a supplied `length` (kilometres) from a number or numeric string.
///
/// Missing values, empty strings, the `"null"` marker, unparseable text,
/// and anything that is not strictly positive after rounding to three
/// decimals all yield `None`.
#[must_use]
pub fn length_from(raw: Option<&Value>) -> Option<LengthKm> {
    match raw? {
        Value::String(s) => length_from_str(s),
        Value::Number(n) => n.as_f64().and_then(positive_length),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

/// String form of [`length_from`].
#[must_use]
pub fn length_from_str(raw: &str) -> Option<LengthKm> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == NULL_MARKER {
        return None;
    }
    trimmed.parse::<f64>().ok().and_then(positive_length)
}

fn positive_length(km: f64) -> Option<LengthKm> {
    LengthKm::from_km(km).ok().filter(|l| l.is_positive())
}

/// Parses an `osm_id` from an integer, an integral float, or an integer
/// string. Anything else is `None`.
#[must_use]
pub fn external_id_from(raw: Option<&Value>) -> Option<i64> {
    match raw? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| n.as_f64().and_then(integral_f64)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == NULL_MARKER {
                return None;
            }
            trimmed.parse().ok()
        }
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral_f64(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then(|| f as i64)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Normalizes the properties of `feature` for a record of `kind`.
///
/// Degradations (an `osm_id` or `length` that was supplied but could not
/// be used) are logged at debug level and otherwise ignored.
#[must_use]
pub fn normalize(feature: &RawFeature, kind: TrailKind) -> NormalizedFeature {
    let props = &feature.properties;

    let external_id = external_id_from(props.osm_id.as_ref());
    if external_id.is_none() && props.osm_id.is_some() {
        log::debug!(
            "feature {}: ignoring unparseable osm_id {:?}",
            feature.index,
            props.osm_id
        );
    }

    let length = length_from(props.length.as_ref());
    if length.is_none() && props.length.is_some() {
        log::debug!(
            "feature {}: ignoring unusable length {:?}",
            feature.index,
            props.length
        );
    }

    let scale_raw = props.sac_scale.clone().filter(|s| !s.is_empty());

    NormalizedFeature {
        external_id,
        name: non_blank(props.name.as_deref()),
        category: non_blank(props.category(kind)),
        difficulty: difficulty_for(scale_raw.as_deref()),
        scale_raw,
        length,
        website: non_blank(props.website.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ihike_source_models::FeatureProperties;
    use serde_json::json;

    #[test]
    fn maps_every_sac_scale() {
        let expected = [
            ("hiking", Difficulty::Easy),
            ("mountain_hiking", Difficulty::Moderate),
            ("demanding_mountain_hiking", Difficulty::Challenging),
            ("alpine_hiking", Difficulty::Hard),
            ("demanding_alpine_hiking", Difficulty::VeryHard),
            ("difficult_alpine_hiking", Difficulty::Expert),
        ];
        for (scale, tier) in expected {
            assert_eq!(difficulty_for(Some(scale)), tier, "{scale}");
        }
    }

    #[test]
    fn unmapped_scales_are_unknown() {
        assert_eq!(difficulty_for(None), Difficulty::Unknown);
        assert_eq!(difficulty_for(Some("")), Difficulty::Unknown);
        assert_eq!(difficulty_for(Some("T3")), Difficulty::Unknown);
        assert_eq!(difficulty_for(Some("Alpine_Hiking")), Difficulty::Unknown);
        assert_eq!(difficulty_for(Some("alpine hiking")), Difficulty::Unknown);
    }

    #[test]
    fn trims_scale_before_lookup() {
        assert_eq!(difficulty_for(Some("  hiking \n")), Difficulty::Easy);
    }

    #[test]
    fn length_sentinels_are_absent() {
        assert_eq!(length_from(None), None);
        assert_eq!(length_from(Some(&json!(null))), None);
        assert_eq!(length_from(Some(&json!(""))), None);
        assert_eq!(length_from(Some(&json!("null"))), None);
        assert_eq!(length_from(Some(&json!("0"))), None);
        assert_eq!(length_from(Some(&json!(0))), None);
        assert_eq!(length_from(Some(&json!("-3.2"))), None);
        assert_eq!(length_from(Some(&json!("not-a-number"))), None);
        assert_eq!(length_from(Some(&json!(true))), None);
    }

    #[test]
    fn parses_positive_lengths() {
        let expected = LengthKm::from_millis(12_500).unwrap();
        assert_eq!(length_from(Some(&json!("12.5"))), Some(expected));
        assert_eq!(length_from(Some(&json!(12.5))), Some(expected));
        assert_eq!(length_from_str(" 12.5 "), Some(expected));
        assert_eq!(
            length_from(Some(&json!(3))),
            Some(LengthKm::from_millis(3_000).unwrap())
        );
    }

    #[test]
    fn parses_external_ids() {
        assert_eq!(external_id_from(Some(&json!(123))), Some(123));
        assert_eq!(external_id_from(Some(&json!("456"))), Some(456));
        assert_eq!(external_id_from(Some(&json!(" 789 "))), Some(789));
        assert_eq!(external_id_from(Some(&json!(10.0))), Some(10));
        assert_eq!(external_id_from(Some(&json!(10.5))), None);
        assert_eq!(external_id_from(Some(&json!("relation/5"))), None);
        assert_eq!(external_id_from(Some(&json!("null"))), None);
        assert_eq!(external_id_from(Some(&json!(u64::MAX))), None);
        assert_eq!(external_id_from(None), None);
    }

    #[test]
    fn normalizes_route_feature() {
        let map = json!({
            "osm_id": "1234",
            "name": "  Via Alpina ",
            "route": "hiking",
            "highway": "path",
            "sac_scale": "mountain_hiking",
            "length": "42.1",
            "website": ""
        });
        let feature = RawFeature {
            index: 0,
            properties: FeatureProperties::from_map(map.as_object().unwrap()),
            geometry: None,
        };

        let normalized = normalize(&feature, TrailKind::Route);
        assert_eq!(normalized.external_id, Some(1234));
        assert_eq!(normalized.name.as_deref(), Some("Via Alpina"));
        assert_eq!(normalized.category.as_deref(), Some("hiking"));
        assert_eq!(normalized.difficulty, Difficulty::Moderate);
        assert_eq!(normalized.scale_raw.as_deref(), Some("mountain_hiking"));
        assert_eq!(normalized.length, LengthKm::from_millis(42_100).ok());
        assert_eq!(normalized.website, None);

        let as_way = normalize(&feature, TrailKind::Ways);
        assert_eq!(as_way.category.as_deref(), Some("path"));
    }

    #[test]
    fn empty_scale_is_not_preserved() {
        let map = json!({"sac_scale": ""});
        let feature = RawFeature {
            index: 3,
            properties: FeatureProperties::from_map(map.as_object().unwrap()),
            geometry: None,
        };
        let normalized = normalize(&feature, TrailKind::Ways);
        assert_eq!(normalized.scale_raw, None);
        assert_eq!(normalized.difficulty, Difficulty::Unknown);
    }
}
