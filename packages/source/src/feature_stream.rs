//! One-pass iteration over the features of a `GeoJSON` document.
//!
//! The top-level shape is checked before anything is yielded; individual
//! features are only unpacked as the stream is advanced.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use ihike_source_models::{FeatureProperties, RawFeature};
use serde_json::Value;

use crate::FormatError;

/// A finite, non-restartable stream of features from one document.
#[derive(Debug)]
pub struct FeatureStream {
    features: std::iter::Enumerate<std::vec::IntoIter<Value>>,
    len: usize,
}

impl FeatureStream {
    /// Number of features in the document (including ones already taken).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the document held no features at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Iterator for FeatureStream {
    type Item = Result<RawFeature, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, value) = self.features.next()?;
        Some(unpack_feature(index, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.features.size_hint()
    }
}

/// Validates the top-level shape of `document` and returns its features.
///
/// A `FeatureCollection` yields its `features` in array order (a missing
/// `features` member yields nothing); a single `Feature` yields itself.
///
/// # Errors
///
/// Returns [`FormatError::UnexpectedType`] for any other top-level shape,
/// or [`FormatError::InvalidFeature`] if `features` is not an array.
pub fn parse(document: Value) -> Result<FeatureStream, FormatError> {
    let kind = document
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let features = match kind.as_deref() {
        Some("FeatureCollection") => match document {
            Value::Object(mut object) => match object.remove("features") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(features)) => features,
                Some(_) => {
                    return Err(FormatError::InvalidFeature {
                        index: 0,
                        message: "`features` must be an array".to_string(),
                    });
                }
            },
            _ => Vec::new(),
        },
        Some("Feature") => vec![document],
        Some(other) => {
            return Err(FormatError::UnexpectedType {
                found: other.to_string(),
            });
        }
        None => {
            return Err(FormatError::UnexpectedType {
                found: "no type".to_string(),
            });
        }
    };

    let len = features.len();
    Ok(FeatureStream {
        features: features.into_iter().enumerate(),
        len,
    })
}

/// Reads a document from `reader` and validates its top-level shape.
///
/// # Errors
///
/// Returns [`FormatError`] if the input is not JSON or has the wrong shape.
pub fn parse_reader<R: Read>(reader: R) -> Result<FeatureStream, FormatError> {
    let document: Value = serde_json::from_reader(reader)?;
    parse(document)
}

/// Opens `path` and validates its top-level shape.
///
/// # Errors
///
/// Returns [`FormatError`] if the file cannot be read, is not JSON, or has
/// the wrong shape.
pub fn open(path: &Path) -> Result<FeatureStream, FormatError> {
    let file = File::open(path)?;
    parse_reader(BufReader::new(file))
}

fn unpack_feature(index: usize, value: Value) -> Result<RawFeature, FormatError> {
    let Value::Object(mut object) = value else {
        return Err(FormatError::InvalidFeature {
            index,
            message: "feature must be an object".to_string(),
        });
    };

    let properties = match object.get("properties") {
        None | Some(Value::Null) => FeatureProperties::default(),
        Some(Value::Object(map)) => FeatureProperties::from_map(map),
        Some(_) => {
            return Err(FormatError::InvalidFeature {
                index,
                message: "`properties` must be an object".to_string(),
            });
        }
    };

    let geometry = object.remove("geometry").filter(|g| !is_empty_payload(g));

    Ok(RawFeature {
        index,
        properties,
        geometry,
    })
}

fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(o) => o.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line() -> Value {
        json!({"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]})
    }

    #[test]
    fn yields_collection_members_in_order() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"name": "a"}, "geometry": line()},
                {"type": "Feature", "properties": {"name": "b"}, "geometry": line()},
                {"type": "Feature", "properties": {"name": "c"}, "geometry": line()}
            ]
        });
        let stream = parse(doc).unwrap();
        assert_eq!(stream.len(), 3);
        let names: Vec<String> = stream
            .map(|f| f.unwrap().properties.name.unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn yields_single_feature() {
        let doc = json!({"type": "Feature", "properties": {"osm_id": 5}, "geometry": line()});
        let features: Vec<RawFeature> = parse(doc).unwrap().map(Result::unwrap).collect();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].index, 0);
        assert!(features[0].geometry.is_some());
    }

    #[test]
    fn rejects_other_top_level_types() {
        let err = parse(line()).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedType { ref found } if found == "LineString"));
        assert!(
            err.to_string()
                .starts_with("expected FeatureCollection or Feature")
        );
        assert!(matches!(
            parse(json!([1, 2, 3])),
            Err(FormatError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn missing_properties_and_geometry_are_tolerated() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature"},
                {"type": "Feature", "properties": null, "geometry": null},
                {"type": "Feature", "geometry": {}}
            ]
        });
        for feature in parse(doc).unwrap() {
            let feature = feature.unwrap();
            assert_eq!(feature.properties, FeatureProperties::default());
            assert!(feature.geometry.is_none());
        }
    }

    #[test]
    fn collection_without_features_is_empty() {
        let stream = parse(json!({"type": "FeatureCollection"})).unwrap();
        assert!(stream.is_empty());
        assert_eq!(stream.count(), 0);
    }

    #[test]
    fn malformed_members_surface_lazily() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": line()},
                "not a feature"
            ]
        });
        let mut stream = parse(doc).unwrap();
        assert!(stream.next().unwrap().is_ok());
        assert!(matches!(
            stream.next().unwrap(),
            Err(FormatError::InvalidFeature { index: 1, .. })
        ));
        assert!(stream.next().is_none());
    }

    #[test]
    fn reads_from_bytes() {
        let bytes = br#"{"type": "FeatureCollection", "features": []}"#;
        assert!(parse_reader(&bytes[..]).unwrap().is_empty());
        assert!(matches!(
            parse_reader(&b"{not json"[..]),
            Err(FormatError::Json(_))
        ));
    }
}
