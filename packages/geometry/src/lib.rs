#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry coercion for imported trails.
//!
//! Every trail is persisted as a `MultiLineString` in a known spatial
//! reference. Source exports are less tidy: a route relation may come out
//! as a single `LineString`, a `MultiLineString`, or a
//! `GeometryCollection` mixing lines with stray points. [`coerce`] folds
//! all of those into one [`MultiLine`] and rejects everything else.

use geo::{Geometry, LineString, MultiLineString};
use serde_json::Value;

/// EPSG code assigned to geometries that do not declare one (WGS84).
pub const DEFAULT_SRID: u32 = 4326;

/// Errors that can occur while reading or coercing a geometry.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// The payload is not a valid `GeoJSON` geometry object.
    #[error("invalid geometry: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },

    /// A geometry collection held no line members.
    #[error("no line geometry found")]
    NoLineGeometry,

    /// The geometry is not line-based (polygons, points, ...).
    #[error("unsupported geometry type: {geometry_type}")]
    Unsupported {
        /// `GeoJSON` name of the rejected type.
        geometry_type: &'static str,
    },

    /// The geometry declares a `crs` that is not an EPSG code.
    #[error("unsupported spatial reference: {name}")]
    UnsupportedCrs {
        /// The declared CRS name.
        name: String,
    },
}

/// A geometry as read from a source feature, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGeometry {
    /// The parsed geometry.
    pub geometry: Geometry<f64>,
    /// EPSG code from a legacy `crs` member, if one was declared.
    pub srid: Option<u32>,
}

impl SourceGeometry {
    /// Parses a `GeoJSON` geometry object, including an optional legacy
    /// named `crs` member (`{"type": "name", "properties": {"name":
    /// "EPSG:4326"}}`).
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Invalid`] if the payload is not a geometry
    /// object, or [`GeometryError::UnsupportedCrs`] if the declared CRS
    /// cannot be resolved to an EPSG code.
    pub fn from_geojson(value: &Value) -> Result<Self, GeometryError> {
        let srid = value.get("crs").map(parse_crs).transpose()?;

        let parsed = geojson::Geometry::from_json_value(value.clone()).map_err(|e| {
            GeometryError::Invalid {
                message: e.to_string(),
            }
        })?;
        let geometry =
            Geometry::<f64>::try_from(parsed).map_err(|e| GeometryError::Invalid {
                message: e.to_string(),
            })?;

        Ok(Self { geometry, srid })
    }
}

/// The canonical trail geometry: one or more lines in a known reference.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiLine {
    /// The line members, in source order.
    pub lines: MultiLineString<f64>,
    /// EPSG code of the coordinates.
    pub srid: u32,
}

impl MultiLine {
    fn to_geojson(&self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::from(&self.lines))
    }

    /// Serializes the lines as a `GeoJSON` geometry string (without SRID).
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Invalid`] if serialization fails.
    pub fn to_geojson_string(&self) -> Result<String, GeometryError> {
        serde_json::to_string(&self.to_geojson()).map_err(|e| GeometryError::Invalid {
            message: e.to_string(),
        })
    }

    /// The lines as a `GeoJSON` geometry object.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Invalid`] if serialization fails.
    pub fn to_geojson_value(&self) -> Result<Value, GeometryError> {
        serde_json::to_value(self.to_geojson()).map_err(|e| GeometryError::Invalid {
            message: e.to_string(),
        })
    }
}

/// Coerces a source geometry into a [`MultiLine`].
///
/// * no SRID declared: [`DEFAULT_SRID`] is assigned
/// * `MultiLineString`: kept as-is
/// * `LineString`: wrapped as a one-member collection
/// * `GeometryCollection`: line members are kept (multi-line members are
///   flattened), everything else is dropped; no lines at all is an error
/// * anything else: [`GeometryError::Unsupported`]
///
/// # Errors
///
/// Returns [`GeometryError::NoLineGeometry`] for a collection without
/// lines and [`GeometryError::Unsupported`] for non-line geometries.
pub fn coerce(source: SourceGeometry) -> Result<MultiLine, GeometryError> {
    let srid = source.srid.unwrap_or(DEFAULT_SRID);

    let lines = match source.geometry {
        Geometry::MultiLineString(multi) => multi,
        Geometry::LineString(line) => MultiLineString::new(vec![line]),
        Geometry::GeometryCollection(collection) => {
            let lines: Vec<LineString<f64>> = collection
                .into_iter()
                .flat_map(|member| match member {
                    Geometry::LineString(line) => vec![line],
                    Geometry::MultiLineString(multi) => multi.0,
                    _ => Vec::new(),
                })
                .collect();
            if lines.is_empty() {
                return Err(GeometryError::NoLineGeometry);
            }
            MultiLineString::new(lines)
        }
        other => {
            return Err(GeometryError::Unsupported {
                geometry_type: geometry_type_name(&other),
            });
        }
    };

    Ok(MultiLine { lines, srid })
}

/// Parses and coerces a raw `GeoJSON` geometry payload in one step.
///
/// # Errors
///
/// Returns [`GeometryError`] if the payload cannot be parsed or coerced.
pub fn coerce_geojson(value: &Value) -> Result<MultiLine, GeometryError> {
    coerce(SourceGeometry::from_geojson(value)?)
}

const fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Resolves a legacy named CRS member to an EPSG code.
///
/// Accepts `EPSG:xxxx`, `urn:ogc:def:crs:EPSG::xxxx`, and the OGC
/// `CRS84` alias of WGS84.
fn parse_crs(crs: &Value) -> Result<u32, GeometryError> {
    let name = crs
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    if name.ends_with("CRS84") {
        return Ok(DEFAULT_SRID);
    }

    if name.contains("EPSG") {
        if let Some(code) = name.rsplit(':').next().and_then(|c| c.parse().ok()) {
            return Ok(code);
        }
    }

    Err(GeometryError::UnsupportedCrs {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line_json() -> Value {
        json!({"type": "LineString", "coordinates": [[7.0, 46.0], [7.1, 46.1]]})
    }

    #[test]
    fn wraps_single_line_with_default_srid() {
        let multi = coerce_geojson(&line_json()).unwrap();
        assert_eq!(multi.srid, DEFAULT_SRID);
        assert_eq!(multi.lines.0.len(), 1);
        let coords: Vec<(f64, f64)> = multi.lines.0[0].coords().map(|c| (c.x, c.y)).collect();
        assert_eq!(coords, vec![(7.0, 46.0), (7.1, 46.1)]);
    }

    #[test]
    fn keeps_multi_line_as_is() {
        let value = json!({
            "type": "MultiLineString",
            "coordinates": [[[0.0, 0.0], [1.0, 1.0]], [[2.0, 2.0], [3.0, 3.0]]]
        });
        let multi = coerce_geojson(&value).unwrap();
        assert_eq!(multi.lines.0.len(), 2);
    }

    #[test]
    fn extracts_lines_from_collection() {
        let value = json!({
            "type": "GeometryCollection",
            "geometries": [
                {"type": "Point", "coordinates": [0.0, 0.0]},
                line_json(),
                {"type": "LineString", "coordinates": [[1.0, 1.0], [2.0, 2.0]]}
            ]
        });
        let multi = coerce_geojson(&value).unwrap();
        assert_eq!(multi.lines.0.len(), 2);
    }

    #[test]
    fn rejects_collection_without_lines() {
        let value = json!({
            "type": "GeometryCollection",
            "geometries": [{"type": "Point", "coordinates": [0.0, 0.0]}]
        });
        assert!(matches!(
            coerce_geojson(&value),
            Err(GeometryError::NoLineGeometry)
        ));
    }

    #[test]
    fn rejects_polygon() {
        let value = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
        });
        let err = coerce_geojson(&value).unwrap_err();
        assert!(matches!(
            err,
            GeometryError::Unsupported {
                geometry_type: "Polygon"
            }
        ));
        assert_eq!(err.to_string(), "unsupported geometry type: Polygon");
    }

    #[test]
    fn rejects_point() {
        let value = json!({"type": "Point", "coordinates": [0.0, 0.0]});
        assert!(matches!(
            coerce_geojson(&value),
            Err(GeometryError::Unsupported { .. })
        ));
    }

    #[test]
    fn rejects_garbage() {
        let value = json!({"type": "Circle", "radius": 3});
        assert!(matches!(
            coerce_geojson(&value),
            Err(GeometryError::Invalid { .. })
        ));
    }

    #[test]
    fn reads_declared_crs() {
        let mut value = line_json();
        value["crs"] = json!({"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3857"}});
        assert_eq!(coerce_geojson(&value).unwrap().srid, 3857);

        value["crs"] = json!({"type": "name", "properties": {"name": "urn:ogc:def:crs:OGC:1.3:CRS84"}});
        assert_eq!(coerce_geojson(&value).unwrap().srid, DEFAULT_SRID);

        value["crs"] = json!({"type": "name", "properties": {"name": "local"}});
        assert!(matches!(
            coerce_geojson(&value),
            Err(GeometryError::UnsupportedCrs { .. })
        ));
    }

    #[test]
    fn serializes_to_geojson() {
        let multi = coerce_geojson(&line_json()).unwrap();
        let text = multi.to_geojson_string().unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back["type"], "MultiLineString");
        assert_eq!(back["coordinates"][0][1], json!([7.1, 46.1]));
    }
}
