#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the trail server.
//!
//! Trails are served as `GeoJSON` features. Listings are wrapped in a
//! page envelope (`count`, `next`, `previous`) whose `results` member is
//! a `FeatureCollection`.

use ihike_database_models::TrailRow;
use ihike_trail_models::{Difficulty, LengthKm, TrailKind};
use serde::{Deserialize, Serialize};

/// Detail message returned by every removed endpoint.
pub const GONE_DETAIL: &str = "Trails API removed. Use vector tiles.";

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Always `"ok"`.
    pub status: String,
}

/// A `{"detail": ...}` error or notice body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDetail {
    /// Human-readable message.
    pub detail: String,
}

impl ApiDetail {
    /// Creates a detail body.
    #[must_use]
    pub fn new(detail: &str) -> Self {
        Self {
            detail: detail.to_string(),
        }
    }
}

/// Non-geometry attributes of a trail feature.
///
/// Exactly one of `route` and `highway` is present, depending on kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTrailProperties {
    /// OSM id.
    pub osm_id: Option<i64>,
    /// Display name.
    pub name: String,
    /// Route type (routes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Highway type (ways only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highway: Option<String>,
    /// Difficulty tier.
    pub difficulty: Difficulty,
    /// Length in kilometres, as a three-decimal string.
    pub length: LengthKm,
    /// Website URL.
    pub website: String,
}

/// A trail as a `GeoJSON` feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFeature {
    /// Always `"Feature"`.
    #[serde(rename = "type")]
    pub feature_type: String,
    /// Primary key.
    pub id: i64,
    /// `GeoJSON` geometry object.
    pub geometry: serde_json::Value,
    /// Attributes.
    pub properties: ApiTrailProperties,
}

impl ApiFeature {
    /// Converts a stored row of `kind`.
    #[must_use]
    pub fn from_row(kind: TrailKind, row: TrailRow) -> Self {
        let (route, highway) = match kind {
            TrailKind::Route => (Some(row.category), None),
            TrailKind::Ways => (None, Some(row.category)),
        };

        Self {
            feature_type: "Feature".to_string(),
            id: row.id,
            geometry: row.geometry,
            properties: ApiTrailProperties {
                osm_id: row.external_id,
                name: row.name,
                route,
                highway,
                difficulty: row.difficulty,
                length: row.length_km,
                website: row.website,
            },
        }
    }
}

/// A `GeoJSON` `FeatureCollection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFeatureCollection {
    /// Always `"FeatureCollection"`.
    #[serde(rename = "type")]
    pub collection_type: String,
    /// Members.
    pub features: Vec<ApiFeature>,
}

impl ApiFeatureCollection {
    /// Wraps `features`.
    #[must_use]
    pub fn new(features: Vec<ApiFeature>) -> Self {
        Self {
            collection_type: "FeatureCollection".to_string(),
            features,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiPage {
    /// Total matches across all pages.
    pub count: u64,
    /// URL of the next page.
    pub next: Option<String>,
    /// URL of the previous page.
    pub previous: Option<String>,
    /// This page's features.
    pub results: ApiFeatureCollection,
}

/// Query parameters for trail listings.
///
/// Everything is kept as text; values that do not parse are ignored
/// rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrailListParams {
    /// Exact OSM id.
    pub osm_id: Option<String>,
    /// Comma-separated OSM ids.
    #[serde(rename = "osm_id__in")]
    pub osm_id_in: Option<String>,
    /// Exact difficulty.
    pub difficulty: Option<String>,
    /// Comma-separated difficulties.
    #[serde(rename = "difficulty__in")]
    pub difficulty_in: Option<String>,
    /// Exact route type (routes only).
    pub route: Option<String>,
    /// Comma-separated route types (routes only).
    #[serde(rename = "route__in")]
    pub route_in: Option<String>,
    /// Exact highway type (ways only).
    pub highway: Option<String>,
    /// Comma-separated highway types (ways only).
    #[serde(rename = "highway__in")]
    pub highway_in: Option<String>,
    /// Inclusive minimum length in kilometres.
    pub length_min: Option<String>,
    /// Inclusive maximum length in kilometres.
    pub length_max: Option<String>,
    /// `west,south,east,north`.
    pub in_bbox: Option<String>,
    /// `name`, `-name`, `length` or `-length`.
    pub ordering: Option<String>,
    /// 1-based page number, or `last`.
    pub page: Option<String>,
    /// Requested page size.
    pub page_size: Option<String>,
}

impl TrailListParams {
    /// The category filters that apply to `kind`.
    #[must_use]
    pub fn category_filters(&self, kind: TrailKind) -> (Option<&str>, Option<&str>) {
        match kind {
            TrailKind::Route => (self.route.as_deref(), self.route_in.as_deref()),
            TrailKind::Ways => (self.highway.as_deref(), self.highway_in.as_deref()),
        }
    }
}
