#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Trail row types and query parameter definitions.
//!
//! These types describe data as stored in and retrieved from the trail
//! datastore. They are distinct from the API response types in
//! `ihike_server_models` and the normalized feature types in
//! `ihike_source_models`.

use ihike_geometry::MultiLine;
use ihike_trail_models::{Difficulty, LengthKm, TrailKind};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Whether the point lies inside the box (edges included).
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.west && x <= self.east && y >= self.south && y <= self.north
    }
}

/// Sort order for trail listings. Ties are always broken by id.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum TrailOrdering {
    /// `name`
    #[default]
    #[strum(serialize = "name")]
    #[serde(rename = "name")]
    Name,
    /// `-name`
    #[strum(serialize = "-name")]
    #[serde(rename = "-name")]
    NameDesc,
    /// `length`
    #[strum(serialize = "length")]
    #[serde(rename = "length")]
    Length,
    /// `-length`
    #[strum(serialize = "-length")]
    #[serde(rename = "-length")]
    LengthDesc,
}

/// Parameters for listing trails of one kind.
///
/// Empty lists and `None` mean "do not filter". When both the exact and
/// the `_in` form of a filter are set, a row must satisfy both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailQuery {
    /// Record kind to list.
    pub kind: TrailKind,
    /// Exact external id.
    pub external_id: Option<i64>,
    /// External id membership.
    pub external_id_in: Vec<i64>,
    /// Exact difficulty.
    pub difficulty: Option<Difficulty>,
    /// Difficulty membership.
    pub difficulty_in: Vec<Difficulty>,
    /// Exact category.
    pub category: Option<String>,
    /// Category membership.
    pub category_in: Vec<String>,
    /// Inclusive lower length bound.
    pub length_min: Option<LengthKm>,
    /// Inclusive upper length bound.
    pub length_max: Option<LengthKm>,
    /// Only trails whose geometry lies entirely inside this box.
    pub bbox: Option<BoundingBox>,
    /// Sort order.
    pub ordering: TrailOrdering,
    /// Maximum number of rows to return.
    pub limit: u32,
    /// Number of rows to skip.
    pub offset: u64,
}

impl TrailQuery {
    /// An unfiltered query for `kind`.
    #[must_use]
    pub const fn new(kind: TrailKind, limit: u32) -> Self {
        Self {
            kind,
            external_id: None,
            external_id_in: Vec::new(),
            difficulty: None,
            difficulty_in: Vec::new(),
            category: None,
            category_in: Vec::new(),
            length_min: None,
            length_max: None,
            bbox: None,
            ordering: TrailOrdering::Name,
            limit,
            offset: 0,
        }
    }
}

/// A trail as served by the query API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailRow {
    /// Primary key.
    pub id: i64,
    /// OSM id, if known.
    pub external_id: Option<i64>,
    /// Display name.
    pub name: String,
    /// Route type or highway type, depending on kind.
    pub category: String,
    /// Derived difficulty tier.
    pub difficulty: Difficulty,
    /// Length in kilometres.
    pub length_km: LengthKm,
    /// Website URL (empty when unknown).
    pub website: String,
    /// `GeoJSON` geometry object.
    pub geometry: serde_json::Value,
}

/// One page of a trail listing plus the total matching count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrailPage {
    /// Rows matching the filters, ignoring pagination.
    pub count: u64,
    /// The requested slice.
    pub rows: Vec<TrailRow>,
}

/// The attributes the importer reconciles against an existing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTrail {
    /// Primary key.
    pub id: i64,
    /// Raw `sac_scale` as last imported.
    pub scale_raw: Option<String>,
    /// Stored length; `None` when null.
    pub length_km: Option<LengthKm>,
    /// Stored website.
    pub website: String,
    /// Stored category.
    pub category: String,
}

impl StoredTrail {
    /// Whether the stored length is missing or the zero sentinel.
    #[must_use]
    pub fn needs_length(&self) -> bool {
        !self.length_km.is_some_and(LengthKm::is_positive)
    }
}

/// A record to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrail {
    /// OSM id, if the source supplied a usable one.
    pub external_id: Option<i64>,
    /// Display name (defaults already applied).
    pub name: String,
    /// Category (defaults already applied).
    pub category: String,
    /// Tier derived from `scale_raw`.
    pub difficulty: Difficulty,
    /// Raw `sac_scale`.
    pub scale_raw: Option<String>,
    /// Supplied length; `None` stores the zero sentinel.
    pub length_km: Option<LengthKm>,
    /// Website (empty when unknown).
    pub website: String,
    /// Coerced geometry.
    pub geometry: MultiLine,
}

/// A new `sac_scale` and the difficulty derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleUpdate {
    /// New raw scale.
    pub scale_raw: Option<String>,
    /// Tier derived from `scale_raw`.
    pub difficulty: Difficulty,
}

/// How to fill in a missing length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUpdate {
    /// Use the length the source supplied.
    Supplied(LengthKm),
    /// Have the datastore compute the geodesic length of the geometry.
    Geodesic,
}

/// A partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrailUpdate {
    /// New scale and difficulty.
    pub scale: Option<ScaleUpdate>,
    /// New length.
    pub length: Option<LengthUpdate>,
    /// New website.
    pub website: Option<String>,
    /// New category.
    pub category: Option<String>,
}

impl TrailUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.scale.is_none()
            && self.length.is_none()
            && self.website.is_none()
            && self.category.is_none()
    }
}
