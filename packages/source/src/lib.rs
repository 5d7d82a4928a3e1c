#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reading OSM trail exports.
//!
//! [`feature_stream`] turns a `GeoJSON` document into a one-pass stream of
//! [`RawFeature`](ihike_source_models::RawFeature)s and [`parsing`] turns
//! their loosely typed properties into a
//! [`NormalizedFeature`](ihike_source_models::NormalizedFeature).

pub mod feature_stream;
pub mod parsing;
pub mod progress;

/// Errors raised for documents that are not feature collections.
///
/// Any of these aborts the import of the whole file.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level `type` is neither `FeatureCollection` nor `Feature`.
    #[error("expected FeatureCollection or Feature, found {found}")]
    UnexpectedType {
        /// The `type` that was found (or a description of its absence).
        found: String,
    },

    /// A member of `features` is malformed.
    #[error("feature {index}: {message}")]
    InvalidFeature {
        /// Zero-based position of the feature.
        index: usize,
        /// Description of what went wrong.
        message: String,
    },
}
