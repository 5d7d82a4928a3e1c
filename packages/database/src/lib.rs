#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Trail storage for ihike.
//!
//! Uses `switchy_database` for raw parameterized `PostGIS` SQL and
//! `switchy_schema` for embedded SQL migrations. The importer and the
//! query API talk to storage through the traits in [`store`], which are
//! implemented for `PostGIS` and for an in-process [`memory`] store.

pub mod db;
pub mod memory;
pub mod queries;
pub mod store;

use ihike_geometry::GeometryError;
use ihike_trail_models::TrailKind;
use include_dir::{Dir, include_dir};
use switchy_database::Database;
use switchy_schema::discovery::embedded::EmbeddedMigrationSource;
use switchy_schema::runner::MigrationRunner;

/// Embedded SQL migrations from the `migrations/` directory.
static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../../migrations");

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] switchy_schema::MigrationError),

    /// Geometry could not be serialized for storage.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// A record with this external id already exists.
    #[error("duplicate {kind} external_id {external_id}")]
    Conflict {
        /// Record kind.
        kind: TrailKind,
        /// The colliding external id.
        external_id: i64,
    },

    /// The record to update does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record kind.
        kind: TrailKind,
        /// Primary key.
        id: i64,
    },

    /// The store cannot hold geometries in this spatial reference.
    #[error("unsupported SRID {srid}")]
    UnsupportedSrid {
        /// The rejected EPSG code.
        srid: u32,
    },
}

/// Runs all pending database migrations.
///
/// # Errors
///
/// Returns [`DbError`] if any migration fails to apply.
pub async fn run_migrations(db: &dyn Database) -> Result<(), DbError> {
    let source = EmbeddedMigrationSource::new(&MIGRATIONS_DIR);
    let runner = MigrationRunner::new(Box::new(source));
    runner.run(db).await?;
    log::info!("Database migrations completed successfully");
    Ok(())
}
