#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Trail import: reads OSM `GeoJSON` exports and upserts them into the
//! trail datastore.
//!
//! Each file is imported inside one transaction. A geometry or format
//! error anywhere in the file rolls the whole file back; other files in
//! the same run are unaffected.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ihike_database::DbError;
use ihike_database::store::{TrailDatastore, TrailStore};
use ihike_database_models::{LengthUpdate, NewTrail, ScaleUpdate, StoredTrail, TrailUpdate};
use ihike_geometry::{GeometryError, MultiLine};
use ihike_ingest_models::{FailedFile, ImportCounts, ImportMode, ImportOptions, ImportSummary};
use ihike_source::FormatError;
use ihike_source::feature_stream;
use ihike_source::parsing::normalize;
use ihike_source::progress::ProgressCallback;
use ihike_source_models::{NormalizedFeature, RawFeature};
use ihike_trail_models::TrailKind;

/// Errors that abort the import of one file.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The document is not a feature collection.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A feature's geometry could not be coerced.
    #[error("invalid geometry in feature {index}: {source}")]
    Geometry {
        /// Zero-based position of the feature.
        index: usize,
        /// What was wrong with it.
        #[source]
        source: GeometryError,
    },

    /// The datastore rejected a read or write.
    #[error(transparent)]
    Database(#[from] DbError),

    /// The file name matches more than one record kind.
    #[error("ambiguous file name {name:?}: matches both route and ways")]
    AmbiguousKind {
        /// The offending file name.
        name: String,
    },
}

/// An [`ImportError`] tagged with the file it happened in.
#[derive(Debug, thiserror::Error)]
#[error("{}: {source}", .path.display())]
pub struct FileImportError {
    /// The file as given.
    pub path: PathBuf,
    /// What went wrong.
    #[source]
    pub source: ImportError,
}

/// Infers the record kind from the file name.
///
/// Only the final path component is considered, lower-cased: a name
/// containing `route` is a route export, one containing `ways` or `path`
/// is a ways export. `Ok(None)` means the name matches neither.
///
/// # Errors
///
/// Returns [`ImportError::AmbiguousKind`] if the name matches both.
pub fn infer_kind(path: &Path) -> Result<Option<TrailKind>, ImportError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let route = name.contains("route");
    let ways = name.contains("ways") || name.contains("path");

    match (route, ways) {
        (true, true) => Err(ImportError::AmbiguousKind { name }),
        (true, false) => Ok(Some(TrailKind::Route)),
        (false, true) => Ok(Some(TrailKind::Ways)),
        (false, false) => Ok(None),
    }
}

/// The changes update mode applies to an existing record.
///
/// * a different `sac_scale` replaces the stored one and re-derives the
///   difficulty
/// * a missing or zero length is filled from the supplied length, or
///   computed from the geometry when none was supplied
/// * website and category are only filled in when stored empty
#[must_use]
pub fn reconcile(existing: &StoredTrail, incoming: &NormalizedFeature) -> TrailUpdate {
    let scale = (incoming.scale_raw != existing.scale_raw).then(|| ScaleUpdate {
        scale_raw: incoming.scale_raw.clone(),
        difficulty: incoming.difficulty,
    });

    let length = existing
        .needs_length()
        .then(|| incoming.length.map_or(LengthUpdate::Geodesic, LengthUpdate::Supplied));

    let website = incoming
        .website
        .clone()
        .filter(|_| existing.website.is_empty());

    let category = incoming
        .category
        .clone()
        .filter(|_| existing.category.is_empty());

    TrailUpdate {
        scale,
        length,
        website,
        category,
    }
}

/// Builds the record to insert for a feature with no existing match.
#[must_use]
pub fn new_trail(kind: TrailKind, incoming: &NormalizedFeature, geometry: MultiLine) -> NewTrail {
    NewTrail {
        external_id: incoming.external_id,
        name: incoming.name_or_default(kind),
        category: incoming.category_or_default(kind),
        difficulty: incoming.difficulty,
        scale_raw: incoming.scale_raw.clone(),
        length_km: incoming.length,
        website: incoming.website_or_default(),
        geometry,
    }
}

/// Upserts `features` as records of `kind` into `store`.
///
/// Features without geometry are passed over without being counted.
/// Features whose external id matches an existing record are never
/// inserted again; see [`ImportMode`] for what happens to them instead.
///
/// # Errors
///
/// Returns [`ImportError`] on the first feature that cannot be read or
/// coerced, or if the store fails. Writes already made through `store`
/// are left for the caller to roll back.
pub async fn import_features<S, I>(
    store: &S,
    kind: TrailKind,
    features: I,
    mode: ImportMode,
    progress: &dyn ProgressCallback,
) -> Result<ImportCounts, ImportError>
where
    S: TrailStore + ?Sized,
    I: IntoIterator<Item = Result<RawFeature, FormatError>>,
{
    let mut counts = ImportCounts::default();

    for feature in features {
        let feature = feature?;
        progress.inc(1);

        let Some(geometry) = &feature.geometry else {
            log::debug!("feature {}: no geometry, skipping", feature.index);
            continue;
        };

        let geometry =
            ihike_geometry::coerce_geojson(geometry).map_err(|source| ImportError::Geometry {
                index: feature.index,
                source,
            })?;

        let incoming = normalize(&feature, kind);

        if let Some(external_id) = incoming.external_id {
            if let Some(existing) = store.find_by_external_id(kind, external_id).await? {
                match mode {
                    ImportMode::UpdateExisting => {
                        let update = reconcile(&existing, &incoming);
                        if update.is_empty() {
                            counts.skipped += 1;
                        } else {
                            store.update_trail(kind, existing.id, &update).await?;
                            counts.updated += 1;
                        }
                    }
                    ImportMode::SkipDuplicates => {
                        if existing.needs_length() {
                            store.backfill_geodesic_length(kind, existing.id).await?;
                        }
                        counts.skipped += 1;
                    }
                }
                continue;
            }
        }

        let supplied_length = incoming.length.is_some();
        let id = store
            .insert_trail(kind, &new_trail(kind, &incoming, geometry))
            .await?;
        if !supplied_length {
            store.backfill_geodesic_length(kind, id).await?;
        }
        counts.created += 1;
    }

    Ok(counts)
}

/// Imports one file as records of `kind` inside a single transaction.
///
/// The transaction is committed on success, or rolled back when
/// `options.dry_run` is set or anything fails.
///
/// # Errors
///
/// Returns [`ImportError`] if the file cannot be read, any feature fails,
/// or the datastore fails. Nothing from the file is persisted in that case.
pub async fn import_file(
    datastore: &dyn TrailDatastore,
    path: &Path,
    kind: TrailKind,
    options: ImportOptions,
    progress: &dyn ProgressCallback,
) -> Result<ImportCounts, ImportError> {
    let stream = feature_stream::open(path)?;
    progress.set_total(stream.len() as u64);

    let txn = datastore.begin().await?;

    match import_features(txn.as_ref(), kind, stream, options.mode, progress).await {
        Ok(counts) => {
            if options.dry_run {
                txn.rollback().await?;
            } else {
                txn.commit().await?;
            }
            Ok(counts)
        }
        Err(e) => {
            if let Err(rollback) = txn.rollback().await {
                log::warn!("Rollback of {} failed: {rollback}", path.display());
            }
            Err(e)
        }
    }
}

/// Infers the kind of `path` and imports it.
///
/// Returns `Ok(None)` for files whose name matches no record kind.
///
/// # Errors
///
/// Returns [`FileImportError`] if the name is ambiguous or the import
/// fails.
pub async fn import_path(
    datastore: &dyn TrailDatastore,
    path: &Path,
    options: ImportOptions,
    progress: &dyn ProgressCallback,
) -> Result<Option<(TrailKind, ImportCounts)>, FileImportError> {
    let wrap = |source| FileImportError {
        path: path.to_path_buf(),
        source,
    };

    let Some(kind) = infer_kind(path).map_err(wrap)? else {
        return Ok(None);
    };

    progress.set_message(format!("{} ({kind})", path.display()));
    let counts = import_file(datastore, path, kind, options, progress)
        .await
        .map_err(wrap)?;

    Ok(Some((kind, counts)))
}

/// Imports every file in order, each in its own transaction.
///
/// A failing file is recorded in the summary and does not stop the run.
/// `make_progress` is called once per file.
pub async fn import_files<F>(
    datastore: &dyn TrailDatastore,
    files: &[PathBuf],
    options: ImportOptions,
    make_progress: F,
) -> ImportSummary
where
    F: Fn(&Path) -> Arc<dyn ProgressCallback>,
{
    let mut summary = ImportSummary {
        dry_run: options.dry_run,
        ..ImportSummary::default()
    };

    for path in files {
        let progress = make_progress(path);

        match import_path(datastore, path, options, progress.as_ref()).await {
            Ok(Some((kind, counts))) => {
                log::info!(
                    "{}: {} created, {} updated, {} skipped",
                    path.display(),
                    counts.created,
                    counts.updated,
                    counts.skipped
                );
                progress.finish(format!(
                    "{}: {} created, {} updated",
                    path.display(),
                    counts.created,
                    counts.updated
                ));
                summary.record(kind, counts);
            }
            Ok(None) => {
                progress.finish_and_clear();
                log::warn!(
                    "Skipping {}: cannot infer record kind (expects 'route' or 'ways' in file name)",
                    path.display()
                );
                summary.ignored.push(path.clone());
            }
            Err(e) => {
                progress.finish_and_clear();
                log::error!("Import failed, rolled back: {e}");
                summary.failed.push(FailedFile {
                    path: e.path,
                    error: e.source.to_string(),
                });
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use ihike_trail_models::{Difficulty, LengthKm};

    fn stored() -> StoredTrail {
        StoredTrail {
            id: 1,
            scale_raw: Some("hiking".to_string()),
            length_km: LengthKm::from_millis(4_200).ok(),
            website: "https://example.org".to_string(),
            category: "hiking".to_string(),
        }
    }

    fn incoming() -> NormalizedFeature {
        NormalizedFeature {
            external_id: Some(1),
            name: Some("Trail".to_string()),
            category: Some("foot".to_string()),
            scale_raw: Some("hiking".to_string()),
            difficulty: Difficulty::Easy,
            length: LengthKm::from_millis(5_000).ok(),
            website: Some("https://other.example.org".to_string()),
        }
    }

    #[test]
    fn infers_kind_from_file_name() {
        assert_eq!(
            infer_kind(Path::new("data/hiking_route.geojson")).unwrap(),
            Some(TrailKind::Route)
        );
        assert_eq!(
            infer_kind(Path::new("HIKING_WAYS.geojson")).unwrap(),
            Some(TrailKind::Ways)
        );
        assert_eq!(
            infer_kind(Path::new("/tmp/footpaths.json")).unwrap(),
            Some(TrailKind::Ways)
        );
        assert_eq!(infer_kind(Path::new("peaks.geojson")).unwrap(), None);
    }

    #[test]
    fn only_the_file_name_is_considered() {
        assert_eq!(
            infer_kind(Path::new("/srv/routes/peaks.geojson")).unwrap(),
            None
        );
        assert_eq!(
            infer_kind(Path::new("/srv/paths/hiking_route.geojson")).unwrap(),
            Some(TrailKind::Route)
        );
    }

    #[test]
    fn rejects_ambiguous_names() {
        assert!(matches!(
            infer_kind(Path::new("route_paths.geojson")),
            Err(ImportError::AmbiguousKind { .. })
        ));
    }

    #[test]
    fn unchanged_record_needs_no_update() {
        assert!(reconcile(&stored(), &incoming()).is_empty());
    }

    #[test]
    fn scale_change_rederives_difficulty() {
        let mut feature = incoming();
        feature.scale_raw = Some("alpine_hiking".to_string());
        feature.difficulty = Difficulty::Hard;
        let update = reconcile(&stored(), &feature);
        assert_eq!(
            update.scale,
            Some(ScaleUpdate {
                scale_raw: Some("alpine_hiking".to_string()),
                difficulty: Difficulty::Hard,
            })
        );

        feature.scale_raw = None;
        feature.difficulty = Difficulty::Unknown;
        let update = reconcile(&stored(), &feature);
        assert_eq!(update.scale.unwrap().difficulty, Difficulty::Unknown);
    }

    #[test]
    fn fills_missing_length() {
        let mut existing = stored();
        existing.length_km = Some(LengthKm::ZERO);

        let update = reconcile(&existing, &incoming());
        assert_eq!(
            update.length,
            Some(LengthUpdate::Supplied(LengthKm::from_millis(5_000).unwrap()))
        );

        let mut feature = incoming();
        feature.length = None;
        assert_eq!(
            reconcile(&existing, &feature).length,
            Some(LengthUpdate::Geodesic)
        );
    }

    #[test]
    fn only_fills_empty_website_and_category() {
        let mut existing = stored();
        existing.website = String::new();
        existing.category = String::new();
        let update = reconcile(&existing, &incoming());
        assert_eq!(update.website.as_deref(), Some("https://other.example.org"));
        assert_eq!(update.category.as_deref(), Some("foot"));

        let mut feature = incoming();
        feature.website = None;
        feature.category = None;
        let update = reconcile(&existing, &feature);
        assert_eq!(update.website, None);
        assert_eq!(update.category, None);
    }

    #[test]
    fn new_records_get_defaults() {
        let feature = NormalizedFeature {
            external_id: None,
            name: None,
            category: None,
            scale_raw: None,
            difficulty: Difficulty::Unknown,
            length: None,
            website: None,
        };
        let geometry = ihike_geometry::coerce_geojson(&serde_json::json!({
            "type": "LineString",
            "coordinates": [[0.0, 0.0], [1.0, 1.0]]
        }))
        .unwrap();

        let trail = new_trail(TrailKind::Ways, &feature, geometry);
        assert_eq!(trail.name, "Unnamed Path");
        assert_eq!(trail.category, "path");
        assert_eq!(trail.website, "");
        assert_eq!(trail.length_km, None);
    }
}
