#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Import options and result types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use ihike_trail_models::TrailKind;
use serde::{Deserialize, Serialize};

/// How an import treats records that already exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Leave existing records alone (apart from backfilling a missing
    /// length) and count them as skipped.
    #[default]
    SkipDuplicates,
    /// Reconcile existing records with the incoming attributes.
    UpdateExisting,
}

/// Options for one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Duplicate handling.
    pub mode: ImportMode,
    /// Roll every file back instead of committing it.
    pub dry_run: bool,
}

/// Outcome counts for one file or one kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounts {
    /// New records inserted.
    pub created: u64,
    /// Existing records changed.
    pub updated: u64,
    /// Existing records left as they were.
    pub skipped: u64,
}

impl ImportCounts {
    /// Adds `other` into `self`.
    pub const fn add(&mut self, other: Self) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
    }
}

/// A file that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    /// The file as given on the command line.
    pub path: PathBuf,
    /// Human-readable cause.
    pub error: String,
}

/// Aggregate result of importing several files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Counts per record kind.
    pub counts: BTreeMap<TrailKind, ImportCounts>,
    /// Files whose name did not identify a record kind.
    pub ignored: Vec<PathBuf>,
    /// Files that failed and were rolled back.
    pub failed: Vec<FailedFile>,
    /// Whether every file was rolled back on purpose.
    pub dry_run: bool,
}

impl ImportSummary {
    /// Adds a file's counts to its kind's totals.
    pub fn record(&mut self, kind: TrailKind, counts: ImportCounts) {
        self.counts.entry(kind).or_default().add(counts);
    }

    /// Totals for `kind` (zero when nothing of that kind was imported).
    #[must_use]
    pub fn counts_for(&self, kind: TrailKind) -> ImportCounts {
        self.counts.get(&kind).copied().unwrap_or_default()
    }

    /// Skipped duplicates across every kind.
    #[must_use]
    pub fn total_skipped(&self) -> u64 {
        self.counts.values().map(|c| c.skipped).sum()
    }

    /// Whether any file failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let route = self.counts_for(TrailKind::Route);
        let ways = self.counts_for(TrailKind::Ways);
        write!(
            f,
            "Imported Route: {} (updated {}), Ways: {} (updated {}), Skipped duplicates: {}",
            route.created,
            route.updated,
            ways.created,
            ways.updated,
            self.total_skipped()
        )?;
        if self.dry_run {
            f.write_str(" (dry run, nothing was committed)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_summary_line() {
        let mut summary = ImportSummary::default();
        summary.record(
            TrailKind::Route,
            ImportCounts {
                created: 3,
                updated: 1,
                skipped: 2,
            },
        );
        summary.record(
            TrailKind::Ways,
            ImportCounts {
                created: 5,
                updated: 0,
                skipped: 4,
            },
        );
        assert_eq!(
            summary.to_string(),
            "Imported Route: 3 (updated 1), Ways: 5 (updated 0), Skipped duplicates: 6"
        );

        summary.dry_run = true;
        assert!(summary.to_string().ends_with("(dry run, nothing was committed)"));
    }

    #[test]
    fn accumulates_per_kind() {
        let mut summary = ImportSummary::default();
        let one = ImportCounts {
            created: 1,
            updated: 0,
            skipped: 0,
        };
        summary.record(TrailKind::Route, one);
        summary.record(TrailKind::Route, one);
        assert_eq!(summary.counts_for(TrailKind::Route).created, 2);
        assert_eq!(summary.counts_for(TrailKind::Ways), ImportCounts::default());
    }
}
