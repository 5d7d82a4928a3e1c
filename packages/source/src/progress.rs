//! Progress reporting for feature imports.
//!
//! The importer reports one unit per feature processed. Rendering is left
//! to the caller: the CLI draws an `indicatif` bar, tests pass
//! [`null_progress`].

use std::sync::Arc;

/// Receives progress updates while a file is imported.
pub trait ProgressCallback: Send + Sync {
    /// Total number of features in the file.
    fn set_total(&self, total: u64);

    /// Advance by `delta` features.
    fn inc(&self, delta: u64);

    /// Update the label shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Mark the file as done, leaving `msg` visible.
    fn finish(&self, msg: String);

    /// Mark the file as done and remove the indicator.
    fn finish_and_clear(&self);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
