#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the trail import tool.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use ihike_cli_utils::IndicatifProgress;
use ihike_database::store::PostgisDatastore;
use ihike_database::{db, run_migrations};
use ihike_ingest::import_files;
use ihike_ingest_models::{ImportMode, ImportOptions};

#[derive(Parser)]
#[command(
    name = "ihike_ingest",
    about = "Import OSM hiking GeoJSON exports",
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// `GeoJSON` files. `*route*` names import routes, `*ways*` or
    /// `*path*` names import ways.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Reconcile existing records (matched by `osm_id`) instead of skipping
    /// them
    #[arg(long)]
    update_existing: bool,

    /// Roll every file back after importing it
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = ihike_cli_utils::init_logger();
    let cli = Cli::parse();

    let db = db::connect_from_env().await?;
    run_migrations(db.as_ref()).await?;

    if matches!(cli.command, Some(Commands::Migrate)) {
        log::info!("Migrations complete.");
        return Ok(());
    }

    let options = ImportOptions {
        mode: if cli.update_existing {
            ImportMode::UpdateExisting
        } else {
            ImportMode::SkipDuplicates
        },
        dry_run: cli.dry_run,
    };

    let datastore = PostgisDatastore::new(Arc::from(db));
    let start = Instant::now();

    let summary = import_files(&datastore, &cli.files, options, |path| {
        IndicatifProgress::features_bar(&multi, &path.display().to_string())
    })
    .await;

    log::info!(
        "Processed {} file(s) in {:.1}s",
        cli.files.len(),
        start.elapsed().as_secs_f64()
    );
    println!("{summary}");

    if summary.has_failures() {
        let failed = summary
            .failed
            .iter()
            .map(|f| format!("{}: {}", f.path.display(), f.error))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(format!("{} file(s) failed to import: {failed}", summary.failed.len()).into());
    }

    Ok(())
}
