#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for imported hiking trails.
//!
//! Serves read-only `GeoJSON` listings of routes and ways from the
//! `PostGIS` datastore. The old `/api/trails` and `/api/paths` endpoints
//! answer `410 Gone`.

pub mod config;
mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use ihike_database::store::{PostgisDatastore, TrailReader};
use ihike_database::{db, run_migrations};

use crate::config::{PaginationConfig, ServerConfig};

/// Shared application state.
pub struct AppState {
    /// Read access to stored trails.
    pub reader: Arc<dyn TrailReader>,
    /// Listing page-size limits.
    pub pagination: PaginationConfig,
}

/// Registers every route. Expects [`AppState`] as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(handlers::health)))
        .service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/api")
                .service(web::resource("/route").route(web::get().to(handlers::list_routes)))
                .service(
                    web::resource("/route/{id}").route(web::get().to(handlers::route_detail)),
                )
                .service(web::resource("/ways").route(web::get().to(handlers::list_ways)))
                .service(web::resource("/ways/{id}").route(web::get().to(handlers::ways_detail)))
                .service(
                    web::resource(["/trails", "/trails/{id}", "/paths", "/paths/{id}"])
                        .to(handlers::gone),
                ),
        );
}

/// Starts the trail API server.
///
/// Connects to the `PostGIS` database, runs migrations, and serves the
/// API until shut down. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the database connection or migrations fail.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env();

    log::info!("Connecting to database...");
    let db_conn = db::connect_from_env()
        .await
        .expect("Failed to connect to database");

    log::info!("Running migrations...");
    run_migrations(db_conn.as_ref())
        .await
        .expect("Failed to run migrations");

    let state = web::Data::new(AppState {
        reader: Arc::new(PostgisDatastore::new(Arc::from(db_conn))),
        pagination: config.pagination,
    });

    log::info!(
        "Starting server on {}:{} (page size {}, max {})",
        config.bind_addr,
        config.port,
        config.pagination.default_size(),
        config.pagination.max_size()
    );

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::NormalizePath::trim())
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}
