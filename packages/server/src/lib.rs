#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the reverse geocoder.
//!
//! Exposes `/geocode` for single and batch reverse lookups, plus
//! `/healthcheck` and `/deep-healthcheck`.
//!
//! ## Graceful Startup
//!
//! The server binds immediately and serves `/healthcheck` while the
//! GeoNames dumps download and parse in a background task. Endpoints
//! that depend on the engine (`/geocode`, `/deep-healthcheck`) return
//! `503 Service Unavailable` until initialization resolves. On a warm
//! dump cache startup completes without any network I/O.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use revgeo_geocoder::{GeocoderConfig, ReverseGeocoder};
use tokio::sync::OnceCell;

/// Shared application state.
pub struct AppState {
    /// The engine, set by the background initialization task once the
    /// dumps are loaded. Empty means "still initializing".
    pub engine: Arc<OnceCell<ReverseGeocoder>>,
}

/// Builds the engine configuration from the environment.
///
/// `GEOCODER_DUMP_DIRECTORY` overrides the cache location and
/// `GEOCODER_CITIES_FILE` the cities dump; anything else keeps its
/// default.
#[must_use]
pub fn config_from_env() -> GeocoderConfig {
    let mut config = GeocoderConfig::default();

    if let Ok(dir) = std::env::var("GEOCODER_DUMP_DIRECTORY") {
        config.dump_directory = dir.into();
    }
    if let Ok(file) = std::env::var("GEOCODER_CITIES_FILE") {
        match file.parse() {
            Ok(cities_file) => config.cities_file = cities_file,
            Err(e) => log::warn!("Ignoring GEOCODER_CITIES_FILE: {e}"),
        }
    }

    config
}

/// Spawns the background task that initializes the engine into `cell`.
fn spawn_engine_init(cell: Arc<OnceCell<ReverseGeocoder>>, config: GeocoderConfig) {
    tokio::spawn(async move {
        match ReverseGeocoder::init(config).await {
            Ok(engine) => {
                let cities = engine.num_cities();
                if cell.set(engine).is_err() {
                    log::warn!("Engine already initialized (race condition)");
                } else {
                    log::info!("Engine ready: {cities} cities");
                }
            }
            Err(e) => {
                log::error!("Failed to initialize reverse geocoder: {e}");
            }
        }
    });
}

/// Starts the reverse geocoder API server.
///
/// Binds `BIND_ADDR`:`PORT` (default `127.0.0.1:8080`) and kicks off
/// engine initialization in the background.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind
/// or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let engine = Arc::new(OnceCell::new());
    spawn_engine_init(Arc::clone(&engine), config_from_env());

    let state = web::Data::new(AppState { engine });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .route("/healthcheck", web::get().to(handlers::healthcheck))
            .route("/deep-healthcheck", web::get().to(handlers::deep_healthcheck))
            .route("/geocode", web::get().to(handlers::geocode))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
