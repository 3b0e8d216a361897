#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web server for the HPD active calls map.
//!
//! Runs the incident pipeline in the background and serves its output:
//! the published calls (`/getAlerts`), the provider in use
//! (`/getProvider`, which the frontend reads to decide on map
//! attribution), a pause toggle (`/toggleScraper`), health and status
//! endpoints under `/api`, and the frontend's static files.

mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use hpd_alerts_geocoder::{GeocodeError, Geocoder, ProviderKind, create_geocoder};
use hpd_alerts_pipeline::{IncidentStore, PipelineConfig, Scheduler};
use hpd_alerts_scraper::active_calls::{self, ActiveCallsScraper};
use hpd_alerts_scraper::{ScrapeError, SnapshotSource};
use thiserror::Error;

/// Shared application state.
pub struct AppState {
    /// Published incidents and pipeline flags.
    pub store: Arc<IncidentStore>,
    /// Geocoding provider in use.
    pub provider: ProviderKind,
}

/// Where and what the server serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
    /// Frontend files, served at `/` when the directory exists.
    pub static_dir: PathBuf,
    /// Active calls page to scrape.
    pub active_calls_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            static_dir: PathBuf::from("static"),
            active_calls_url: active_calls::DEFAULT_URL.to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, `PORT`, `STATIC_DIR`, and `ACTIVE_CALLS_URL`,
    /// falling back to the defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            static_dir: std::env::var("STATIC_DIR").map_or(defaults.static_dir, PathBuf::from),
            active_calls_url: std::env::var("ACTIVE_CALLS_URL")
                .unwrap_or(defaults.active_calls_url),
        }
    }
}

/// Errors that prevent the server from starting or keep it from running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The geocoding provider could not be built.
    #[error("Failed to build geocoder: {0}")]
    Geocoder(#[from] GeocodeError),

    /// The scraper could not be built.
    #[error("Failed to build scraper: {0}")]
    Scraper(#[from] ScrapeError),

    /// The HTTP server failed to bind or run.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Registers the API routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/getAlerts", web::get().to(handlers::get_alerts))
        .route("/getProvider", web::get().to(handlers::get_provider))
        .route("/toggleScraper", web::post().to(handlers::toggle_scraper))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(handlers::health))
                .route("/status", web::get().to(handlers::status)),
        );
}

/// Starts the incident pipeline and the HTTP server.
///
/// The pipeline runs for as long as the server does. If it halts, the
/// server keeps answering, with `/getAlerts` reporting the halt. This is
/// a regular async function; the caller provides the runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if the geocoder or scraper cannot be built, or
/// if the HTTP server fails to bind or run.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: PipelineConfig, server: ServerConfig) -> Result<(), ServerError> {
    let provider = config.provider().kind();
    let geocoder: Arc<dyn Geocoder> = Arc::from(create_geocoder(config.provider())?);
    let source: Arc<dyn SnapshotSource> =
        Arc::new(ActiveCallsScraper::new(&server.active_calls_url)?);
    let store = Arc::new(IncidentStore::new());

    let pipeline = Scheduler::new(config, source, geocoder, Arc::clone(&store)).spawn();
    let watched = Arc::clone(&store);
    actix_rt::spawn(async move {
        if let Err(e) = pipeline.await {
            log::error!("Incident pipeline task failed: {e}");
            watched.halt(format!("pipeline task failed: {e}"));
        }
    });

    let state = web::Data::new(AppState { store, provider });

    let static_dir = if server.static_dir.is_dir() {
        log::info!("Serving static files from {}", server.static_dir.display());
        Some(server.static_dir)
    } else {
        log::warn!(
            "Static directory {} not found, serving the API only",
            server.static_dir.display()
        );
        None
    };

    log::info!("Starting server on {}:{}", server.bind_addr, server.port);

    HttpServer::new(move || {
        let static_dir = static_dir.clone();

        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(routes)
            .configure(move |cfg| {
                if let Some(dir) = static_dir {
                    cfg.service(Files::new("/", dir).index_file("index.html"));
                }
            })
    })
    .bind((server.bind_addr, server.port))?
    .run()
    .await?;

    Ok(())
}
