//! HTTP handler functions for the alerts API.

use actix_web::{HttpResponse, web};
use hpd_alerts_pipeline::Unavailable;
use hpd_alerts_server_models::{
    ApiError, ApiHealth, ApiProvider, ApiStatus, ApiToggle, api_incidents,
};

use crate::AppState;

/// `GET /getAlerts`
///
/// Returns the published calls as an `id -> incident` object. Answers 403
/// while paused and 503 before the first cycle or after a halt, so an
/// unavailable list never looks like an empty one.
pub async fn get_alerts(state: web::Data<AppState>) -> HttpResponse {
    match state.store.snapshot() {
        Ok(snapshot) => HttpResponse::Ok().json(api_incidents(&snapshot)),
        Err(e @ Unavailable::Paused) => {
            HttpResponse::Forbidden().json(ApiError::new(e.to_string()))
        }
        Err(e) => {
            log::debug!("Alerts unavailable: {e}");
            HttpResponse::ServiceUnavailable().json(ApiError::new(e.to_string()))
        }
    }
}

/// `GET /getProvider`
pub async fn get_provider(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiProvider::from(state.provider))
}

/// `POST /toggleScraper`
///
/// Pauses or resumes scraping. A cycle already running finishes.
pub async fn toggle_scraper(state: web::Data<AppState>) -> HttpResponse {
    let paused = state.store.toggle_paused();
    log::info!("Scraper {}", if paused { "paused" } else { "resumed" });
    HttpResponse::Ok().json(ApiToggle { paused })
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/status`
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiStatus::new(state.store.status(), state.provider))
}
