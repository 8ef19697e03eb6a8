use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;

use crate::services::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: String,
    pub cached_properties: u64,
}

static START_TIME: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();

pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let start_time = START_TIME.get_or_init(std::time::Instant::now);
    let uptime = start_time.elapsed().as_secs();

    let database = match state.database.ping().await {
        Ok(()) => "up",
        Err(e) => {
            tracing::error!("Health check database ping failed: {}", e);
            "down"
        }
    };
    let stats = state.cache.get_stats().await;

    let response = HealthResponse {
        status: if database == "up" { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        database: database.to_string(),
        cached_properties: stats.property_entries,
    };

    if database == "up" {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
