//! # Vacation Rental Booking Backend
//!
//! Entry point for the booking platform backend: property listings,
//! double-booking-safe reservations, a simulated wallet with an append-only
//! ledger, and simulated crypto checkout.
//!
//! ## Architecture
//!
//! Startup wires the components in order:
//!
//! 1. **Configuration**: environment variables via `Config::from_env()`
//! 2. **Database**: PostgreSQL pool plus embedded migrations
//! 3. **Cache**: in-memory property cache
//! 4. **HTTP server**: actix-web with CORS, logging, compression, tracing
//!
//! ## API Endpoints
//!
//! - `GET /health` - health check with database status
//! - `GET /metrics` - Prometheus metrics
//! - `/api/v1/users/*` - registration and profile
//! - `/api/v1/properties/*` - listings, availability, reviews
//! - `/api/v1/bookings/*` - booking lifecycle and crypto checkout
//! - `/api/v1/wallet/*` - balance, top-up, ledger history
//! - `/api/v1/notifications/*` - per-user notifications

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
#[cfg(test)]
mod api_tests;
mod auth;
mod cache;
mod config;
mod database;
mod monitoring;
mod services;

use crate::cache::Cache;
use crate::config::Config;
use crate::database::Database;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting booking platform backend");

    dotenv::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let database = Database::new(&config.database_url, config.max_db_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");
    database
        .run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations completed");

    let cache = Cache::new(20_000, config.cache_ttl_seconds);
    tracing::info!("Property cache initialized");

    let app_state = web::Data::new(services::AppState {
        database: database.clone(),
        cache: cache.clone(),
        config: config.clone(),
    });

    let bind_address = format!("{}:{}", config.host, config.port);
    tracing::info!("Server listening on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .wrap(cors)
            .route("/health", web::get().to(api::health::health_check))
            .route("/metrics", web::get().to(monitoring::metrics::metrics))
            .service(
                web::scope("/api/v1")
                    .configure(api::users::configure)
                    .configure(api::properties::configure)
                    .configure(api::bookings::configure)
                    .configure(api::wallet::configure)
                    .configure(api::notifications::configure)
                    .configure(api::reviews::configure),
            )
    })
    .workers(num_cpus::get() * 2)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run()
    .await?;

    Ok(())
}
