/// Auth Service - Main entry point
/// REST API for registration, login, logout and profile lookup
use actix_middleware::{Logging, MetricsMiddleware, RedisRevocationBackend, RevocationStore};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use jwt_security::SigningSecret;
use redis::aio::ConnectionManager;
use std::sync::Arc;

use auth_service::{config::Config, db::InMemoryAccountRepository, routes, telemetry, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration from environment")?;

    telemetry::init_tracing(config.log_format)?;

    tracing::info!(
        "Starting Auth Service on {}:{}",
        config.server_host,
        config.server_port
    );

    // Signing secret is loaded once and shared read-only from here on
    let secret = SigningSecret::new(config.jwt_secret_key.as_bytes())
        .context("JWT_SECRET_KEY rejected")?;

    // Initialize Redis connection
    let redis_client = redis::Client::open(config.redis_url.clone())
        .context("Invalid REDIS_URL")?;
    let redis_conn = ConnectionManager::new(redis_client)
        .await
        .context("Failed to connect to Redis")?;

    tracing::info!("Redis connection initialized");

    let revocations = RevocationStore::new(
        Arc::new(RedisRevocationBackend::new(redis_conn)),
        config.revocation(),
    );

    let state = AppState::new(
        &secret,
        revocations,
        Arc::new(InMemoryAccountRepository::new()),
        config.session(),
    )
    .context("Failed to initialize token validator")?;

    let cors_origins = config.cors_allowed_origins.clone();
    let bind_addr = (config.server_host.clone(), config.server_port);

    HttpServer::new(move || {
        let gate = state.gate.clone();

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(routes::cors(&cors_origins))
            .wrap(Logging)
            .wrap(MetricsMiddleware)
            .configure(move |cfg| routes::configure(cfg, gate))
    })
    .bind(bind_addr)
    .context("Failed to bind HTTP listener")?
    .run()
    .await
    .context("HTTP server stopped with an error")?;

    Ok(())
}
