/// Route definitions and middleware setup
use actix_cors::Cors;
use actix_middleware::{AuthGate, ErrorBody, JwtAuthMiddleware};
use actix_web::{error::InternalError, http::header, web, HttpResponse};
use std::sync::Arc;

use crate::{handlers, metrics};

const CORS_MAX_AGE_SECS: usize = 12 * 60 * 60;

/// Mount every route. `/auth/logout` and `/profile` sit behind the gate.
pub fn configure(cfg: &mut web::ServiceConfig, gate: Arc<AuthGate>) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(handlers::health_check))
        .route("/metrics", web::get().to(metrics::metrics_handler))
        .service(
            web::scope("/api/v1")
                .route("/auth/register", web::post().to(handlers::register))
                .route("/auth/login", web::post().to(handlers::login))
                .service(
                    web::resource("/auth/logout")
                        .wrap(JwtAuthMiddleware::new(gate.clone()))
                        .route(web::post().to(handlers::logout)),
                )
                .service(
                    web::resource("/profile")
                        .wrap(JwtAuthMiddleware::new(gate))
                        .route(web::get().to(handlers::get_profile)),
                ),
        );
}

/// Malformed or mistyped JSON bodies become `400 {"error": ...}`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(ErrorBody::new(err.to_string()));
        InternalError::from_response(err, response).into()
    })
}

/// CORS configuration from the comma-separated allow list; `*` allows any origin.
pub fn cors(allowed_origins: &str) -> Cors {
    let mut cors = Cors::default();
    for origin in allowed_origins.split(',') {
        let origin = origin.trim();
        if origin.is_empty() {
            continue;
        }
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else {
            cors = cors.allowed_origin(origin);
        }
    }

    cors.allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
        .expose_headers(vec![header::CONTENT_LENGTH])
        .supports_credentials()
        .max_age(CORS_MAX_AGE_SECS)
}
