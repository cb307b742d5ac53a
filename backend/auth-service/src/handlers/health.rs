use actix_web::HttpResponse;
use serde_json::json;

/// GET /health
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
