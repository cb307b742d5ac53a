use actix_middleware::{
    metrics, AuthGate, AuthenticatedUser, ErrorBody, FailurePolicy, InMemoryRevocationBackend,
    JwtAuthMiddleware, Logging, MetricsMiddleware, RedisRevocationBackend, RevocationConfig,
    RevocationStore,
};
use actix_web::{http::StatusCode, test, web, App, HttpResponse};
use jwt_security::{Principal, SigningSecret, TokenCodec, TokenValidator};
use redis::aio::ConnectionManager;
use redis::Client;
use std::sync::Arc;
use std::time::Duration;

const SECRET: &str = "J8Kq2mPvRx4TnZs9YwLcGf7DhBe3Xa6W";

async fn profile(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "user_id": user.principal().as_str() }))
}

fn gate(store: RevocationStore) -> (TokenCodec, Arc<AuthGate>) {
    let secret = SigningSecret::new(SECRET).unwrap();
    let validator = TokenValidator::new(&secret).unwrap();
    (TokenCodec::new(&secret), Arc::new(AuthGate::new(validator, store)))
}

async fn redis_store(prefix: &str) -> Option<RevocationStore> {
    let url =
        std::env::var("REDIS_TEST_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let client = match Client::open(url) {
        Ok(c) => c,
        Err(_) => {
            eprintln!("Skipping test: Redis not available");
            return None;
        }
    };

    let manager = match tokio::time::timeout(
        Duration::from_secs(2),
        ConnectionManager::new(client),
    )
    .await
    {
        Ok(Ok(m)) => m,
        _ => {
            eprintln!("Skipping test: Redis connection failed");
            return None;
        }
    };

    Some(RevocationStore::new(
        Arc::new(RedisRevocationBackend::new(manager)),
        RevocationConfig {
            policy: FailurePolicy::FailClosed,
            timeout: Duration::from_secs(1),
            key_prefix: prefix.to_string(),
        },
    ))
}

#[actix_web::test]
async fn test_logout_tombstone_in_redis_blocks_token() {
    let Some(store) = redis_store("gate-it:").await else {
        return;
    };
    let (codec, gate) = gate(store.clone());
    let token = codec
        .issue(&Principal::from("redis-user"), Duration::from_secs(60))
        .unwrap();

    let app = test::init_service(
        App::new().service(
            web::scope("/api")
                .wrap(JwtAuthMiddleware::new(gate))
                .route("/profile", web::get().to(profile)),
        ),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/profile")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    store.revoke(&token, Duration::from_secs(60)).await.unwrap();

    let req = test::TestRequest::get()
        .uri("/api/profile")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error, "Token is no longer valid (already logged out)");
}

#[actix_web::test]
async fn test_full_middleware_stack_records_decisions() {
    let backend = Arc::new(InMemoryRevocationBackend::new());
    let store = RevocationStore::new(backend.clone(), RevocationConfig::default());
    let (codec, gate) = gate(store);
    let token = codec
        .issue(&Principal::from("stacked"), Duration::from_secs(60))
        .unwrap();

    let app = test::init_service(
        App::new()
            .wrap(MetricsMiddleware)
            .wrap(Logging)
            .service(
                web::scope("/api")
                    .wrap(JwtAuthMiddleware::new(gate))
                    .route("/profile", web::get().to(profile)),
            ),
    )
    .await;

    // GIVEN: a valid token
    let req = test::TestRequest::get()
        .uri("/api/profile")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user_id"], "stacked");

    // WHEN: the store goes down under the default fail-closed policy
    backend.set_available(false);
    let req = test::TestRequest::get()
        .uri("/api/profile")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;

    // THEN: the request is refused and both outcomes show up in metrics
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error, "Unable to verify token status");

    let exposition = metrics::render().unwrap();
    assert!(exposition.contains("auth_decisions_total"));
    assert!(exposition.contains("store_unavailable"));
    assert!(exposition.contains("auth_revocation_store_errors_total"));
    assert!(exposition.contains("http_requests_total"));
}
