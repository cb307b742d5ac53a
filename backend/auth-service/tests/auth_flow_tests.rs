//! End-to-end HTTP flows against the full route table.
//!
//! Runs on in-memory accounts and the in-memory revocation backend, so no
//! external services are needed.

use actix_middleware::{
    ErrorBody, FailurePolicy, InMemoryRevocationBackend, RevocationConfig, RevocationStore,
};
use actix_web::{http::StatusCode, test, web, App};
use auth_service::{
    db::InMemoryAccountRepository,
    handlers::{LogoutResponse, RegisterResponse},
    models::{LoginResponse, UserProfile},
    routes,
    services::SessionConfig,
    AppState,
};
use chrono::Utc;
use jwt_security::{Principal, SigningSecret, TokenCodec};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const SECRET: &str = "J8Kq2mPvRx4TnZs9YwLcGf7DhBe3Xa6W";
const PASSWORD: &str = "SecurePass123!";

struct Harness {
    state: AppState,
    backend: Arc<InMemoryRevocationBackend>,
}

fn harness(policy: FailurePolicy) -> Harness {
    let secret = SigningSecret::new(SECRET).unwrap();
    let backend = Arc::new(InMemoryRevocationBackend::new());
    let revocations = RevocationStore::new(
        backend.clone(),
        RevocationConfig {
            policy,
            ..RevocationConfig::default()
        },
    );
    let state = AppState::new(
        &secret,
        revocations,
        Arc::new(InMemoryAccountRepository::new()),
        SessionConfig {
            token_ttl: Duration::from_secs(3600),
            revocation_ttl: Duration::from_secs(86_400),
        },
    )
    .unwrap();

    Harness { state, backend }
}

macro_rules! init_app {
    ($state:expr) => {{
        let state: AppState = $state.clone();
        let gate = state.gate.clone();
        test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(move |cfg| routes::configure(cfg, gate)),
        )
        .await
    }};
}

fn register_body(username: &str) -> serde_json::Value {
    json!({
        "full_name": "Test User",
        "username": username,
        "email": format!("{}@example.com", username),
        "password": PASSWORD,
        "city": "Bandung",
        "postal_code": "40111"
    })
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

// ============================================================================
// Register / login / logout round trip
// ============================================================================

#[actix_web::test]
async fn test_register_login_profile_logout_flow() {
    let h = harness(FailurePolicy::FailClosed);
    let app = init_app!(h.state);

    // GIVEN: A registered account
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(register_body("alice"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let registered: RegisterResponse = test::read_body_json(resp).await;
    assert_eq!(registered.message, "User registered successfully");
    assert_eq!(registered.profile.username, "alice");

    // WHEN: Logging in
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "username": "alice", "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let login: LoginResponse = test::read_body_json(resp).await;
    assert_eq!(login.profile.id, registered.profile.id);

    // THEN: The token opens the profile endpoint
    let req = test::TestRequest::get()
        .uri("/api/v1/profile")
        .insert_header(bearer(&login.token))
        .to_request();
    let profile: UserProfile = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profile, registered.profile);

    // AND: Logout succeeds and writes a tombstone
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .insert_header(bearer(&login.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let logout: LogoutResponse = test::read_body_json(resp).await;
    assert_eq!(logout.message, "Successfully logged out");
    assert!(h.backend.ttl(&login.token).is_some());

    // AND: The same token is refused afterwards
    let req = test::TestRequest::get()
        .uri("/api/v1/profile")
        .insert_header(bearer(&login.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error, "Token is no longer valid (already logged out)");
}

#[actix_web::test]
async fn test_duplicate_registration_is_500_with_details() {
    let h = harness(FailurePolicy::FailClosed);
    let app = init_app!(h.state);

    for expected in [StatusCode::CREATED, StatusCode::INTERNAL_SERVER_ERROR] {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(register_body("alice"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), expected);

        if expected == StatusCode::INTERNAL_SERVER_ERROR {
            let body: ErrorBody = test::read_body_json(resp).await;
            assert_eq!(body.error, "Failed to register user");
            assert!(body.details.unwrap().contains("username"));
        }
    }
}

#[actix_web::test]
async fn test_invalid_json_and_fields_are_400() {
    let h = harness(FailurePolicy::FailClosed);
    let app = init_app!(h.state);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert!(!body.error.is_empty());

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "username": "alice" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let mut bad_email = register_body("alice");
    bad_email["email"] = json!("not-an-email");
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(bad_email)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Gate scenarios
// ============================================================================

#[actix_web::test]
async fn test_expired_token_is_rejected() {
    let h = harness(FailurePolicy::FailClosed);
    let app = init_app!(h.state);

    // GIVEN: A token with a one second lifetime, checked two seconds later
    let codec = TokenCodec::new(&SigningSecret::new(SECRET).unwrap());
    let token = codec
        .issue_at(
            &Principal::from("scenario-a"),
            Duration::from_secs(1),
            Utc::now().timestamp() - 2,
        )
        .unwrap();

    // WHEN: Presenting it
    let req = test::TestRequest::get()
        .uri("/api/v1/profile")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;

    // THEN: Rejected as expired
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error, "Invalid token");
    assert_eq!(body.details.as_deref(), Some("token has expired"));
}

#[actix_web::test]
async fn test_revoked_token_reports_revocation_not_signature() {
    let h = harness(FailurePolicy::FailClosed);
    let app = init_app!(h.state);

    let codec = TokenCodec::new(&SigningSecret::new(SECRET).unwrap());
    let token = codec
        .issue(&Principal::from("scenario-b"), Duration::from_secs(3600))
        .unwrap();
    h.state.sessions.logout(&token).await.unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/profile")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error, "Token is no longer valid (already logged out)");
    assert_eq!(body.details, None);
}

#[actix_web::test]
async fn test_header_scheme_and_presence() {
    let h = harness(FailurePolicy::FailClosed);
    let app = init_app!(h.state);

    let req = test::TestRequest::get()
        .uri("/api/v1/profile")
        .insert_header(("Authorization", "Token abc123"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error, "Authorization header format must be Bearer {token}");

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error, "Authorization header is required");
}

#[actix_web::test]
async fn test_single_bit_mutations_never_pass_the_gate() {
    let h = harness(FailurePolicy::FailClosed);
    let app = init_app!(h.state);

    // GIVEN: A valid token
    let codec = TokenCodec::new(&SigningSecret::new(SECRET).unwrap());
    let token = codec
        .issue(&Principal::from("mutant"), Duration::from_secs(3600))
        .unwrap();

    for i in 0..token.len() {
        // WHEN: Flipping the low bit of one byte
        let mut bytes = token.clone().into_bytes();
        bytes[i] ^= 0x01;
        let mutated = String::from_utf8(bytes).unwrap();

        let req = test::TestRequest::get()
            .uri("/api/v1/profile")
            .insert_header(bearer(&mutated))
            .to_request();
        let resp = test::call_service(&app, req).await;

        // THEN: Rejected as an invalid token
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "byte {}", i);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.error, "Invalid token", "byte {}", i);
    }
}

#[actix_web::test]
async fn test_login_failures_share_one_response_shape() {
    let h = harness(FailurePolicy::FailClosed);
    let app = init_app!(h.state);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(register_body("alice"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let mut responses = Vec::new();
    for (username, password) in [("alice", "WrongPass123!"), ("ghost", PASSWORD)] {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "username": username, "password": password }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        let body = test::read_body(resp).await;
        responses.push((status, body));
    }

    assert_eq!(responses[0].0, StatusCode::UNAUTHORIZED);
    assert_eq!(responses[0], responses[1]);
    let body: ErrorBody = serde_json::from_slice(&responses[0].1).unwrap();
    assert_eq!(body.error, "invalid username or password");
}

// ============================================================================
// Logout semantics and store outages
// ============================================================================

#[actix_web::test]
async fn test_logout_twice_is_idempotent_at_service_level() {
    let h = harness(FailurePolicy::FailClosed);
    let codec = TokenCodec::new(&SigningSecret::new(SECRET).unwrap());
    let token = codec
        .issue(&Principal::from("twice"), Duration::from_secs(3600))
        .unwrap();

    h.state.sessions.logout(&token).await.unwrap();
    let first = h.backend.ttl(&token);
    h.state.sessions.logout(&token).await.unwrap();

    assert_eq!(h.backend.len(), 1);
    assert!(first.is_some());
    assert!(h.backend.ttl(&token).is_some());
}

#[actix_web::test]
async fn test_logout_with_store_down_is_500() {
    let h = harness(FailurePolicy::FailOpen);
    let app = init_app!(h.state);
    let codec = TokenCodec::new(&SigningSecret::new(SECRET).unwrap());
    let token = codec
        .issue(&Principal::from("outage"), Duration::from_secs(3600))
        .unwrap();

    // Fail-open lets the gate through; the tombstone write still fails.
    h.backend.set_available(false);
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error, "Failed to logout");
    assert!(body.details.is_some());
}

#[actix_web::test]
async fn test_store_down_fail_closed_rejects_valid_token() {
    let h = harness(FailurePolicy::FailClosed);
    let app = init_app!(h.state);
    let codec = TokenCodec::new(&SigningSecret::new(SECRET).unwrap());
    let token = codec
        .issue(&Principal::from("outage"), Duration::from_secs(3600))
        .unwrap();

    h.backend.set_available(false);
    let req = test::TestRequest::get()
        .uri("/api/v1/profile")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error, "Unable to verify token status");
}

#[actix_web::test]
async fn test_health_and_metrics() {
    let h = harness(FailurePolicy::FailClosed);
    let app = init_app!(h.state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "status": "ok" }));

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
