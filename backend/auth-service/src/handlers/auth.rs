/// Authentication handlers
use actix_middleware::AuthenticatedUser;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::{
    error::AuthError,
    models::{LoginRequest, RegisterRequest, UserProfile},
    AppState,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub profile: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// POST /api/v1/auth/register
pub async fn register(
    state: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AuthError> {
    let profile = state.sessions.register(payload.into_inner()).await?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        message: "User registered successfully".to_string(),
        profile,
    }))
}

/// POST /api/v1/auth/login
pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AuthError> {
    let response = state.sessions.login(payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /api/v1/auth/logout
///
/// Behind the auth gate, so the token here has already been validated.
pub async fn logout(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AuthError> {
    state.sessions.logout(user.token()).await?;

    tracing::info!(user_id = %user.principal(), "User logged out");
    Ok(HttpResponse::Ok().json(LogoutResponse {
        message: "Successfully logged out".to_string(),
    }))
}
