use actix_middleware::AuthenticatedUser;
use actix_web::{web, HttpResponse};

use crate::{error::AuthError, AppState};

/// GET /api/v1/profile
pub async fn get_profile(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AuthError> {
    let profile = state.sessions.profile(user.principal()).await?;
    Ok(HttpResponse::Ok().json(profile))
}
