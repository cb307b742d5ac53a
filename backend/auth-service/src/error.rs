use actix_middleware::{ErrorBody, RevocationError};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use jwt_security::SigningError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username and wrong password share this variant.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("account already exists: {0} is taken")]
    DuplicateAccount(&'static str),

    #[error("account creation failed: {0}")]
    AccountCreationFailed(String),

    #[error("User not found")]
    AccountNotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("failed to issue token: {0}")]
    TokenIssue(#[from] SigningError),

    #[error("failed to revoke token: {0}")]
    RevocationFailed(#[from] RevocationError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

impl AuthError {
    pub fn body(&self) -> ErrorBody {
        match self {
            AuthError::InvalidCredentials | AuthError::AccountNotFound => {
                ErrorBody::new(self.to_string())
            }
            AuthError::Validation(msg) => ErrorBody::new(msg.clone()),
            AuthError::DuplicateAccount(_) | AuthError::AccountCreationFailed(_) => {
                ErrorBody::with_details("Failed to register user", self.to_string())
            }
            AuthError::TokenIssue(_) => ErrorBody::new("Failed to generate token"),
            AuthError::RevocationFailed(_) => {
                ErrorBody::with_details("Failed to logout", self.to_string())
            }
            AuthError::Internal(_) => ErrorBody::new("Internal server error"),
        }
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::AccountNotFound => StatusCode::NOT_FOUND,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::DuplicateAccount(_)
            | AuthError::AccountCreationFailed(_)
            | AuthError::TokenIssue(_)
            | AuthError::RevocationFailed(_)
            | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(err: validator::ValidationErrors) -> Self {
        AuthError::Validation(err.to_string())
    }
}
