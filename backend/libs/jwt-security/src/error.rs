use thiserror::Error;

/// Why a presented token was not accepted.
///
/// Closed set: these are the only outcomes of decoding and validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The token does not have the expected `header.claims.signature` shape.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    TokenExpired,
}

impl TokenError {
    /// Stable short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::MalformedToken(_) => "malformed_token",
            TokenError::SignatureInvalid => "signature_invalid",
            TokenError::TokenExpired => "token_expired",
        }
    }
}

pub type TokenResult<T> = std::result::Result<T, TokenError>;

/// Key setup and token issuing failures. Never produced while checking a
/// presented token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("signing secret rejected: {0}")]
    InvalidSecret(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

pub type SigningResult<T> = std::result::Result<T, SigningError>;
