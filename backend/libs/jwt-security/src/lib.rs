//! Signed session tokens.
//!
//! Tokens are compact HS256 JWTs carrying `{sub, iat, exp}`. Issuing goes
//! through [`TokenCodec`]; checking goes through [`TokenValidator`], which
//! runs three steps in a fixed order and stops at the first failure:
//!
//! 1. structural decode ([`TokenError::MalformedToken`])
//! 2. constant-time HMAC comparison ([`TokenError::SignatureInvalid`])
//! 3. expiry against the current clock ([`TokenError::TokenExpired`])
//!
//! Both types hold a [`SigningSecret`] loaded once at startup. Neither touches
//! the network or mutates shared state, so they can be cloned freely into
//! request handlers.

pub mod claims;
pub mod codec;
pub mod error;
pub mod secret;
pub mod secret_validation;
pub mod validator;

pub use claims::{Claims, Principal};
pub use codec::{DecodedToken, TokenCodec};
pub use error::{SigningError, SigningResult, TokenError, TokenResult};
pub use secret::SigningSecret;
pub use secret_validation::{validate_secret_strength, SecretStrength};
pub use validator::TokenValidator;
