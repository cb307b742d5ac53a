//! Pure token validation.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use crate::claims::Principal;
use crate::codec::{DecodedToken, TokenCodec};
use crate::error::{SigningError, SigningResult, TokenError, TokenResult};
use crate::secret::SigningSecret;

type HmacSha256 = Hmac<Sha256>;

/// Checks tokens issued by a [`TokenCodec`] holding the same secret.
///
/// No side effects and no shared mutable state; the keyed MAC is built once
/// and cloned per call.
#[derive(Clone)]
pub struct TokenValidator {
    mac: HmacSha256,
}

impl TokenValidator {
    pub fn new(secret: &SigningSecret) -> SigningResult<Self> {
        let mac = HmacSha256::new_from_slice(secret.expose())
            .map_err(|e| SigningError::InvalidSecret(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Validate against the current clock and return the embedded subject.
    pub fn validate(&self, token: &str) -> TokenResult<Principal> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Decode, then signature, then expiry. Stops at the first failure.
    pub fn validate_at(&self, token: &str, now: i64) -> TokenResult<Principal> {
        let decoded = TokenCodec::decode(token)?;
        self.verify_signature(&decoded)?;

        if decoded.claims().is_expired_at(now) {
            return Err(TokenError::TokenExpired);
        }

        Ok(decoded.subject())
    }

    /// `verify_slice` compares in constant time for equal-length tags.
    fn verify_signature(&self, decoded: &DecodedToken<'_>) -> TokenResult<()> {
        let mut mac = self.mac.clone();
        mac.update(decoded.signing_input().as_bytes());
        mac.verify_slice(decoded.signature())
            .map_err(|_| TokenError::SignatureInvalid)
    }
}

impl fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenValidator").finish_non_exhaustive()
    }
}
