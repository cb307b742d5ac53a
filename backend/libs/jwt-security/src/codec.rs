//! Token encoding and structural decoding.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::claims::{Claims, Principal};
use crate::error::{SigningError, SigningResult, TokenError, TokenResult};
use crate::secret::SigningSecret;

const EXPECTED_ALG: &str = "HS256";

#[derive(Deserialize)]
struct JoseHeader {
    alg: String,
}

/// Issues HS256 tokens for a fixed signing secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
}

impl TokenCodec {
    pub fn new(secret: &SigningSecret) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.expose()),
        }
    }

    /// Issue a token for `subject` that expires `ttl` from now.
    pub fn issue(&self, subject: &Principal, ttl: Duration) -> SigningResult<String> {
        self.issue_at(subject, ttl, Utc::now().timestamp())
    }

    /// Issue against an explicit clock reading (Unix seconds).
    ///
    /// Deterministic: the same subject, ttl and `now` always produce the
    /// same token.
    pub fn issue_at(&self, subject: &Principal, ttl: Duration, now: i64) -> SigningResult<String> {
        let claims = Claims::new(subject, now, ttl);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| SigningError::Signing(e.to_string()))
    }

    /// Parse a token's structure without checking its signature or expiry.
    pub fn decode(token: &str) -> TokenResult<DecodedToken<'_>> {
        let mut segments = token.split('.');
        let (header_segment, claims_segment, signature_segment) = match (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) {
            (Some(h), Some(c), Some(s), None) if !h.is_empty() && !c.is_empty() && !s.is_empty() => {
                (h, c, s)
            }
            _ => return Err(malformed("expected three dot-separated segments")),
        };

        let header: JoseHeader = decode_json_segment(header_segment, "header")?;
        if header.alg != EXPECTED_ALG {
            return Err(malformed("unsupported signing algorithm"));
        }

        let claims: Claims = decode_json_segment(claims_segment, "claims")?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature_segment)
            .map_err(|_| malformed("signature is not base64url"))?;

        let signing_input_len = header_segment.len() + 1 + claims_segment.len();

        Ok(DecodedToken {
            signing_input: &token[..signing_input_len],
            claims,
            signature,
        })
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

/// Structural view of a token: the signed bytes, the claims and the raw MAC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken<'a> {
    signing_input: &'a str,
    claims: Claims,
    signature: Vec<u8>,
}

impl<'a> DecodedToken<'a> {
    pub fn subject(&self) -> Principal {
        self.claims.subject()
    }

    pub fn issued_at(&self) -> i64 {
        self.claims.iat
    }

    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// `header.claims` exactly as presented; the MAC covers these bytes.
    pub fn signing_input(&self) -> &'a str {
        self.signing_input
    }
}

fn decode_json_segment<T: DeserializeOwned>(segment: &str, what: &str) -> TokenResult<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| malformed(&format!("{} is not base64url", what)))?;

    serde_json::from_slice(&bytes).map_err(|_| malformed(&format!("{} is not valid JSON", what)))
}

fn malformed(reason: &str) -> TokenError {
    TokenError::MalformedToken(reason.to_string())
}
