use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Opaque identity of an account, carried in the `sub` claim.
///
/// Immutable once issued into a token; downstream handlers receive it
/// through request extensions after the gate accepts a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for Principal {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for Principal {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for Principal {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for Principal {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Token payload. Field order is the serialized order, which keeps issuing
/// deterministic for a fixed subject and clock reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration time (Unix seconds)
    pub exp: i64,
}

impl Claims {
    pub fn new(subject: &Principal, issued_at: i64, ttl: Duration) -> Self {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        Self {
            sub: subject.as_str().to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(ttl_secs),
        }
    }

    pub fn subject(&self) -> Principal {
        Principal::new(self.sub.clone())
    }

    /// A token is usable strictly before `exp`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining_at(&self, now: i64) -> Duration {
        let remaining = self.exp.saturating_sub(now);
        Duration::from_secs(u64::try_from(remaining).unwrap_or(0))
    }
}
