//! Logout tombstones in a shared TTL key-value store.
//!
//! [`RevocationStore`] owns key derivation, the bounded timeout around every
//! backend call and the outage policy. Backends only speak raw
//! `put`/`exists` against the cache.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::metrics::{REVOCATION_LOOKUP_DURATION_SECONDS, REVOCATION_STORE_ERRORS_TOTAL};

/// Marker stored under each revoked token key.
pub const TOMBSTONE_VALUE: &str = "true";

const DEFAULT_TIMEOUT_MS: u64 = 250;

/// Longest tombstone ever written (ten years). Longer requests, including
/// `Duration::MAX`, are clamped to it. Redis rejects `EX` values whose
/// absolute expiry overflows its millisecond clock.
pub const MAX_TOMBSTONE_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("revocation backend unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevocationError {
    #[error("revocation store unavailable: {0}")]
    StoreUnavailable(String),
}

/// What a failed revocation lookup means for the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Treat the token as rejected.
    #[default]
    FailClosed,
    /// Treat the token as not revoked.
    FailOpen,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::FailClosed => "fail_closed",
            FailurePolicy::FailOpen => "fail_open",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw TTL-capable key-value operations.
#[async_trait]
pub trait RevocationBackend: Send + Sync {
    async fn put(&self, key: &str, ttl_secs: u64) -> Result<(), BackendError>;

    async fn exists(&self, key: &str) -> Result<bool, BackendError>;

    fn name(&self) -> &'static str;
}

/// Redis backend: `SET key "true" EX ttl` / `EXISTS key`.
#[derive(Clone)]
pub struct RedisRevocationBackend {
    redis: ConnectionManager,
}

impl RedisRevocationBackend {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl RevocationBackend for RedisRevocationBackend {
    async fn put(&self, key: &str, ttl_secs: u64) -> Result<(), BackendError> {
        let mut conn = self.redis.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(TOMBSTONE_VALUE)
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, BackendError> {
        let mut conn = self.redis.clone();
        let exists: bool = redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(exists)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Process-local backend with per-entry deadlines.
///
/// Single-node development and tests. Can be switched unavailable or slowed
/// down to exercise the outage paths.
#[derive(Default)]
pub struct InMemoryRevocationBackend {
    entries: DashMap<String, Instant>,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

impl InMemoryRevocationBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Remaining lifetime of a live entry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let deadline = *self.entries.get(key)?;
        deadline.checked_duration_since(Instant::now())
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|entry| *entry.value() > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn simulate_network(&self) -> Result<(), BackendError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl RevocationBackend for InMemoryRevocationBackend {
    async fn put(&self, key: &str, ttl_secs: u64) -> Result<(), BackendError> {
        self.simulate_network().await?;
        let ttl = Duration::from_secs(ttl_secs).min(MAX_TOMBSTONE_TTL);
        let deadline = Instant::now() + ttl;
        self.entries.insert(key.to_string(), deadline);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, BackendError> {
        self.simulate_network().await?;
        let now = Instant::now();
        let live = self
            .entries
            .get(key)
            .map(|deadline| *deadline > now)
            .unwrap_or(false);
        if !live {
            self.entries.remove_if(key, |_, deadline| *deadline <= now);
        }
        Ok(live)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[derive(Debug, Clone)]
pub struct RevocationConfig {
    pub policy: FailurePolicy,
    /// Upper bound on every backend call.
    pub timeout: Duration,
    /// Prepended to the literal token string to form the key.
    pub key_prefix: String,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::default(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            key_prefix: String::new(),
        }
    }
}

/// Tombstone ledger with a declared outage policy.
#[derive(Clone)]
pub struct RevocationStore {
    backend: Arc<dyn RevocationBackend>,
    policy: FailurePolicy,
    timeout: Duration,
    key_prefix: Arc<str>,
}

impl RevocationStore {
    pub fn new(backend: Arc<dyn RevocationBackend>, config: RevocationConfig) -> Self {
        info!(
            backend = backend.name(),
            policy = %config.policy,
            timeout_ms = config.timeout.as_millis() as u64,
            "Revocation store initialized"
        );

        Self {
            backend,
            policy: config.policy,
            timeout: config.timeout,
            key_prefix: Arc::from(config.key_prefix),
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Write a tombstone for `token`. Overwrites an existing one, so repeat
    /// calls succeed. Failures are always surfaced regardless of policy.
    ///
    /// `ttl` is clamped to [`MAX_TOMBSTONE_TTL`].
    pub async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), RevocationError> {
        let key = self.key_for(token);
        if ttl > MAX_TOMBSTONE_TTL {
            warn!(
                token = %fingerprint(token),
                requested_secs = ttl.as_secs(),
                max_secs = MAX_TOMBSTONE_TTL.as_secs(),
                "Tombstone TTL clamped"
            );
        }
        let ttl_secs = whole_seconds(ttl.min(MAX_TOMBSTONE_TTL));

        match timeout(self.timeout, self.backend.put(&key, ttl_secs)).await {
            Ok(Ok(())) => {
                info!(
                    token = %fingerprint(token),
                    ttl_secs,
                    "Token revoked"
                );
                Ok(())
            }
            Ok(Err(e)) => Err(self.write_failure(token, e.to_string())),
            Err(_) => Err(self.write_failure(token, "timed out".to_string())),
        }
    }

    /// Whether a live tombstone exists for `token`.
    ///
    /// A missing key is "not revoked". A failed or timed-out lookup follows
    /// the configured [`FailurePolicy`].
    pub async fn is_revoked(&self, token: &str) -> Result<bool, RevocationError> {
        let key = self.key_for(token);
        let started = std::time::Instant::now();

        let outcome = timeout(self.timeout, self.backend.exists(&key)).await;
        REVOCATION_LOOKUP_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

        let reason = match outcome {
            Ok(Ok(revoked)) => return Ok(revoked),
            Ok(Err(e)) => e.to_string(),
            Err(_) => "timed out".to_string(),
        };

        REVOCATION_STORE_ERRORS_TOTAL
            .with_label_values(&["lookup", self.policy.as_str()])
            .inc();

        match self.policy {
            FailurePolicy::FailClosed => {
                error!(
                    token = %fingerprint(token),
                    error = %reason,
                    policy = %self.policy,
                    "Revocation lookup failed; rejecting token"
                );
                Err(RevocationError::StoreUnavailable(reason))
            }
            FailurePolicy::FailOpen => {
                warn!(
                    token = %fingerprint(token),
                    error = %reason,
                    policy = %self.policy,
                    "Revocation lookup failed; treating token as not revoked"
                );
                Ok(false)
            }
        }
    }

    pub fn key_for(&self, token: &str) -> String {
        let mut key = String::with_capacity(self.key_prefix.len() + token.len());
        key.push_str(&self.key_prefix);
        key.push_str(token);
        key
    }

    fn write_failure(&self, token: &str, reason: String) -> RevocationError {
        REVOCATION_STORE_ERRORS_TOTAL
            .with_label_values(&["revoke", self.policy.as_str()])
            .inc();
        error!(
            token = %fingerprint(token),
            error = %reason,
            "Failed to write revocation tombstone"
        );
        RevocationError::StoreUnavailable(reason)
    }
}

impl fmt::Debug for RevocationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevocationStore")
            .field("backend", &self.backend.name())
            .field("policy", &self.policy)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Round up to whole seconds, never below one (`EX 0` is rejected by Redis).
fn whole_seconds(ttl: Duration) -> u64 {
    let secs = ttl
        .as_secs()
        .saturating_add(u64::from(ttl.subsec_nanos() > 0));
    secs.max(1)
}

/// Short SHA-256 prefix so logs can correlate tokens without leaking them.
pub(crate) fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}
