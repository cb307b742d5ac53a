//! # Actix Middleware Library
//!
//! Request-path building blocks shared by the HTTP services.
//!
//! ## Modules
//! - `jwt_auth`: bearer token gate and its actix middleware
//! - `revocation`: logout tombstones with a declared outage policy
//! - `metrics`: Prometheus metrics middleware and collectors
//! - `logging`: request/response logging
//! - `error_body`: JSON error envelope shared by all error responses

pub mod error_body;
pub mod jwt_auth;
pub mod logging;
pub mod metrics;
pub mod revocation;

pub use error_body::ErrorBody;
pub use jwt_auth::{
    extract_bearer, AuthDecision, AuthGate, AuthRejection, AuthenticatedUser, GateStage,
    JwtAuthMiddleware,
};
pub use logging::Logging;
pub use metrics::MetricsMiddleware;
pub use revocation::{
    BackendError, FailurePolicy, InMemoryRevocationBackend, RedisRevocationBackend,
    RevocationBackend, RevocationConfig, RevocationError, RevocationStore, MAX_TOMBSTONE_TTL,
};
