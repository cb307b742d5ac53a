// Auth Service Library

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod security;
pub mod services;
pub mod telemetry;


use actix_middleware::{AuthGate, RevocationStore};
use jwt_security::{SigningResult, SigningSecret, TokenCodec, TokenValidator};
use std::sync::Arc;

use crate::db::AccountRepository;
use crate::services::{SessionConfig, SessionService};

pub use error::{AuthError, AuthResult};

/// Shared handles for request handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionService>,
    pub gate: Arc<AuthGate>,
}

impl AppState {
    /// Wire one signing secret and one revocation store into both the
    /// session service and the auth gate.
    pub fn new(
        secret: &SigningSecret,
        revocations: RevocationStore,
        accounts: Arc<dyn AccountRepository>,
        session: SessionConfig,
    ) -> SigningResult<Self> {
        let gate = AuthGate::new(TokenValidator::new(secret)?, revocations.clone());
        let sessions = SessionService::new(accounts, TokenCodec::new(secret), revocations, session);

        Ok(Self {
            sessions: Arc::new(sessions),
            gate: Arc::new(gate),
        })
    }
}
