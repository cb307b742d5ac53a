//! Login, logout and registration.

use actix_middleware::RevocationStore;
use chrono::Utc;
use jwt_security::{Principal, TokenCodec};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::AccountRepository;
use crate::error::{AuthError, AuthResult};
use crate::metrics;
use crate::models::{LoginRequest, LoginResponse, NewAccount, RegisterRequest, UserProfile};
use crate::security::password;

/// Lifetimes applied to issued tokens and to logout tombstones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub token_ttl: Duration,
    /// Floor for the tombstone TTL; see [`SessionService::tombstone_ttl_at`].
    pub revocation_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::from_secs(24 * 60 * 60),
            revocation_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

pub struct SessionService {
    accounts: Arc<dyn AccountRepository>,
    codec: TokenCodec,
    revocations: RevocationStore,
    config: SessionConfig,
}

impl SessionService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        codec: TokenCodec,
        revocations: RevocationStore,
        config: SessionConfig,
    ) -> Self {
        if !password::prepare_dummy_hash() {
            warn!("Dummy password hash unavailable; unknown-user logins are not timing-equalized");
        }

        Self {
            accounts,
            codec,
            revocations,
            config,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> AuthResult<UserProfile> {
        metrics::inc_register_requests();
        req.validate()?;

        let password_hash = password::hash_password(&req.password)?;
        let account = self
            .accounts
            .create(NewAccount {
                full_name: req.full_name,
                username: req.username,
                email: req.email,
                password_hash,
                address: req.address,
                phone_number: req.phone_number,
                city: req.city,
                postal_code: req.postal_code,
            })
            .await?;

        info!(user_id = %account.id, username = %account.username, "Account registered");
        Ok(account.profile())
    }

    /// Unknown username and wrong password both end in one Argon2
    /// verification and the same [`AuthError::InvalidCredentials`].
    pub async fn login(&self, req: LoginRequest) -> AuthResult<LoginResponse> {
        metrics::inc_login_requests();

        let account = match self.accounts.find_by_username(&req.username).await? {
            Some(account) => account,
            None => {
                metrics::inc_login_failures();
                return Err(password::verify_password_against_dummy(&req.password));
            }
        };

        if let Err(e) = password::verify_password(&req.password, &account.password_hash) {
            metrics::inc_login_failures();
            return Err(e);
        }

        let token = self
            .codec
            .issue(&Principal::from(account.id), self.config.token_ttl)?;

        info!(user_id = %account.id, "Login succeeded");
        Ok(LoginResponse {
            token,
            profile: account.profile(),
        })
    }

    /// Write a tombstone for `token`. Repeat calls overwrite the same entry.
    pub async fn logout(&self, token: &str) -> AuthResult<()> {
        let ttl = self.tombstone_ttl_at(token, Utc::now().timestamp());
        self.revocations.revoke(token, ttl).await?;
        metrics::inc_logouts();
        Ok(())
    }

    /// `max(configured revocation TTL, token remaining lifetime)`, so a
    /// tombstone never expires while its token is still valid. Tokens that do
    /// not decode get the configured TTL.
    pub fn tombstone_ttl_at(&self, token: &str, now: i64) -> Duration {
        let remaining = TokenCodec::decode(token)
            .map(|decoded| decoded.claims().remaining_at(now))
            .unwrap_or(Duration::ZERO);

        self.config.revocation_ttl.max(remaining)
    }

    pub async fn profile(&self, principal: &Principal) -> AuthResult<UserProfile> {
        let id = Uuid::parse_str(principal.as_str()).map_err(|_| {
            warn!(user_id = %principal, "Authenticated subject is not an account id");
            AuthError::AccountNotFound
        })?;

        self.accounts
            .find_by_id(id)
            .await?
            .map(|account| account.profile())
            .ok_or(AuthError::AccountNotFound)
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }
}
