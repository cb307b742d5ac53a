/// Password hashing and verification using Argon2id
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use once_cell::sync::Lazy;

use crate::error::{AuthError, AuthResult};

/// PHC hash of a random throwaway password, used to keep the unknown-user
/// login path as expensive as the wrong-password path.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| {
    let salt = SaltString::generate(rand::thread_rng());
    Argon2::default()
        .hash_password(salt.as_str().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| tracing::error!("failed to build dummy password hash: {}", e))
        .ok()
});

/// Hash a password using Argon2id
/// Returns the PHC string suitable for storage
pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(rand::thread_rng());
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AuthError::AccountCreationFailed("failed to hash password".to_string()))?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> AuthResult<()> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AuthError::Internal("Invalid password hash format".to_string()))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Build the dummy hash now so the first unknown-user login does not pay for
/// it. Returns whether a dummy hash is available.
pub fn prepare_dummy_hash() -> bool {
    Lazy::force(&DUMMY_HASH).is_some()
}

#[cfg(test)]
pub(crate) fn dummy_hash_ready() -> bool {
    Lazy::get(&DUMMY_HASH).is_some()
}

/// Run one verification against the dummy hash. Always fails.
pub fn verify_password_against_dummy(password: &str) -> AuthError {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
    AuthError::InvalidCredentials
}
