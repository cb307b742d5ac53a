//! Server-held signing secret.

use std::fmt;
use std::sync::Arc;
use tracing::warn;
use zeroize::Zeroizing;

use crate::error::{SigningError, SigningResult};
use crate::secret_validation::{validate_secret_strength, SecretStrength, MIN_SECRET_LENGTH};

/// HMAC key shared read-only by every request handler.
///
/// Loaded once at startup. Clones share the same bytes, which are zeroed
/// when the last clone is dropped.
#[derive(Clone)]
pub struct SigningSecret {
    bytes: Arc<Zeroizing<Vec<u8>>>,
}

impl SigningSecret {
    /// Accepts `Acceptable` and `Strong` secrets, refuses `Weak` ones.
    pub fn new(raw: impl AsRef<[u8]>) -> SigningResult<Self> {
        let raw = raw.as_ref();

        if raw.len() < MIN_SECRET_LENGTH {
            return Err(SigningError::InvalidSecret(format!(
                "secret must be at least {} bytes, got {}",
                MIN_SECRET_LENGTH,
                raw.len()
            )));
        }

        match validate_secret_strength(raw) {
            SecretStrength::Weak => {
                return Err(SigningError::InvalidSecret(
                    "secret has low entropy or an obvious pattern".to_string(),
                ))
            }
            SecretStrength::Acceptable => {
                warn!(
                    length = raw.len(),
                    "Signing secret is acceptable but below the recommended strength"
                );
            }
            SecretStrength::Strong => {}
        }

        Ok(Self {
            bytes: Arc::new(Zeroizing::new(raw.to_vec())),
        })
    }

    pub(crate) fn expose(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecret")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
