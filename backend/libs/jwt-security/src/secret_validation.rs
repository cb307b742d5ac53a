//! Secret strength classification
//!
//! Guards the HS256 signing key against weak or patterned values before the
//! service starts issuing tokens.

pub(crate) const MIN_SECRET_LENGTH: usize = 32; // 256 bits minimum
const RECOMMENDED_SECRET_LENGTH: usize = 64; // 512 bits recommended

/// Secret strength classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretStrength {
    /// Refused at startup
    Weak,
    /// Accepted with a warning
    Acceptable,
    Strong,
}

/// Classify an HMAC secret.
///
/// **Criteria**:
/// - Minimum 32 bytes (256 bits)
/// - Recommended 64 bytes (512 bits)
/// - Shannon entropy > 4.0 bits/byte
/// - No runs of four repeating or sequential bytes
pub fn validate_secret_strength(secret: &[u8]) -> SecretStrength {
    if secret.len() < MIN_SECRET_LENGTH {
        return SecretStrength::Weak;
    }

    let entropy = shannon_entropy(secret);
    if entropy < 4.0 || has_obvious_patterns(secret) {
        return SecretStrength::Weak;
    }

    if secret.len() >= RECOMMENDED_SECRET_LENGTH && entropy >= 5.0 {
        SecretStrength::Strong
    } else {
        SecretStrength::Acceptable
    }
}

/// Bits per byte (0-8 scale)
fn shannon_entropy(data: &[u8]) -> f64 {
    let mut freq = [0u32; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }

    let len = data.len() as f64;
    freq.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

fn has_obvious_patterns(data: &[u8]) -> bool {
    const RUN: usize = 4;

    let mut repeating = 1;
    let mut sequential = 1;
    for window in data.windows(2) {
        repeating = if window[0] == window[1] { repeating + 1 } else { 1 };
        sequential = if window[1] as i16 - window[0] as i16 == 1 {
            sequential + 1
        } else {
            1
        };

        if repeating >= RUN || sequential >= RUN {
            return true;
        }
    }

    false
}
