//! Approval token generation and verification.
//!
//! Tokens are unguessable single-use strings handed to a client so they can
//! sign off on out-of-scope work. Only a hash is stored at rest — the same
//! treatment the platform gives password-reset tokens — and verification is
//! constant-time. The plaintext leaves [`ApprovalTokenSecret`] exactly once,
//! in the approval-request notification, and is zeroized on drop.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ApprovalError, Result};

/// Prefix for approval tokens to make them easily identifiable.
const TOKEN_PREFIX: &str = "sp_";

/// Length of the random portion of the token.
const TOKEN_RANDOM_LENGTH: usize = 32;

/// A hash of the approval token, used for verification.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApprovalTokenHash {
    /// The blake3 hash of the token.
    hash: [u8; 32],
}

impl ApprovalTokenHash {
    /// Creates a hash from a plaintext token.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        let hash = blake3::hash(token.as_bytes());
        Self {
            hash: *hash.as_bytes(),
        }
    }

    /// Verifies that a plaintext token matches this hash.
    #[must_use]
    pub fn verify(&self, token: &str) -> bool {
        let other_hash = blake3::hash(token.as_bytes());
        // Constant-time comparison
        use subtle::ConstantTimeEq;
        self.hash.ct_eq(other_hash.as_bytes()).into()
    }
}

impl fmt::Debug for ApprovalTokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never expose the hash in debug output
        f.debug_struct("ApprovalTokenHash")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl PartialEq for ApprovalTokenHash {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.hash.ct_eq(&other.hash).into()
    }
}

impl Eq for ApprovalTokenHash {}

/// The plaintext approval token, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ApprovalTokenSecret {
    /// The plaintext token.
    token: String,
}

impl ApprovalTokenSecret {
    /// Creates a new random approval token.
    #[must_use]
    pub fn generate() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let random: String = (0..TOKEN_RANDOM_LENGTH)
            .map(|_| {
                let idx = rng.gen_range(0..62);
                match idx {
                    0..=9 => (b'0' + idx) as char,
                    10..=35 => (b'a' + idx - 10) as char,
                    _ => (b'A' + idx - 36) as char,
                }
            })
            .collect();
        Self {
            token: format!("{TOKEN_PREFIX}{random}"),
        }
    }

    /// Creates from an existing string.
    #[must_use]
    pub fn from_string(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// Creates a hash of this token for storage.
    #[must_use]
    pub fn hash(&self) -> ApprovalTokenHash {
        ApprovalTokenHash::from_token(&self.token)
    }

    /// Validates the token format.
    ///
    /// # Errors
    ///
    /// Returns an error if the token format is invalid.
    pub fn validate(&self) -> Result<()> {
        if !self.token.starts_with(TOKEN_PREFIX) {
            return Err(ApprovalError::invalid_state(format!(
                "token must start with '{TOKEN_PREFIX}'"
            )));
        }
        let suffix = &self.token[TOKEN_PREFIX.len()..];
        if suffix.len() < 16 {
            return Err(ApprovalError::invalid_state("token is too short"));
        }
        if !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ApprovalError::invalid_state(
                "token contains invalid characters",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ApprovalTokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never expose the token in debug output
        let visible = if self.token.len() > 6 {
            format!("{}...", &self.token[..6])
        } else {
            "[SHORT]".to_string()
        };
        f.debug_struct("ApprovalTokenSecret")
            .field("token", &visible)
            .finish()
    }
}
