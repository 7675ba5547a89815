use tracing::{debug, error};

use crate::error::AppError;

/// bcrypt only looks at the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Work factor used for every stored hash.
pub const HASH_COST: u32 = 12;

/// bcrypt hashing with silent truncation to [`MAX_PASSWORD_BYTES`].
///
/// Longer passwords are not rejected: two passwords sharing their first 72
/// bytes verify against each other's hash.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: HASH_COST }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Returns the self-describing `$2b$<cost>$<salt+digest>` string.
    pub fn hash(&self, password: &str) -> Result<String, bcrypt::BcryptError> {
        bcrypt::hash(truncate(password), self.cost)
    }

    /// Never fails: a malformed stored hash simply does not match.
    pub fn verify(&self, password: &str, hashed: &str) -> bool {
        match bcrypt::verify(truncate(password), hashed) {
            Ok(matches) => matches,
            Err(e) => {
                debug!(error = %e, "stored password hash could not be parsed");
                false
            }
        }
    }

    /// [`Self::hash`] on the blocking pool; bcrypt at cost 12 takes hundreds of milliseconds.
    pub async fn hash_blocking(self, password: String) -> Result<String, AppError> {
        tokio::task::spawn_blocking(move || self.hash(&password))
            .await
            .map_err(|e| {
                error!(error = %e, "password hashing task failed");
                AppError::Internal
            })?
            .map_err(|e| {
                error!(error = %e, "failed to hash password");
                AppError::Internal
            })
    }

    pub async fn verify_blocking(self, password: String, hashed: String) -> Result<bool, AppError> {
        tokio::task::spawn_blocking(move || self.verify(&password, &hashed))
            .await
            .map_err(|e| {
                error!(error = %e, "password verification task failed");
                AppError::Internal
            })
    }
}

fn truncate(password: &str) -> &[u8] {
    let bytes = password.as_bytes();
    &bytes[..bytes.len().min(MAX_PASSWORD_BYTES)]
}
