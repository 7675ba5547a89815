use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::error::AppError;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Claims of a token that passed signature and expiry checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: String,
}

// Internal detail only; callers of `verify` see a single "invalid" outcome.
#[derive(Debug, Error)]
enum TokenError {
    #[error("jwt rejected: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("empty 'sub' claim")]
    EmptySubject,
    #[error("token expired")]
    Expired,
}

/// Issues and verifies HS256 session tokens.
///
/// Tokens are signed, not encrypted: the claims are readable by the client
/// but cannot be altered without the secret. Nothing is stored server-side.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Clock,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("TokenService")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against our own clock in `verify_strict`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["sub".to_string(), "exp".to_string()]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Sign a token for `subject` (the username) valid for `ttl_minutes`.
    pub fn issue(&self, subject: &str, ttl_minutes: u64) -> Result<String, AppError> {
        let now = self.now();
        let exp = i64::try_from(ttl_minutes)
            .ok()
            .and_then(TimeDelta::try_minutes)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                error!(ttl_minutes, "session token ttl out of range");
                AppError::Internal
            })?;

        let claims = SessionClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(
            |e| {
                error!(error = %e, "failed to sign session token");
                AppError::Internal
            },
        )
    }

    /// Bad signature, malformed structure and expiry all come back as `None`.
    pub fn verify(&self, token: &str) -> Option<VerifiedToken> {
        match self.verify_strict(token) {
            Ok(verified) => Some(verified),
            Err(e) => {
                debug!(error = %e, "session token rejected");
                None
            }
        }
    }

    fn verify_strict(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let data =
            jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?;
        let claims = data.claims;

        if claims.sub.trim().is_empty() {
            return Err(TokenError::EmptySubject);
        }
        if self.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(VerifiedToken {
            subject: claims.sub,
        })
    }
}
