//! Stateless signed sessions.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthError, AuthResult};
use crate::models::{Account, Role};

/// Default absolute session lifetime.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Claim set carried inside a session token.
///
/// Immutable once issued. There is no refresh: a session simply stops
/// verifying at `exp`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Account id
    pub sub: i64,
    pub username: String,
    pub role: Option<Role>,
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

impl Session {
    pub fn account_id(&self) -> i64 {
        self.sub
    }

    /// A session is expired from the instant `exp` is reached.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }
}

/// Signs and verifies session tokens with a shared HS256 secret.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionIssuer {
    /// Issuer with the default 24 hour lifetime.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_ttl(secret, Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }

    pub fn with_ttl(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Issue a token for `account`, valid from now.
    pub fn issue(&self, account: &Account) -> AuthResult<(String, Session)> {
        self.issue_at(account, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, account: &Account, now: i64) -> AuthResult<(String, Session)> {
        let session = Session {
            sub: account.id,
            username: account.username.clone(),
            role: account.role,
            patient_id: account.patient_id,
            doctor_id: account.doctor_id,
            iat: now,
            exp: now + self.ttl.num_seconds(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &session, &self.encoding)
            .map_err(AuthError::TokenEncoding)?;
        Ok((token, session))
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> AuthResult<Session> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify signature and shape, then check expiry against `now`.
    ///
    /// Every failure collapses to [`AuthError::InvalidOrExpiredToken`].
    pub fn verify_at(&self, token: &str, now: i64) -> AuthResult<Session> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is checked below against the caller's clock
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        let session = decode::<Session>(token, &self.decoding, &validation)
            .map_err(|_| AuthError::InvalidOrExpiredToken)?
            .claims;

        if session.is_expired_at(now) {
            return Err(AuthError::InvalidOrExpiredToken);
        }
        Ok(session)
    }
}
