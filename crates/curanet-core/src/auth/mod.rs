//! Identity and session issuing.
//!
//! Login verifies a bcrypt password hash and mints a signed, time-limited
//! session token. Sessions are never stored server side: the token *is* the
//! session, and [`SessionIssuer::verify`] is the only way to turn one back
//! into a [`Session`].

mod password;
mod session;

pub use password::*;
pub use session::*;

use thiserror::Error;
use tracing::{debug, info};

use crate::db::DbError;
use crate::models::{Account, AccountProfile};

/// Authentication errors.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown username or wrong password. Deliberately indistinguishable.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Token encoding error: {0}")]
    TokenEncoding(#[source] jsonwebtoken::errors::Error),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub session: Session,
    pub profile: AccountProfile,
}

/// Check `password` against an already loaded account and issue a session.
///
/// Needs no store access, so callers release any database lock before
/// paying for bcrypt. `None` means the username was not found.
pub fn verify_credentials(
    issuer: &SessionIssuer,
    account: Option<Account>,
    username: &str,
    password: &str,
) -> AuthResult<LoginOutcome> {
    let account = match account {
        Some(account) => account,
        None => {
            // Burn the same bcrypt work as a real check
            burn_verification(password);
            debug!(username, "login for unknown username");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !verify_password(password, &account.password_hash) {
        debug!(account_id = account.id, "login with wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let (token, session) = issuer.issue(&account)?;
    info!(account_id = account.id, role = ?account.role, "session issued");

    Ok(LoginOutcome {
        token,
        session,
        profile: account.profile(),
    })
}
