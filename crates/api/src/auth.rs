// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Session-based authentication.
//!
//! Sessions only establish who the caller is. Whether the caller may act
//! is decided by the workflow engine on every call against a fresh read of
//! the user record.

use custody_domain::User;
use custody_persistence::{Persistence, SessionData, UserCredentials};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::error::AuthError;

/// How long sessions live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Time from login until the session expires.
    pub lifetime: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            lifetime: Duration::hours(12),
        }
    }
}

/// A freshly created session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// The opaque bearer token.
    pub session_token: String,
    /// The authenticated user.
    pub user: User,
    /// When the session expires.
    pub expires_at: OffsetDateTime,
}

/// Authentication service for session-based authentication.
pub struct AuthenticationService;

impl AuthenticationService {
    /// Verifies credentials and creates a session.
    ///
    /// Expired sessions are purged first.
    ///
    /// # Arguments
    ///
    /// * `persistence` - The persistence layer
    /// * `login_name` - The login name, matched case-insensitively
    /// * `password` - The plain-text password
    /// * `policy` - The session lifetime policy
    /// * `now` - The current time
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for an unknown login or wrong password,
    /// `AccountDisabled` for an inactive user, or `Backend` on a storage
    /// failure.
    pub fn login(
        persistence: &mut Persistence,
        login_name: &str,
        password: &str,
        policy: &SessionPolicy,
        now: OffsetDateTime,
    ) -> Result<LoginOutcome, AuthError> {
        persistence.delete_expired_sessions(now)?;

        let Some(credentials) = persistence.get_credentials_by_login(login_name)? else {
            debug!("Login rejected: unknown login name");
            return Err(AuthError::InvalidCredentials);
        };
        let UserCredentials {
            user,
            password_hash,
        } = credentials;

        if !Persistence::verify_password(password, &password_hash)? {
            warn!(user_id = user.id.value(), "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            warn!(user_id = user.id.value(), "Login rejected: account disabled");
            return Err(AuthError::AccountDisabled);
        }

        let session_token: String = Self::generate_session_token();
        let expires_at: OffsetDateTime = now + policy.lifetime;

        persistence.create_session(&session_token, user.id, now, expires_at)?;
        persistence.record_login(user.id, now)?;

        info!(user_id = user.id.value(), "User logged in");
        Ok(LoginOutcome {
            session_token,
            user,
            expires_at,
        })
    }

    /// Resolves a session token to the current user record.
    ///
    /// The user is read fresh on every call. An inactive user is still
    /// returned; write paths reject them through the engine.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSession` if the token is unknown or its user is
    /// gone, `SessionExpired` if it has expired, or `Backend` on a storage
    /// failure.
    pub fn validate_session(
        persistence: &mut Persistence,
        session_token: &str,
        now: OffsetDateTime,
    ) -> Result<(SessionData, User), AuthError> {
        let session: SessionData = persistence
            .get_session_by_token(session_token)?
            .ok_or(AuthError::InvalidSession)?;

        if now >= session.expires_at {
            return Err(AuthError::SessionExpired);
        }

        let user: User = persistence
            .get_user(session.user_id)?
            .ok_or(AuthError::InvalidSession)?;

        persistence.update_session_activity(session.session_id, now)?;

        Ok((session, user))
    }

    /// Logs out by deleting the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the logout fails.
    pub fn logout(persistence: &mut Persistence, session_token: &str) -> Result<(), AuthError> {
        persistence.delete_session(session_token)?;
        Ok(())
    }

    /// Generates an opaque 256-bit session token.
    fn generate_session_token() -> String {
        (0..4)
            .map(|_| format!("{:016x}", rand::random::<u64>()))
            .collect()
    }
}
