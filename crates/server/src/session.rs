// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Bearer-session extraction for the server.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use custody_api::{ApiError, authenticate};
use custody_domain::User;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::{AppState, HttpError};

/// Extractor for the calling user.
///
/// Validates the `Authorization: Bearer <token>` header and loads the
/// current user record. Whether the user may act is left to the
/// operation being called.
///
/// # Usage
///
/// ```ignore
/// async fn my_handler(
///     SessionUser { user, .. }: SessionUser,
/// ) -> Result<Json<Response>, HttpError> {
///     Ok(Json(Response { ... }))
/// }
/// ```
///
/// # Errors
///
/// Rejects with HTTP 401 if the header is missing or malformed, or the
/// session is unknown or expired.
pub struct SessionUser {
    /// The user record, read fresh for this request.
    pub user: User,
    /// The bearer token the request carried.
    pub session_token: String,
}

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = SessionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| {
                debug!("Missing Authorization header");
                SessionError::MissingAuthorizationHeader
            })?
            .to_str()
            .map_err(|_| {
                warn!("Invalid Authorization header encoding");
                SessionError::InvalidAuthorizationHeader
            })?;

        let token: &str = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            warn!("Authorization header does not start with 'Bearer '");
            SessionError::InvalidAuthorizationHeader
        })?;

        let mut persistence = state.persistence.lock().await;
        let user: User = authenticate(&mut persistence, token, OffsetDateTime::now_utc())
            .map_err(|e| {
                debug!(error = %e, "Session validation failed");
                SessionError::InvalidSession(e)
            })?;

        debug!(user_id = user.id.value(), "Session validated");

        Ok(Self {
            user,
            session_token: token.to_string(),
        })
    }
}

/// Session extraction errors.
#[derive(Debug)]
pub enum SessionError {
    /// Authorization header is missing.
    MissingAuthorizationHeader,
    /// Authorization header format is invalid.
    InvalidAuthorizationHeader,
    /// Session validation failed.
    InvalidSession(ApiError),
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let err: ApiError = match self {
            Self::MissingAuthorizationHeader => ApiError::AuthenticationFailed {
                reason: String::from("Missing Authorization header"),
            },
            Self::InvalidAuthorizationHeader => ApiError::AuthenticationFailed {
                reason: String::from(
                    "Invalid Authorization header format. Expected: 'Bearer <token>'",
                ),
            },
            Self::InvalidSession(err) => err,
        };

        HttpError::from(err).into_response()
    }
}
