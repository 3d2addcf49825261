// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use custody_domain::UserId;
use diesel::SqliteConnection;
use diesel::prelude::*;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::backend::sqlite::get_last_insert_rowid;
use crate::diesel_schema::sessions;
use crate::error::PersistenceError;
use crate::timestamps::to_stored;

/// Creates a new session.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `session_token` - The opaque bearer token
/// * `user_id` - The authenticated user
/// * `now` - The creation time
/// * `expires_at` - When the session expires
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn create_session(
    conn: &mut SqliteConnection,
    session_token: &str,
    user_id: UserId,
    now: OffsetDateTime,
    expires_at: OffsetDateTime,
) -> Result<i64, PersistenceError> {
    let created_at: String = to_stored(now)?;

    diesel::insert_into(sessions::table)
        .values((
            sessions::session_token.eq(session_token),
            sessions::user_id.eq(user_id.value()),
            sessions::created_at.eq(&created_at),
            sessions::last_activity_at.eq(&created_at),
            sessions::expires_at.eq(to_stored(expires_at)?),
        ))
        .execute(conn)?;

    let session_id: i64 = get_last_insert_rowid(conn)?;
    info!(session_id, user_id = user_id.value(), "Session created");
    Ok(session_id)
}

/// Updates the last activity timestamp of a session.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn update_session_activity(
    conn: &mut SqliteConnection,
    session_id: i64,
    now: OffsetDateTime,
) -> Result<(), PersistenceError> {
    diesel::update(sessions::table)
        .filter(sessions::session_id.eq(session_id))
        .set(sessions::last_activity_at.eq(to_stored(now)?))
        .execute(conn)?;
    Ok(())
}

/// Deletes a session by token. Deleting an unknown token is not an error.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_session(
    conn: &mut SqliteConnection,
    session_token: &str,
) -> Result<(), PersistenceError> {
    let deleted: usize = diesel::delete(sessions::table)
        .filter(sessions::session_token.eq(session_token))
        .execute(conn)?;
    debug!(deleted, "Session deleted");
    Ok(())
}

/// Deletes every session that expired at or before `now`.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_expired_sessions(
    conn: &mut SqliteConnection,
    now: OffsetDateTime,
) -> Result<usize, PersistenceError> {
    let deleted: usize = diesel::delete(sessions::table)
        .filter(sessions::expires_at.le(to_stored(now)?))
        .execute(conn)?;

    if deleted > 0 {
        info!(deleted, "Expired sessions removed");
    }
    Ok(deleted)
}
