// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! User and organization mutations.

use custody_domain::{OrganizationId, UserId, validate_required_text};
use diesel::SqliteConnection;
use diesel::prelude::*;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::backend::sqlite::get_last_insert_rowid;
use crate::data_models::NewUser;
use crate::diesel_schema::{organizations, users};
use crate::error::PersistenceError;
use crate::queries::identity::normalize_login;
use crate::timestamps::to_stored;

/// Creates an organization.
///
/// # Errors
///
/// Returns an error if the name is empty or already taken.
pub fn create_organization(
    conn: &mut SqliteConnection,
    name: &str,
    short_name: &str,
) -> Result<OrganizationId, PersistenceError> {
    let name: String = validate_required_text("organization name", name)?;

    diesel::insert_into(organizations::table)
        .values((
            organizations::name.eq(&name),
            organizations::short_name.eq(short_name.trim()),
        ))
        .execute(conn)?;

    let organization_id: i64 = get_last_insert_rowid(conn)?;
    info!(organization_id, name = %name, "Organization created");
    Ok(OrganizationId::new(organization_id))
}

/// Creates a user account.
///
/// The login name is stored lowercase for case-insensitive uniqueness and
/// the password is bcrypt-hashed with `password_cost`.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `user` - The account to create
/// * `password_cost` - The bcrypt cost factor
/// * `now` - The creation time
///
/// # Errors
///
/// Returns an error if a required field is empty, hashing fails, or the
/// login name or email already exists.
pub fn create_user(
    conn: &mut SqliteConnection,
    user: &NewUser,
    password_cost: u32,
    now: OffsetDateTime,
) -> Result<UserId, PersistenceError> {
    let login_name: String = normalize_login(&validate_required_text("login name", &user.login_name)?);
    let first_name: String = validate_required_text("first name", &user.first_name)?;
    let last_name: String = validate_required_text("last name", &user.last_name)?;

    info!(login_name = %login_name, "Creating user");

    let password_hash: String = bcrypt::hash(&user.password, password_cost)
        .map_err(|e| PersistenceError::PasswordHash(format!("Failed to hash password: {e}")))?;

    diesel::insert_into(users::table)
        .values((
            users::login_name.eq(&login_name),
            users::password_hash.eq(&password_hash),
            users::first_name.eq(&first_name),
            users::last_name.eq(&last_name),
            users::middle_name.eq(user.middle_name.as_deref()),
            users::email.eq(user.email.as_deref()),
            users::position.eq(user.position.as_deref()),
            users::organization_id.eq(user.organization.map(OrganizationId::value)),
            users::is_active.eq(i32::from(user.is_active)),
            users::is_advanced_access.eq(i32::from(user.is_advanced_access)),
            users::otp_secret.eq(user.otp_secret.expose()),
            users::created_at.eq(to_stored(now)?),
        ))
        .execute(conn)?;

    let user_id: i64 = get_last_insert_rowid(conn)?;
    info!(user_id, "User created");
    Ok(UserId::new(user_id))
}

/// Sets a user's employment flag.
///
/// # Errors
///
/// Returns `NotFound` if the user does not exist.
pub fn set_user_active(
    conn: &mut SqliteConnection,
    user_id: UserId,
    is_active: bool,
) -> Result<(), PersistenceError> {
    info!(user_id = user_id.value(), is_active, "Updating user employment flag");

    let rows_affected: usize = diesel::update(users::table)
        .filter(users::user_id.eq(user_id.value()))
        .set(users::is_active.eq(i32::from(is_active)))
        .execute(conn)?;

    if rows_affected == 0 {
        return Err(PersistenceError::NotFound(format!("User {user_id} not found")));
    }
    Ok(())
}

/// Records a successful login.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub fn record_login(
    conn: &mut SqliteConnection,
    user_id: UserId,
    now: OffsetDateTime,
) -> Result<(), PersistenceError> {
    debug!(user_id = user_id.value(), "Updating last_login_at");

    diesel::update(users::table)
        .filter(users::user_id.eq(user_id.value()))
        .set(users::last_login_at.eq(Some(to_stored(now)?)))
        .execute(conn)?;
    Ok(())
}
