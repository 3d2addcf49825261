// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! User and organization queries.

use custody_domain::{Organization, OrganizationId, OtpSecret, User, UserId};
use diesel::SqliteConnection;
use diesel::prelude::*;
use tracing::debug;

use crate::data_models::UserCredentials;
use crate::diesel_schema::{organizations, users};
use crate::error::PersistenceError;

/// Diesel Queryable struct for user rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = users)]
struct UserRow {
    user_id: i64,
    login_name: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    middle_name: Option<String>,
    email: Option<String>,
    position: Option<String>,
    organization_id: Option<i64>,
    is_active: i32,
    is_advanced_access: i32,
    otp_secret: String,
}

impl UserRow {
    fn into_credentials(self) -> Result<UserCredentials, PersistenceError> {
        let otp_secret: OtpSecret = OtpSecret::parse(&self.otp_secret)?;
        Ok(UserCredentials {
            user: User {
                id: UserId::new(self.user_id),
                login_name: self.login_name,
                first_name: self.first_name,
                last_name: self.last_name,
                middle_name: self.middle_name,
                email: self.email,
                position: self.position,
                organization: self.organization_id.map(OrganizationId::new),
                is_active: self.is_active != 0,
                is_advanced_access: self.is_advanced_access != 0,
                otp_secret,
            },
            password_hash: self.password_hash,
        })
    }

    fn into_user(self) -> Result<User, PersistenceError> {
        Ok(self.into_credentials()?.user)
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = organizations)]
struct OrganizationRow {
    organization_id: i64,
    name: String,
    short_name: String,
}

impl OrganizationRow {
    fn into_organization(self) -> Organization {
        Organization {
            id: OrganizationId::new(self.organization_id),
            name: self.name,
            short_name: self.short_name,
        }
    }
}

/// Login names are compared case-insensitively by storing them lowercase.
#[must_use]
pub fn normalize_login(login_name: &str) -> String {
    login_name.trim().to_lowercase()
}

/// Retrieves a user by ID.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is malformed.
pub fn get_user(
    conn: &mut SqliteConnection,
    user_id: UserId,
) -> Result<Option<User>, PersistenceError> {
    debug!(user_id = user_id.value(), "Looking up user");

    users::table
        .filter(users::user_id.eq(user_id.value()))
        .select(UserRow::as_select())
        .first(conn)
        .optional()?
        .map(UserRow::into_user)
        .transpose()
}

/// Retrieves a user and password hash by login name.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is malformed.
pub fn get_credentials_by_login(
    conn: &mut SqliteConnection,
    login_name: &str,
) -> Result<Option<UserCredentials>, PersistenceError> {
    let normalized: String = normalize_login(login_name);
    debug!(login_name = %normalized, "Looking up credentials");

    users::table
        .filter(users::login_name.eq(&normalized))
        .select(UserRow::as_select())
        .first(conn)
        .optional()?
        .map(UserRow::into_credentials)
        .transpose()
}

/// Returns true if a user with this login name exists.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn login_exists(
    conn: &mut SqliteConnection,
    login_name: &str,
) -> Result<bool, PersistenceError> {
    let count: i64 = users::table
        .filter(users::login_name.eq(normalize_login(login_name)))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

/// Lists active users in the actor's organization, excluding the actor.
///
/// Ordered by last name, then first name. Empty when the actor has no
/// organization.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is malformed.
pub fn list_colleagues(
    conn: &mut SqliteConnection,
    actor: &User,
) -> Result<Vec<User>, PersistenceError> {
    let Some(organization) = actor.organization else {
        return Ok(Vec::new());
    };

    let rows: Vec<UserRow> = users::table
        .filter(users::organization_id.eq(organization.value()))
        .filter(users::is_active.eq(1))
        .filter(users::user_id.ne(actor.id.value()))
        .order((users::last_name.asc(), users::first_name.asc()))
        .select(UserRow::as_select())
        .load(conn)?;

    rows.into_iter().map(UserRow::into_user).collect()
}

/// Retrieves an organization by its unique name.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_organization_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Organization>, PersistenceError> {
    let row: Option<OrganizationRow> = organizations::table
        .filter(organizations::name.eq(name))
        .select(OrganizationRow::as_select())
        .first(conn)
        .optional()?;

    Ok(row.map(OrganizationRow::into_organization))
}

/// Retrieves an organization by ID.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_organization(
    conn: &mut SqliteConnection,
    organization_id: OrganizationId,
) -> Result<Option<Organization>, PersistenceError> {
    let row: Option<OrganizationRow> = organizations::table
        .filter(organizations::organization_id.eq(organization_id.value()))
        .select(OrganizationRow::as_select())
        .first(conn)
        .optional()?;

    Ok(row.map(OrganizationRow::into_organization))
}

/// Checks a plain-text password against a stored bcrypt hash.
///
/// # Errors
///
/// Returns an error if the hash is malformed.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, PersistenceError> {
    bcrypt::verify(password, password_hash)
        .map_err(|e| PersistenceError::PasswordHash(format!("Failed to verify password: {e}")))
}
