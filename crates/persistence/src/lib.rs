// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Persistence layer for the custody workflow.
//!
//! This crate stores the identity store, the asset registry, the transfer
//! ledger and login sessions in `SQLite` through Diesel.
//!
//! ## Database Backend
//!
//! - **In-memory** `SQLite` for unit and integration tests; every call to
//!   [`Persistence::new_in_memory`] gets its own shared-cache database.
//! - **File-backed** `SQLite` in WAL mode for deployments.
//!
//! `SQLite` is bundled through `libsqlite3-sys`, so no system library is
//! needed. The schema is applied from the embedded `migrations/`
//! directory when a connection is opened.
//!
//! ## Write Guarantees
//!
//! Ledger writes run inside `IMMEDIATE` transactions and carry their
//! preconditions in the `WHERE` clause:
//!
//! - A resolution only updates a row that is still `pending`.
//! - A custody change only updates an asset the sender still holds.
//! - A new request is refused if the sender already has one pending for
//!   the asset, and a partial unique index backs this up.
//!
//! A failed guard rolls back the whole transaction, so a request is never
//! `accepted` without the owner having moved, and vice versa.
//!
//! ## Testing Philosophy
//!
//! - Tests run against isolated in-memory databases
//! - Time is always passed in explicitly

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

use custody::TransitionResult;
use custody_domain::{
    Asset, AssetId, Organization, OrganizationId, TransferId, TransferRequest, User, UserId,
};
use diesel::SqliteConnection;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;

mod backend;
mod data_models;
mod diesel_schema;
mod error;
mod mutations;
mod queries;
mod timestamps;

#[cfg(test)]
mod tests;

pub use data_models::{
    AssetOrdering, NewAsset, NewUser, SessionData, TransferDirection, UserCredentials,
};
pub use error::PersistenceError;
pub use queries::identity::normalize_login;

/// Atomic counter for generating unique in-memory database names.
///
/// Each call to `new_in_memory()` receives a unique sequential ID.
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Persistence adapter for identities, assets, transfers and sessions.
pub struct Persistence {
    conn: SqliteConnection,
    password_cost: u32,
}

impl Persistence {
    /// Creates a new persistence adapter with an in-memory `SQLite` database.
    ///
    /// Each call receives a unique database instance via atomic counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new_in_memory() -> Result<Self, PersistenceError> {
        let db_id: u64 = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let shared_memory_url: String = format!("file:memdb_test_{db_id}?mode=memory&cache=shared");

        let mut conn: SqliteConnection = backend::sqlite::initialize_database(&shared_memory_url)?;
        backend::sqlite::verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self {
            conn,
            password_cost: bcrypt::DEFAULT_COST,
        })
    }

    /// Creates a new persistence adapter with a file-based `SQLite` database.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the `SQLite` database file
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new_with_file<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path_str: &str = path.as_ref().to_str().ok_or_else(|| {
            PersistenceError::InitializationError("Invalid database path".to_string())
        })?;

        let mut conn: SqliteConnection = backend::sqlite::initialize_database(path_str)?;
        backend::sqlite::enable_wal_mode(&mut conn)?;
        backend::sqlite::verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self {
            conn,
            password_cost: bcrypt::DEFAULT_COST,
        })
    }

    /// Overrides the bcrypt cost used for new password hashes.
    ///
    /// Existing hashes carry their own cost and still verify.
    #[must_use]
    pub const fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    /// Returns the bcrypt cost used for new password hashes.
    #[must_use]
    pub const fn password_cost(&self) -> u32 {
        self.password_cost
    }

    /// Verifies that foreign key enforcement is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if foreign key enforcement is not enabled.
    pub fn verify_foreign_key_enforcement(&mut self) -> Result<(), PersistenceError> {
        backend::sqlite::verify_foreign_key_enforcement(&mut self.conn)
    }

    // ========================================================================
    // Identity Store
    // ========================================================================

    /// Creates an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or already exists.
    pub fn create_organization(
        &mut self,
        name: &str,
        short_name: &str,
    ) -> Result<OrganizationId, PersistenceError> {
        mutations::identity::create_organization(&mut self.conn, name, short_name)
    }

    /// Retrieves an organization by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_organization(
        &mut self,
        organization_id: OrganizationId,
    ) -> Result<Option<Organization>, PersistenceError> {
        queries::identity::get_organization(&mut self.conn, organization_id)
    }

    /// Retrieves an organization by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_organization_by_name(
        &mut self,
        name: &str,
    ) -> Result<Option<Organization>, PersistenceError> {
        queries::identity::get_organization_by_name(&mut self.conn, name)
    }

    /// Creates a user account, hashing the password.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the login name or email is
    /// already taken.
    pub fn create_user(
        &mut self,
        user: &NewUser,
        now: OffsetDateTime,
    ) -> Result<UserId, PersistenceError> {
        mutations::identity::create_user(&mut self.conn, user, self.password_cost, now)
    }

    /// Retrieves a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_user(&mut self, user_id: UserId) -> Result<Option<User>, PersistenceError> {
        queries::identity::get_user(&mut self.conn, user_id)
    }

    /// Retrieves a user and password hash by login name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_credentials_by_login(
        &mut self,
        login_name: &str,
    ) -> Result<Option<UserCredentials>, PersistenceError> {
        queries::identity::get_credentials_by_login(&mut self.conn, login_name)
    }

    /// Returns true if the login name is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn login_exists(&mut self, login_name: &str) -> Result<bool, PersistenceError> {
        queries::identity::login_exists(&mut self.conn, login_name)
    }

    /// Lists active users in the actor's organization, excluding the actor.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_colleagues(&mut self, actor: &User) -> Result<Vec<User>, PersistenceError> {
        queries::identity::list_colleagues(&mut self.conn, actor)
    }

    /// Sets a user's employment flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist.
    pub fn set_user_active(
        &mut self,
        user_id: UserId,
        is_active: bool,
    ) -> Result<(), PersistenceError> {
        mutations::identity::set_user_active(&mut self.conn, user_id, is_active)
    }

    /// Records a successful login.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn record_login(
        &mut self,
        user_id: UserId,
        now: OffsetDateTime,
    ) -> Result<(), PersistenceError> {
        mutations::identity::record_login(&mut self.conn, user_id, now)
    }

    /// Verifies a password against a bcrypt hash.
    ///
    /// # Arguments
    ///
    /// * `password` - The plain-text password
    /// * `password_hash` - The stored hash
    ///
    /// # Errors
    ///
    /// Returns an error if password verification fails.
    pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, PersistenceError> {
        queries::identity::verify_password(password, password_hash)
    }

    // ========================================================================
    // Asset Registry
    // ========================================================================

    /// Registers an asset, optionally with an initial custodian.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the serial or inventory
    /// number is already registered.
    pub fn register_asset(
        &mut self,
        asset: &NewAsset,
        now: OffsetDateTime,
    ) -> Result<AssetId, PersistenceError> {
        mutations::assets::register_asset(&mut self.conn, asset, now)
    }

    /// Marks an asset as decommissioned.
    ///
    /// # Errors
    ///
    /// Returns an error if the asset does not exist.
    pub fn decommission_asset(
        &mut self,
        asset_id: AssetId,
        now: OffsetDateTime,
    ) -> Result<(), PersistenceError> {
        mutations::assets::decommission_asset(&mut self.conn, asset_id, now)
    }

    /// Retrieves an asset by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_asset(&mut self, asset_id: AssetId) -> Result<Option<Asset>, PersistenceError> {
        queries::assets::get_asset(&mut self.conn, asset_id)
    }

    /// Returns true if the serial number is registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn serial_number_exists(&mut self, serial_number: &str) -> Result<bool, PersistenceError> {
        queries::assets::serial_number_exists(&mut self.conn, serial_number)
    }

    /// Lists the non-decommissioned assets a user holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_assets_held_by(&mut self, owner: UserId) -> Result<Vec<Asset>, PersistenceError> {
        queries::assets::list_assets_held_by(&mut self.conn, owner)
    }

    /// Lists the assets a user holds that have no pending request.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_transferable_assets(
        &mut self,
        owner: UserId,
    ) -> Result<Vec<Asset>, PersistenceError> {
        queries::assets::list_transferable_assets(&mut self.conn, owner)
    }

    /// Lists the asset catalog, optionally limited to one holder.
    ///
    /// Every search term must match the serial number exactly, or the
    /// model, type, manufacturer, inventory number or holder login as a
    /// case-insensitive substring.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_assets(
        &mut self,
        holder: Option<UserId>,
        search_terms: &[&str],
        ordering: AssetOrdering,
    ) -> Result<Vec<Asset>, PersistenceError> {
        queries::assets::list_assets(&mut self.conn, holder, search_terms, ordering)
    }

    // ========================================================================
    // Transfer Ledger
    // ========================================================================

    /// Persists the outcome of a workflow transition atomically.
    ///
    /// # Arguments
    ///
    /// * `result` - The transition result to persist
    /// * `now` - The time of the transition
    ///
    /// # Returns
    ///
    /// The stored request as read back after the write.
    ///
    /// # Errors
    ///
    /// Returns `DuplicatePendingRequest`, `SenderNotHolder`,
    /// `TransferNotPending` or `CustodyChanged` if a guard no longer holds;
    /// nothing is written in that case.
    pub fn persist_transition(
        &mut self,
        result: &TransitionResult,
        now: OffsetDateTime,
    ) -> Result<TransferRequest, PersistenceError> {
        mutations::persist_transition(&mut self.conn, result, now)
    }

    /// Retrieves a transfer request by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_transfer(
        &mut self,
        transfer_id: TransferId,
    ) -> Result<Option<TransferRequest>, PersistenceError> {
        queries::transfers::get_transfer(&mut self.conn, transfer_id)
    }

    /// Returns true if `sender` has a pending request for `asset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn has_pending_request(
        &mut self,
        asset: AssetId,
        sender: UserId,
    ) -> Result<bool, PersistenceError> {
        queries::transfers::has_pending_request(&mut self.conn, asset, sender)
    }

    /// Lists a user's incoming or outgoing requests, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_transfers(
        &mut self,
        user: UserId,
        direction: TransferDirection,
        pending_only: bool,
    ) -> Result<Vec<TransferRequest>, PersistenceError> {
        queries::transfers::list_transfers(&mut self.conn, user, direction, pending_only)
    }

    /// Lists the full transfer history of an asset, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_transfers_for_asset(
        &mut self,
        asset: AssetId,
    ) -> Result<Vec<TransferRequest>, PersistenceError> {
        queries::transfers::list_transfers_for_asset(&mut self.conn, asset)
    }

    // ========================================================================
    // Session Management
    // ========================================================================

    /// Creates a new session.
    ///
    /// # Arguments
    ///
    /// * `session_token` - The unique session token
    /// * `user_id` - The user ID
    /// * `now` - The creation time
    /// * `expires_at` - The expiration time
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be created.
    pub fn create_session(
        &mut self,
        session_token: &str,
        user_id: UserId,
        now: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> Result<i64, PersistenceError> {
        mutations::sessions::create_session(&mut self.conn, session_token, user_id, now, expires_at)
    }

    /// Retrieves a session by token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_session_by_token(
        &mut self,
        session_token: &str,
    ) -> Result<Option<SessionData>, PersistenceError> {
        queries::sessions::get_session_by_token(&mut self.conn, session_token)
    }

    /// Updates the last activity timestamp for a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub fn update_session_activity(
        &mut self,
        session_id: i64,
        now: OffsetDateTime,
    ) -> Result<(), PersistenceError> {
        mutations::sessions::update_session_activity(&mut self.conn, session_id, now)
    }

    /// Deletes a session by token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub fn delete_session(&mut self, session_token: &str) -> Result<(), PersistenceError> {
        mutations::sessions::delete_session(&mut self.conn, session_token)
    }

    /// Deletes all sessions that expired at or before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub fn delete_expired_sessions(&mut self, now: OffsetDateTime) -> Result<usize, PersistenceError> {
        mutations::sessions::delete_expired_sessions(&mut self.conn, now)
    }
}
