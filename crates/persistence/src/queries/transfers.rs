// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Transfer ledger queries.

use custody_domain::{AssetId, TransferId, TransferRequest, TransferStatus, UserId};
use diesel::SqliteConnection;
use diesel::prelude::*;
use std::str::FromStr;
use tracing::debug;

use crate::data_models::TransferDirection;
use crate::diesel_schema::transfer_requests;
use crate::error::PersistenceError;
use crate::timestamps::{from_stored, from_stored_opt};

/// Diesel Queryable struct for transfer request rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = transfer_requests)]
struct TransferRow {
    transfer_id: i64,
    asset_id: i64,
    sender_id: i64,
    receiver_id: i64,
    status: String,
    requested_at: String,
    accepted_at: Option<String>,
    comment: Option<String>,
}

impl TransferRow {
    fn into_request(self) -> Result<TransferRequest, PersistenceError> {
        TransferRequest::restore(
            TransferId::new(self.transfer_id),
            AssetId::new(self.asset_id),
            UserId::new(self.sender_id),
            UserId::new(self.receiver_id),
            TransferStatus::from_str(&self.status)?,
            from_stored(&self.requested_at)?,
            from_stored_opt(self.accepted_at.as_deref())?,
            self.comment,
        )
        .map_err(PersistenceError::from)
    }
}

/// Retrieves a transfer request by ID.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is malformed.
pub fn get_transfer(
    conn: &mut SqliteConnection,
    transfer_id: TransferId,
) -> Result<Option<TransferRequest>, PersistenceError> {
    debug!(transfer_id = transfer_id.value(), "Looking up transfer request");

    transfer_requests::table
        .filter(transfer_requests::transfer_id.eq(transfer_id.value()))
        .select(TransferRow::as_select())
        .first(conn)
        .optional()?
        .map(TransferRow::into_request)
        .transpose()
}

/// Returns true if `sender` has a pending request for `asset`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn has_pending_request(
    conn: &mut SqliteConnection,
    asset: AssetId,
    sender: UserId,
) -> Result<bool, PersistenceError> {
    let count: i64 = transfer_requests::table
        .filter(transfer_requests::asset_id.eq(asset.value()))
        .filter(transfer_requests::sender_id.eq(sender.value()))
        .filter(transfer_requests::status.eq(TransferStatus::Pending.as_str()))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

/// Lists requests where `user` is the receiver (incoming) or the sender
/// (outgoing), newest first.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `user` - The listing user
/// * `direction` - Which side of the request `user` is on
/// * `pending_only` - Restrict to `Pending` requests
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is malformed.
pub fn list_transfers(
    conn: &mut SqliteConnection,
    user: UserId,
    direction: TransferDirection,
    pending_only: bool,
) -> Result<Vec<TransferRequest>, PersistenceError> {
    let mut query = transfer_requests::table
        .select(TransferRow::as_select())
        .into_boxed();

    query = match direction {
        TransferDirection::Incoming => {
            query.filter(transfer_requests::receiver_id.eq(user.value()))
        }
        TransferDirection::Outgoing => query.filter(transfer_requests::sender_id.eq(user.value())),
    };

    if pending_only {
        query = query.filter(transfer_requests::status.eq(TransferStatus::Pending.as_str()));
    }

    let rows: Vec<TransferRow> = query
        .order((
            transfer_requests::requested_at.desc(),
            transfer_requests::transfer_id.desc(),
        ))
        .load(conn)?;

    rows.into_iter().map(TransferRow::into_request).collect()
}

/// Lists every request that names `asset`, newest first.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is malformed.
pub fn list_transfers_for_asset(
    conn: &mut SqliteConnection,
    asset: AssetId,
) -> Result<Vec<TransferRequest>, PersistenceError> {
    let rows: Vec<TransferRow> = transfer_requests::table
        .filter(transfer_requests::asset_id.eq(asset.value()))
        .order((
            transfer_requests::requested_at.desc(),
            transfer_requests::transfer_id.desc(),
        ))
        .select(TransferRow::as_select())
        .load(conn)?;

    rows.into_iter().map(TransferRow::into_request).collect()
}
