// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Transfer ledger mutations.
//!
//! Every write here runs inside an `IMMEDIATE` transaction and re-checks,
//! in the `WHERE` clause, the facts the caller validated against its
//! snapshot. A write whose guard no longer matches changes nothing and
//! surfaces as a typed conflict.

use custody::{OwnershipChange, TransitionResult};
use custody_domain::{NewTransferRequest, TransferId, TransferRequest, TransferStatus};
use diesel::SqliteConnection;
use diesel::prelude::*;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::backend::sqlite::get_last_insert_rowid;
use crate::diesel_schema::transfer_requests;
use crate::error::PersistenceError;
use crate::mutations::assets::transfer_custody;
use crate::queries::assets::get_asset;
use crate::queries::transfers::{get_transfer, has_pending_request};
use crate::timestamps::to_stored;

fn reload(
    conn: &mut SqliteConnection,
    transfer_id: TransferId,
) -> Result<TransferRequest, PersistenceError> {
    get_transfer(conn, transfer_id)?.ok_or_else(|| {
        PersistenceError::NotFound(format!("Transfer request {transfer_id} not found"))
    })
}

/// Inserts a new pending request.
///
/// Within the transaction the sender must still hold the (non
/// decommissioned) asset and must not already have a pending request for
/// it.
///
/// # Errors
///
/// Returns `SenderNotHolder` or `DuplicatePendingRequest` if a guard fails,
/// or a database error.
pub fn insert_transfer_request(
    conn: &mut SqliteConnection,
    request: &NewTransferRequest,
) -> Result<TransferRequest, PersistenceError> {
    let requested_at: String = to_stored(request.requested_at())?;

    conn.immediate_transaction(|conn| {
        let still_held: bool = get_asset(conn, request.asset())?
            .is_some_and(|asset| !asset.decommissioned && asset.is_owned_by(request.sender()));
        if !still_held {
            warn!(
                asset_id = request.asset().value(),
                sender_id = request.sender().value(),
                "Asset custody changed before the request was stored"
            );
            return Err(PersistenceError::SenderNotHolder(request.asset()));
        }

        if has_pending_request(conn, request.asset(), request.sender())? {
            return Err(PersistenceError::DuplicatePendingRequest {
                asset: request.asset(),
                sender: request.sender(),
            });
        }

        diesel::insert_into(transfer_requests::table)
            .values((
                transfer_requests::asset_id.eq(request.asset().value()),
                transfer_requests::sender_id.eq(request.sender().value()),
                transfer_requests::receiver_id.eq(request.receiver().value()),
                transfer_requests::status.eq(TransferStatus::Pending.as_str()),
                transfer_requests::requested_at.eq(&requested_at),
                transfer_requests::accepted_at.eq(None::<String>),
                transfer_requests::comment.eq(request.comment()),
            ))
            .execute(conn)?;

        let transfer_id: TransferId = TransferId::new(get_last_insert_rowid(conn)?);
        info!(
            transfer_id = transfer_id.value(),
            asset_id = request.asset().value(),
            sender_id = request.sender().value(),
            receiver_id = request.receiver().value(),
            "Transfer request created"
        );
        reload(conn, transfer_id)
    })
}

/// Stores a resolution and, for an acceptance, the custody change, as
/// one unit.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `request` - The request in its terminal state
/// * `ownership` - The custody change for an acceptance
/// * `now` - The resolution time, recorded on the asset
///
/// # Errors
///
/// Returns `TransferNotPending` if the stored request was resolved in the
/// meantime, `CustodyChanged` if the sender no longer holds the asset.
/// Nothing is written in either case.
pub fn resolve_transfer_request(
    conn: &mut SqliteConnection,
    request: &TransferRequest,
    ownership: Option<&OwnershipChange>,
    now: OffsetDateTime,
) -> Result<TransferRequest, PersistenceError> {
    let accepted_at: Option<String> = request.accepted_at().map(to_stored).transpose()?;

    conn.immediate_transaction(|conn| {
        let rows_affected: usize = diesel::update(transfer_requests::table)
            .filter(transfer_requests::transfer_id.eq(request.id().value()))
            .filter(transfer_requests::status.eq(TransferStatus::Pending.as_str()))
            .filter(transfer_requests::accepted_at.is_null())
            .set((
                transfer_requests::status.eq(request.status().as_str()),
                transfer_requests::accepted_at.eq(accepted_at.as_deref()),
                transfer_requests::comment.eq(request.comment()),
            ))
            .execute(conn)?;

        if rows_affected == 0 {
            debug!(
                transfer_id = request.id().value(),
                "Resolution guard did not match"
            );
            return Err(PersistenceError::TransferNotPending(request.id()));
        }

        if let Some(change) = ownership {
            transfer_custody(conn, change, now)?;
        }

        info!(
            transfer_id = request.id().value(),
            status = request.status().as_str(),
            "Transfer request resolved"
        );
        reload(conn, request.id())
    })
}

/// Stores a new comment on a still-pending request.
///
/// # Errors
///
/// Returns `TransferNotPending` if the stored request is no longer pending.
pub fn annotate_transfer_request(
    conn: &mut SqliteConnection,
    request: &TransferRequest,
) -> Result<TransferRequest, PersistenceError> {
    conn.immediate_transaction(|conn| {
        let rows_affected: usize = diesel::update(transfer_requests::table)
            .filter(transfer_requests::transfer_id.eq(request.id().value()))
            .filter(transfer_requests::status.eq(TransferStatus::Pending.as_str()))
            .set(transfer_requests::comment.eq(request.comment()))
            .execute(conn)?;

        if rows_affected == 0 {
            return Err(PersistenceError::TransferNotPending(request.id()));
        }

        info!(transfer_id = request.id().value(), "Transfer comment updated");
        reload(conn, request.id())
    })
}

/// Persists the outcome of a state transition.
///
/// # Errors
///
/// Returns the error of the underlying guarded write.
pub fn persist_transition(
    conn: &mut SqliteConnection,
    result: &TransitionResult,
    now: OffsetDateTime,
) -> Result<TransferRequest, PersistenceError> {
    match result {
        TransitionResult::Created(request) => insert_transfer_request(conn, request),
        TransitionResult::Resolved { request, ownership } => {
            resolve_transfer_request(conn, request, ownership.as_ref(), now)
        }
        TransitionResult::Annotated(request) => annotate_transfer_request(conn, request),
    }
}
