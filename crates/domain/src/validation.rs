// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use crate::policy::AccessPolicy;
use crate::types::{Asset, AssetId, TransferId, TransferRequest, User, UserId};

/// Validates the preconditions for creating a transfer request.
///
/// Checks run in a fixed order and the first failure wins, so callers can
/// rely on the returned error to tell the cases apart.
///
/// # Arguments
///
/// * `actor` - The prospective sender
/// * `receiver_id` - The requested receiver
/// * `receiver` - The receiver record, if it exists
/// * `asset_id` - The requested asset
/// * `asset` - The asset record, if it exists
/// * `sender_has_pending` - Whether `actor` already has a pending request for the asset
///
/// # Errors
///
/// Returns, in order of precedence:
/// - `ActorInactive` if the actor is deactivated
/// - `SelfTransferNotAllowed` if the receiver is the actor
/// - `ReceiverNotFound` if the receiver does not exist
/// - `AssetNotFound` if the asset does not exist
/// - `AssetDecommissioned` if the asset is retired
/// - `NotOwner` if the actor does not hold the asset
/// - `DuplicatePendingRequest` if a pending request already exists
pub fn validate_transfer_creation(
    actor: &User,
    receiver_id: UserId,
    receiver: Option<&User>,
    asset_id: AssetId,
    asset: Option<&Asset>,
    sender_has_pending: bool,
) -> Result<(), DomainError> {
    if !AccessPolicy::is_active(actor) {
        return Err(DomainError::ActorInactive(actor.id));
    }

    if receiver_id == actor.id {
        return Err(DomainError::SelfTransferNotAllowed);
    }

    if receiver.is_none() {
        return Err(DomainError::ReceiverNotFound(receiver_id));
    }

    let Some(asset) = asset else {
        return Err(DomainError::AssetNotFound(asset_id));
    };

    if asset.decommissioned {
        return Err(DomainError::AssetDecommissioned(asset.id));
    }

    if !asset.is_owned_by(actor.id) {
        return Err(DomainError::NotOwner {
            asset: asset.id,
            actor: actor.id,
        });
    }

    if sender_has_pending {
        return Err(DomainError::DuplicatePendingRequest {
            asset: asset.id,
            sender: actor.id,
        });
    }

    Ok(())
}

/// Validates that `actor` may change the state of a transfer request.
///
/// This covers every check that precedes the one-time code: visibility,
/// receiver identity and pending status. It is shared by resolution and
/// by comment-only updates.
///
/// # Errors
///
/// Returns, in order of precedence:
/// - `TransferNotFound` if the request is absent or the actor is not a party to it
/// - `NotAuthorized` if the actor is not the receiver
/// - `AlreadyResolved` if the request is not pending
pub fn validate_transfer_authority<'a>(
    actor: &User,
    transfer_id: TransferId,
    request: Option<&'a TransferRequest>,
) -> Result<&'a TransferRequest, DomainError> {
    let request: &TransferRequest = match request {
        Some(request) if AccessPolicy::can_view_transfer(actor, request) => request,
        _ => return Err(DomainError::TransferNotFound(transfer_id)),
    };

    if !AccessPolicy::can_modify(actor, request) {
        return Err(DomainError::NotAuthorized {
            transfer: request.id(),
            actor: actor.id,
        });
    }

    if request.status().is_terminal() {
        return Err(DomainError::AlreadyResolved {
            transfer: request.id(),
            status: request.status(),
        });
    }

    Ok(request)
}

/// Re-checks custody just before an acceptance moves ownership.
///
/// The asset may have changed hands or been retired while the request was
/// pending.
///
/// # Errors
///
/// - `AssetNotFound` if the asset row is gone
/// - `AssetDecommissioned` if the asset has been retired
/// - `SenderNoLongerOwner` if the sender no longer holds the asset
pub fn validate_custody_for_acceptance(
    request: &TransferRequest,
    asset: Option<&Asset>,
) -> Result<(), DomainError> {
    let Some(asset) = asset else {
        return Err(DomainError::AssetNotFound(request.asset()));
    };

    if asset.decommissioned {
        return Err(DomainError::AssetDecommissioned(asset.id));
    }

    if !asset.is_owned_by(request.sender()) {
        return Err(DomainError::SenderNoLongerOwner {
            transfer: request.id(),
            asset: asset.id,
        });
    }

    Ok(())
}

/// Validates that a required text field is present, returning it trimmed.
///
/// # Errors
///
/// Returns `DomainError::InvalidField` if the value is empty after trimming.
pub fn validate_required_text(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed: &str = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidField {
            field,
            reason: String::from("cannot be empty"),
        });
    }
    Ok(trimmed.to_string())
}
