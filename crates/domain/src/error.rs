// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::types::{AssetId, TransferId, TransferStatus, UserId};

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The acting user is deactivated.
    ActorInactive(UserId),
    /// Sender and receiver are the same user.
    SelfTransferNotAllowed,
    /// The intended receiver does not exist.
    ReceiverNotFound(UserId),
    /// The asset does not exist, or is not visible to the actor.
    AssetNotFound(AssetId),
    /// The asset has been retired and can no longer change hands.
    AssetDecommissioned(AssetId),
    /// The actor is not the current custodian of the asset.
    NotOwner {
        /// The asset.
        asset: AssetId,
        /// The acting user.
        actor: UserId,
    },
    /// The sender already has a pending request for this asset.
    DuplicatePendingRequest {
        /// The asset.
        asset: AssetId,
        /// The sender.
        sender: UserId,
    },
    /// The transfer request does not exist.
    TransferNotFound(TransferId),
    /// The actor is not permitted to act on this request.
    NotAuthorized {
        /// The transfer request.
        transfer: TransferId,
        /// The acting user.
        actor: UserId,
    },
    /// The request has already been accepted or rejected.
    AlreadyResolved {
        /// The transfer request.
        transfer: TransferId,
        /// Its terminal status.
        status: TransferStatus,
    },
    /// Custody moved after the request was created.
    SenderNoLongerOwner {
        /// The transfer request.
        transfer: TransferId,
        /// The asset.
        asset: AssetId,
    },
    /// The supplied one-time code did not verify.
    InvalidOtp,
    /// A status string could not be parsed.
    InvalidTransferStatus(String),
    /// A stored OTP secret is malformed.
    InvalidOtpSecret(String),
    /// A stored transfer request violates its own invariants.
    InconsistentTransferRecord(String),
    /// A required field is missing or malformed.
    InvalidField {
        /// The field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ActorInactive(user) => write!(f, "User {user} is inactive"),
            Self::SelfTransferNotAllowed => {
                write!(f, "Cannot create a transfer request to yourself")
            }
            Self::ReceiverNotFound(user) => write!(f, "Receiver {user} not found"),
            Self::AssetNotFound(asset) => write!(f, "Asset {asset} not found"),
            Self::AssetDecommissioned(asset) => {
                write!(f, "Asset {asset} has been decommissioned")
            }
            Self::NotOwner { asset, actor } => {
                write!(f, "User {actor} is not the current owner of asset {asset}")
            }
            Self::DuplicatePendingRequest { asset, sender } => {
                write!(
                    f,
                    "User {sender} already has a pending transfer request for asset {asset}"
                )
            }
            Self::TransferNotFound(transfer) => {
                write!(f, "Transfer request {transfer} not found")
            }
            Self::NotAuthorized { transfer, actor } => {
                write!(
                    f,
                    "User {actor} is not authorized to act on transfer request {transfer}"
                )
            }
            Self::AlreadyResolved { transfer, status } => {
                write!(f, "Transfer request {transfer} is already {status}")
            }
            Self::SenderNoLongerOwner { transfer, asset } => {
                write!(
                    f,
                    "Sender of transfer request {transfer} no longer owns asset {asset}"
                )
            }
            Self::InvalidOtp => write!(f, "Invalid one-time code"),
            Self::InvalidTransferStatus(value) => {
                write!(f, "Invalid transfer status: {value}")
            }
            Self::InvalidOtpSecret(msg) => write!(f, "Invalid OTP secret: {msg}"),
            Self::InconsistentTransferRecord(msg) => {
                write!(f, "Inconsistent transfer record: {msg}")
            }
            Self::InvalidField { field, reason } => {
                write!(f, "Invalid {field}: {reason}")
            }
        }
    }
}

impl std::error::Error for DomainError {}
