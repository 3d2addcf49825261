// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use custody_domain::{Asset, AssetId, NewTransferRequest, TransferRequest, User, UserId};

/// The records a command is evaluated against.
///
/// The caller loads these fresh for every command, inside the same
/// serialization scope that will persist the result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferContext {
    /// The intended receiver (creation only).
    pub receiver: Option<User>,
    /// The asset named by the command or by the loaded request.
    pub asset: Option<Asset>,
    /// The request being resolved or annotated.
    pub transfer: Option<TransferRequest>,
    /// Whether the actor already has a pending request for `asset`.
    pub sender_has_pending: bool,
}

impl TransferContext {
    /// Builds the context for a `CreateTransfer` command.
    #[must_use]
    pub const fn for_creation(
        receiver: Option<User>,
        asset: Option<Asset>,
        sender_has_pending: bool,
    ) -> Self {
        Self {
            receiver,
            asset,
            transfer: None,
            sender_has_pending,
        }
    }

    /// Builds the context for `ResolveTransfer` and `AnnotateTransfer`.
    #[must_use]
    pub const fn for_resolution(transfer: Option<TransferRequest>, asset: Option<Asset>) -> Self {
        Self {
            receiver: None,
            asset,
            transfer,
            sender_has_pending: false,
        }
    }
}

/// Custody moving from one user to another as part of an acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipChange {
    pub asset: AssetId,
    /// The sender, who must still hold the asset when this is applied.
    pub from: UserId,
    pub to: UserId,
}

/// The result of a successful state transition.
///
/// Transitions are pure: nothing has been written when this is returned.
/// The caller persists the whole result atomically or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// A new pending request to insert.
    Created(NewTransferRequest),
    /// A request moved to a terminal status.
    Resolved {
        /// The request in its new state.
        request: TransferRequest,
        /// Present only for acceptances.
        ownership: Option<OwnershipChange>,
    },
    /// A pending request whose comment changed.
    Annotated(TransferRequest),
}
