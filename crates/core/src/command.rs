// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::totp::OtpCode;
use custody_domain::{AssetId, TransferDecision, TransferId, UserId};

/// A command represents user intent as data only.
///
/// Commands are the only way to request a transfer state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Propose handing an asset the actor holds to another user.
    CreateTransfer {
        /// The asset to hand over.
        asset_id: AssetId,
        /// The intended new custodian.
        receiver_id: UserId,
        /// Free-form note.
        comment: Option<String>,
    },
    /// Accept or reject a pending request as its receiver.
    ResolveTransfer {
        /// The request to resolve.
        transfer_id: TransferId,
        /// Accept or reject.
        decision: TransferDecision,
        /// Step-up code from the receiver's authenticator.
        otp_code: OtpCode,
        /// Replaces the stored comment when present.
        comment: Option<String>,
    },
    /// Change only the comment of a pending request as its receiver.
    AnnotateTransfer {
        /// The request to annotate.
        transfer_id: TransferId,
        /// Step-up code from the receiver's authenticator.
        otp_code: OtpCode,
        /// The new comment.
        comment: Option<String>,
    },
}
