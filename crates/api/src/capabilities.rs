// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Capability computation for authorization-aware UI gating.
//!
//! Capabilities tell a client which buttons to show. They are advisory
//! only and do not replace the workflow engine's checks.

use custody_domain::{AccessPolicy, TransferRequest, TransferStatus, User};

use crate::request_response::{Capability, TransferCapabilities};

/// Computes what the actor may do with a transfer request right now.
///
/// Both resolving and annotating require the actor to be the receiver
/// and the request to be pending. Neither is affected by the one-time
/// code, which is only checked when the action is attempted.
///
/// # Arguments
///
/// * `actor` - The user viewing the request
/// * `request` - The request being viewed
#[must_use]
pub fn compute_transfer_capabilities(
    actor: &User,
    request: &TransferRequest,
) -> TransferCapabilities {
    let actionable: bool =
        AccessPolicy::can_modify(actor, request) && request.status() == TransferStatus::Pending;

    TransferCapabilities {
        can_resolve: Capability::from_bool(actionable),
        can_annotate: Capability::from_bool(actionable),
    }
}
