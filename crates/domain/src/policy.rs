// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Access policy predicates.
//!
//! Every predicate is pure and takes the current records as arguments.
//! Callers must pass freshly loaded users; nothing here is cached.

use crate::types::{Asset, TransferRequest, User};

/// Pure authorization predicates for transfers and assets.
pub struct AccessPolicy;

impl AccessPolicy {
    /// True iff the user's employment flag is set.
    #[must_use]
    pub const fn is_active(actor: &User) -> bool {
        actor.is_active
    }

    /// True iff `actor` is the receiver of `request`.
    #[must_use]
    pub fn can_modify(actor: &User, request: &TransferRequest) -> bool {
        request.receiver() == actor.id
    }

    /// True iff `actor` is the sender or the receiver of `request`.
    #[must_use]
    pub fn can_view_transfer(actor: &User, request: &TransferRequest) -> bool {
        request.involves(actor.id)
    }

    /// Decides whether `actor` may read an asset and its transfer history.
    ///
    /// The current custodian and advanced-access users can always read it.
    /// Anyone else needs to appear in the history as sender or receiver.
    #[must_use]
    pub fn can_view_asset(actor: &User, asset: &Asset, history: &[TransferRequest]) -> bool {
        actor.is_advanced_access
            || asset.is_owned_by(actor.id)
            || history.iter().any(|request| request.involves(actor.id))
    }
}
