// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Notification port.
//!
//! Notifiers are called after the ledger write has committed. A failing
//! notifier is logged and otherwise ignored; it never changes the outcome
//! of the operation that triggered it.

use custody_domain::TransferRequest;
use thiserror::Error;
use tracing::{info, warn};

/// A notifier could not deliver an event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

/// Receives transfer lifecycle events.
pub trait TransferNotifier: Send + Sync {
    /// A new pending request was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be delivered.
    fn transfer_requested(&self, request: &TransferRequest) -> Result<(), NotifyError>;

    /// A request was accepted or rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be delivered.
    fn transfer_resolved(&self, request: &TransferRequest) -> Result<(), NotifyError>;
}

/// Writes transfer events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl TransferNotifier for TracingNotifier {
    fn transfer_requested(&self, request: &TransferRequest) -> Result<(), NotifyError> {
        info!(
            transfer_id = request.id().value(),
            asset_id = request.asset().value(),
            sender_id = request.sender().value(),
            receiver_id = request.receiver().value(),
            "Transfer requested"
        );
        Ok(())
    }

    fn transfer_resolved(&self, request: &TransferRequest) -> Result<(), NotifyError> {
        info!(
            transfer_id = request.id().value(),
            asset_id = request.asset().value(),
            status = request.status().as_str(),
            "Transfer resolved"
        );
        Ok(())
    }
}

pub(crate) fn notify_requested(notifier: &dyn TransferNotifier, request: &TransferRequest) {
    if let Err(e) = notifier.transfer_requested(request) {
        warn!(transfer_id = request.id().value(), error = %e, "Dropping request notification");
    }
}

pub(crate) fn notify_resolved(notifier: &dyn TransferNotifier, request: &TransferRequest) {
    if let Err(e) = notifier.transfer_resolved(request) {
        warn!(transfer_id = request.id().value(), error = %e, "Dropping resolution notification");
    }
}
