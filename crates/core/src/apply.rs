// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::command::Command;
use crate::error::CoreError;
use crate::state::{OwnershipChange, TransferContext, TransitionResult};
use crate::totp::{OtpCode, TotpVerifier};
use custody_domain::{
    DomainError, NewTransferRequest, TransferDecision, TransferId, TransferRequest, User,
    validate_custody_for_acceptance, validate_transfer_authority, validate_transfer_creation,
};
use time::OffsetDateTime;

/// Runs the checks that precede the one-time code for a state change.
///
/// Callers that gate OTP attempts (for example with a lockout) run this
/// first so the documented error order is preserved.
///
/// # Errors
///
/// Returns `TransferNotFound`, `NotAuthorized` or `AlreadyResolved`, in
/// that order of precedence.
pub fn authorize_transition<'a>(
    context: &'a TransferContext,
    transfer_id: TransferId,
    actor: &User,
) -> Result<&'a TransferRequest, CoreError> {
    let request: Option<&TransferRequest> = context
        .transfer
        .as_ref()
        .filter(|request| request.id() == transfer_id);
    validate_transfer_authority(actor, transfer_id, request).map_err(CoreError::from)
}

/// Applies a command to the loaded context, producing the change to persist.
///
/// # Arguments
///
/// * `context` - The freshly loaded records (immutable)
/// * `command` - The command to apply
/// * `actor` - The acting user, loaded fresh for this call
/// * `verifier` - The TOTP adapter used for step-up codes
/// * `now` - The time of the call; becomes `requested_at` or `accepted_at`
///
/// # Returns
///
/// * `Ok(TransitionResult)` describing the change
/// * `Err(CoreError)` if the command is invalid
///
/// # Errors
///
/// Returns an error if:
/// - Any creation precondition fails (see `validate_transfer_creation`)
/// - Any resolution precondition fails, checked in order: visibility,
///   receiver identity, pending status, one-time code
/// - An acceptance finds the sender no longer holds the asset
/// - The TOTP adapter cannot evaluate the code
pub fn apply(
    context: &TransferContext,
    command: Command,
    actor: &User,
    verifier: &TotpVerifier,
    now: OffsetDateTime,
) -> Result<TransitionResult, CoreError> {
    match command {
        Command::CreateTransfer {
            asset_id,
            receiver_id,
            comment,
        } => {
            validate_transfer_creation(
                actor,
                receiver_id,
                context.receiver.as_ref().filter(|r| r.id == receiver_id),
                asset_id,
                context.asset.as_ref().filter(|a| a.id == asset_id),
                context.sender_has_pending,
            )?;

            let request: NewTransferRequest =
                NewTransferRequest::new(asset_id, actor.id, receiver_id, now, comment)?;
            Ok(TransitionResult::Created(request))
        }
        Command::ResolveTransfer {
            transfer_id,
            decision,
            otp_code,
            comment,
        } => {
            let current: &TransferRequest = authorize_transition(context, transfer_id, actor)?;
            verify_step_up(actor, &otp_code, verifier, now)?;

            let ownership: Option<OwnershipChange> = match decision {
                TransferDecision::Accept => {
                    let asset = context.asset.as_ref().filter(|a| a.id == current.asset());
                    validate_custody_for_acceptance(current, asset)?;
                    Some(OwnershipChange {
                        asset: current.asset(),
                        from: current.sender(),
                        to: current.receiver(),
                    })
                }
                TransferDecision::Reject => None,
            };

            let mut request: TransferRequest = current.clone();
            if comment.is_some() {
                request.annotate(comment)?;
            }
            request.resolve(decision, now)?;

            Ok(TransitionResult::Resolved { request, ownership })
        }
        Command::AnnotateTransfer {
            transfer_id,
            otp_code,
            comment,
        } => {
            let current: &TransferRequest = authorize_transition(context, transfer_id, actor)?;
            verify_step_up(actor, &otp_code, verifier, now)?;

            let mut request: TransferRequest = current.clone();
            request.annotate(comment)?;
            Ok(TransitionResult::Annotated(request))
        }
    }
}

/// Verifies a step-up code against the actor's own secret.
///
/// # Errors
///
/// Returns `DomainError::InvalidOtp` if the code does not match, or an
/// adapter error if it could not be evaluated.
pub fn verify_step_up(
    actor: &User,
    code: &OtpCode,
    verifier: &TotpVerifier,
    at: OffsetDateTime,
) -> Result<(), CoreError> {
    if verifier.verify(&actor.otp_secret, code, at)? {
        Ok(())
    } else {
        Err(CoreError::DomainViolation(DomainError::InvalidOtp))
    }
}
