// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Transport-independent operations.
//!
//! Every operation takes the acting user explicitly. Write operations
//! follow the same shape: load a fresh snapshot, let the workflow engine
//! decide, persist the decision with guarded writes, then notify.

use custody::{
    Command, CoreError, OtpCode, TotpVerifier, TransferContext, TransitionResult, apply,
    authorize_transition, verify_step_up,
};
use custody_domain::{
    AccessPolicy, Asset, AssetId, DomainError, Organization, TransferId, TransferRequest, User,
    UserId,
};
use custody_persistence::Persistence;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::auth::{AuthenticationService, LoginOutcome, SessionPolicy};
use crate::capabilities::compute_transfer_capabilities;
use crate::error::{ApiError, translate_core_error};
use crate::notify::{TracingNotifier, TransferNotifier, notify_requested, notify_resolved};
use crate::otp_limiter::{OtpAttempt, OtpAttemptLimiter, OtpAttemptPolicy};
use crate::request_response::{
    AnnotateTransferRequest, AssetDetailResponse, AssetResponse, CreateTransferRequest,
    ListAssetsQuery, ListAssetsResponse, ListColleaguesResponse, ListTransfersQuery, ListTransfersResponse,
    LoginRequest, LoginResponse, OtpEnrollmentResponse, ResolveTransferRequest, TransferResponse, UserProfile,
    UserSummary, VerifyOtpRequest, VerifyOtpResponse,
};

/// Issuer shown by authenticator apps next to enrolled accounts.
pub const OTP_ISSUER: &str = "Custody";

/// Long-lived collaborators of the write operations.
pub struct TransferServices {
    /// The one-time code verifier.
    pub verifier: TotpVerifier,
    /// Per-user failed code counter.
    pub otp_limiter: OtpAttemptLimiter,
    /// Receives events after successful writes.
    pub notifier: Arc<dyn TransferNotifier>,
}

impl TransferServices {
    /// Creates the services with the given notifier and lockout policy.
    #[must_use]
    pub fn new(notifier: Arc<dyn TransferNotifier>, otp_policy: OtpAttemptPolicy) -> Self {
        Self {
            verifier: TotpVerifier::new(),
            otp_limiter: OtpAttemptLimiter::new(otp_policy),
            notifier,
        }
    }
}

impl Default for TransferServices {
    fn default() -> Self {
        Self::new(Arc::new(TracingNotifier), OtpAttemptPolicy::default())
    }
}

fn transfer_response(actor: &User, request: &TransferRequest) -> TransferResponse {
    TransferResponse::new(request, compute_transfer_capabilities(actor, request))
}

fn transfer_not_found(transfer_id: TransferId) -> ApiError {
    ApiError::NotFound {
        code: "transfer_not_found",
        message: DomainError::TransferNotFound(transfer_id).to_string(),
    }
}

/// Reserves a one-time code check, or fails with `otp_locked_out`.
fn begin_otp_attempt<'a>(
    services: &'a TransferServices,
    actor: &User,
    now: OffsetDateTime,
) -> Result<OtpAttempt<'a>, ApiError> {
    services
        .otp_limiter
        .begin_attempt(actor.id, now)
        .map_err(|until| {
            warn!(user_id = actor.id.value(), "One-time code attempt while locked out");
            ApiError::otp_locked_out((until - now).whole_seconds())
        })
}

/// Settles a reserved check from the outcome of an engine call.
///
/// Callers run `authorize_transition` before reserving, so any domain
/// violation other than `InvalidOtp` was raised after the code matched.
fn settle_otp_attempt<T>(
    attempt: OtpAttempt<'_>,
    actor: &User,
    outcome: Result<T, CoreError>,
) -> Result<T, ApiError> {
    match &outcome {
        Err(CoreError::DomainViolation(DomainError::InvalidOtp)) => {
            warn!(user_id = actor.id.value(), "One-time code rejected");
            // The failure that trips the lockout is still reported as a bad code.
            attempt.failed();
        }
        Ok(_) | Err(CoreError::DomainViolation(_)) => attempt.passed(),
        // Never evaluated; the reservation is released.
        Err(CoreError::OtpAdapter(_)) => drop(attempt),
    }
    outcome.map_err(translate_core_error)
}

/// Loads the request and its asset for a resolution or annotation.
fn load_resolution_context(
    persistence: &mut Persistence,
    transfer_id: TransferId,
) -> Result<TransferContext, ApiError> {
    let transfer: Option<TransferRequest> = persistence.get_transfer(transfer_id)?;
    let asset: Option<Asset> = match &transfer {
        Some(request) => persistence.get_asset(request.asset())?,
        None => None,
    };
    Ok(TransferContext::for_resolution(transfer, asset))
}

// ========================================================================
// Transfers
// ========================================================================

/// Proposes handing an asset the actor holds to another user.
///
/// # Arguments
///
/// * `persistence` - The persistence layer
/// * `services` - The shared services
/// * `actor` - The acting sender, freshly loaded
/// * `request` - The transfer to create
/// * `now` - The current time
///
/// # Errors
///
/// Returns an error if:
/// - The actor is inactive or names themself as receiver
/// - The receiver or asset does not exist
/// - The asset is decommissioned or not held by the actor
/// - The actor already has a pending request for the asset
/// - Database operations fail
pub fn create_transfer(
    persistence: &mut Persistence,
    services: &TransferServices,
    actor: &User,
    request: CreateTransferRequest,
    now: OffsetDateTime,
) -> Result<TransferResponse, ApiError> {
    let receiver: Option<User> = persistence.get_user(request.receiver_id)?;
    let asset: Option<Asset> = persistence.get_asset(request.asset_id)?;
    let sender_has_pending: bool = persistence.has_pending_request(request.asset_id, actor.id)?;

    let context: TransferContext =
        TransferContext::for_creation(receiver, asset, sender_has_pending);
    let command: Command = Command::CreateTransfer {
        asset_id: request.asset_id,
        receiver_id: request.receiver_id,
        comment: request.comment,
    };

    let result: TransitionResult = apply(&context, command, actor, &services.verifier, now)
        .map_err(translate_core_error)?;
    let stored: TransferRequest = persistence.persist_transition(&result, now)?;

    notify_requested(services.notifier.as_ref(), &stored);
    Ok(transfer_response(actor, &stored))
}

/// Accepts or rejects a pending request as its receiver.
///
/// Checks run in a fixed order and the first failure wins: visibility,
/// receiver identity, pending status, lockout, one-time code. An
/// acceptance also requires the sender to still hold the asset. On
/// acceptance custody moves in the same transaction as the status change.
///
/// # Errors
///
/// Returns `NotFound`, `Unauthorized`, `InvalidState` or
/// `AuthFactorFailed` for the corresponding failed check, or an
/// infrastructure error.
pub fn resolve_transfer(
    persistence: &mut Persistence,
    services: &TransferServices,
    actor: &User,
    transfer_id: TransferId,
    request: ResolveTransferRequest,
    now: OffsetDateTime,
) -> Result<TransferResponse, ApiError> {
    let context: TransferContext = load_resolution_context(persistence, transfer_id)?;
    authorize_transition(&context, transfer_id, actor).map_err(translate_core_error)?;
    let attempt: OtpAttempt<'_> = begin_otp_attempt(services, actor, now)?;

    let command: Command = Command::ResolveTransfer {
        transfer_id,
        decision: request.decision,
        otp_code: OtpCode::new(request.otp_code),
        comment: request.comment,
    };
    let result: TransitionResult = settle_otp_attempt(
        attempt,
        actor,
        apply(&context, command, actor, &services.verifier, now),
    )?;
    let stored: TransferRequest = persistence.persist_transition(&result, now)?;

    info!(
        transfer_id = stored.id().value(),
        user_id = actor.id.value(),
        status = stored.status().as_str(),
        "Transfer resolved by receiver"
    );
    notify_resolved(services.notifier.as_ref(), &stored);
    Ok(transfer_response(actor, &stored))
}

/// Replaces the comment of a pending request as its receiver.
///
/// Same ordered checks as [`resolve_transfer`]; only the comment changes.
///
/// # Errors
///
/// Returns an error if any check fails or the write fails.
pub fn annotate_transfer(
    persistence: &mut Persistence,
    services: &TransferServices,
    actor: &User,
    transfer_id: TransferId,
    request: AnnotateTransferRequest,
    now: OffsetDateTime,
) -> Result<TransferResponse, ApiError> {
    let context: TransferContext = load_resolution_context(persistence, transfer_id)?;
    authorize_transition(&context, transfer_id, actor).map_err(translate_core_error)?;
    let attempt: OtpAttempt<'_> = begin_otp_attempt(services, actor, now)?;

    let command: Command = Command::AnnotateTransfer {
        transfer_id,
        otp_code: OtpCode::new(request.otp_code),
        comment: request.comment,
    };
    let result: TransitionResult = settle_otp_attempt(
        attempt,
        actor,
        apply(&context, command, actor, &services.verifier, now),
    )?;
    let stored: TransferRequest = persistence.persist_transition(&result, now)?;

    Ok(transfer_response(actor, &stored))
}

/// Fetches one request, visible only to its sender and receiver.
///
/// # Errors
///
/// Returns `NotFound` if the request does not exist or the actor is not a
/// party to it.
pub fn get_transfer(
    persistence: &mut Persistence,
    actor: &User,
    transfer_id: TransferId,
) -> Result<TransferResponse, ApiError> {
    let request: TransferRequest = persistence
        .get_transfer(transfer_id)?
        .filter(|r| AccessPolicy::can_view_transfer(actor, r))
        .ok_or_else(|| transfer_not_found(transfer_id))?;

    Ok(transfer_response(actor, &request))
}

/// Lists the actor's incoming or outgoing requests, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_transfers(
    persistence: &mut Persistence,
    actor: &User,
    query: ListTransfersQuery,
) -> Result<ListTransfersResponse, ApiError> {
    let transfers: Vec<TransferResponse> = persistence
        .list_transfers(actor.id, query.direction, query.pending_only)?
        .iter()
        .map(|request| transfer_response(actor, request))
        .collect();

    Ok(ListTransfersResponse { transfers })
}

// ========================================================================
// Assets
// ========================================================================

/// Lists the asset catalog.
///
/// Users with advanced access see every asset; everyone else sees only the
/// assets they hold. Decommissioned assets are included.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_assets(
    persistence: &mut Persistence,
    actor: &User,
    query: &ListAssetsQuery,
) -> Result<ListAssetsResponse, ApiError> {
    let holder: Option<UserId> = if actor.is_advanced_access {
        None
    } else {
        Some(actor.id)
    };

    let assets: Vec<AssetResponse> = persistence
        .list_assets(holder, &query.search_terms(), query.ordering)?
        .iter()
        .map(AssetResponse::from)
        .collect();

    Ok(ListAssetsResponse { assets })
}

/// Lists the assets the actor currently holds.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_my_assets(
    persistence: &mut Persistence,
    actor: &User,
) -> Result<ListAssetsResponse, ApiError> {
    let assets: Vec<AssetResponse> = persistence
        .list_assets_held_by(actor.id)?
        .iter()
        .map(AssetResponse::from)
        .collect();

    Ok(ListAssetsResponse { assets })
}

/// Lists the assets the actor could propose to hand over right now.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_transferable_assets(
    persistence: &mut Persistence,
    actor: &User,
) -> Result<ListAssetsResponse, ApiError> {
    let assets: Vec<AssetResponse> = persistence
        .list_transferable_assets(actor.id)?
        .iter()
        .map(AssetResponse::from)
        .collect();

    Ok(ListAssetsResponse { assets })
}

/// Fetches an asset with its transfer history.
///
/// Visible to the current custodian, to users with advanced access, and
/// to anyone who appears in the history.
///
/// # Errors
///
/// Returns `NotFound` if the asset does not exist or is not visible.
pub fn get_asset(
    persistence: &mut Persistence,
    actor: &User,
    asset_id: AssetId,
) -> Result<AssetDetailResponse, ApiError> {
    let not_found = || ApiError::NotFound {
        code: "asset_not_found",
        message: DomainError::AssetNotFound(asset_id).to_string(),
    };

    let asset: Asset = persistence.get_asset(asset_id)?.ok_or_else(not_found)?;
    let history: Vec<TransferRequest> = persistence.list_transfers_for_asset(asset_id)?;

    if !AccessPolicy::can_view_asset(actor, &asset, &history) {
        return Err(not_found());
    }

    Ok(AssetDetailResponse {
        asset: AssetResponse::from(&asset),
        history: history
            .iter()
            .map(|request| transfer_response(actor, request))
            .collect(),
    })
}

// ========================================================================
// Users & Sessions
// ========================================================================

/// Lists active colleagues in the actor's organization.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_colleagues(
    persistence: &mut Persistence,
    actor: &User,
) -> Result<ListColleaguesResponse, ApiError> {
    let users: Vec<UserSummary> = persistence
        .list_colleagues(actor)?
        .iter()
        .map(UserSummary::from)
        .collect();

    Ok(ListColleaguesResponse { users })
}

/// Returns the actor's own authenticator enrollment data.
///
/// The account label is the actor's email, or the login name when no
/// email is on file. The secret is never shown for anyone else.
///
/// # Errors
///
/// Returns an infrastructure error if the stored secret cannot be encoded.
pub fn otp_enrollment(
    services: &TransferServices,
    actor: &User,
) -> Result<OtpEnrollmentResponse, ApiError> {
    let account: &str = actor.email.as_deref().unwrap_or(&actor.login_name);
    let otpauth_uri: String = services
        .verifier
        .provisioning_uri(&actor.otp_secret, OTP_ISSUER, account)
        .map_err(translate_core_error)?;

    info!(user_id = actor.id.value(), "One-time code enrollment data issued");
    Ok(OtpEnrollmentResponse {
        secret: actor.otp_secret.expose().to_string(),
        otpauth_uri,
    })
}

/// Checks a one-time code against the actor's secret without changing
/// any state. Counts towards the lockout like any other check.
///
/// # Errors
///
/// Returns `AuthFactorFailed` if the code is wrong or the actor is locked
/// out.
pub fn verify_otp(
    services: &TransferServices,
    actor: &User,
    request: VerifyOtpRequest,
    now: OffsetDateTime,
) -> Result<VerifyOtpResponse, ApiError> {
    let attempt: OtpAttempt<'_> = begin_otp_attempt(services, actor, now)?;

    let code: OtpCode = OtpCode::new(request.otp_code);
    settle_otp_attempt(
        attempt,
        actor,
        verify_step_up(actor, &code, &services.verifier, now),
    )?;

    Ok(VerifyOtpResponse { verified: true })
}

/// Logs in and creates a session.
///
/// # Errors
///
/// Returns `AuthenticationFailed` for bad credentials or a disabled
/// account.
pub fn login(
    persistence: &mut Persistence,
    request: &LoginRequest,
    policy: &SessionPolicy,
    now: OffsetDateTime,
) -> Result<LoginResponse, ApiError> {
    let outcome: LoginOutcome = AuthenticationService::login(
        persistence,
        &request.login_name,
        &request.password,
        policy,
        now,
    )?;

    let user: UserProfile = profile_of(persistence, &outcome.user)?;
    Ok(LoginResponse {
        session_token: outcome.session_token,
        expires_at: outcome.expires_at,
        user,
    })
}

/// Logs out by deleting the session.
///
/// # Errors
///
/// Returns an error if the logout fails.
pub fn logout(persistence: &mut Persistence, session_token: &str) -> Result<(), ApiError> {
    AuthenticationService::logout(persistence, session_token)?;
    Ok(())
}

/// Resolves a bearer token to the current user record.
///
/// # Errors
///
/// Returns `AuthenticationFailed` if the session is unknown or expired.
pub fn authenticate(
    persistence: &mut Persistence,
    session_token: &str,
    now: OffsetDateTime,
) -> Result<User, ApiError> {
    let (_session, user) = AuthenticationService::validate_session(persistence, session_token, now)?;
    Ok(user)
}

/// Returns the actor's own profile.
///
/// # Errors
///
/// Returns an error if the organization lookup fails.
pub fn whoami(persistence: &mut Persistence, actor: &User) -> Result<UserProfile, ApiError> {
    profile_of(persistence, actor)
}

fn profile_of(persistence: &mut Persistence, user: &User) -> Result<UserProfile, ApiError> {
    let organization: Option<Organization> = match user.organization {
        Some(id) => persistence.get_organization(id)?,
        None => None,
    };
    Ok(UserProfile::new(user, organization))
}

/// Looks up a user's ID by login name, for provisioning.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find_user_id(
    persistence: &mut Persistence,
    login_name: &str,
) -> Result<Option<UserId>, ApiError> {
    Ok(persistence
        .get_credentials_by_login(login_name)?
        .map(|credentials| credentials.user.id))
}
