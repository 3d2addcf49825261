// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API boundary for the custody transfer workflow.
//!
//! This crate sits between a transport and the workflow engine. It owns
//! authentication, the one-time code lockout, capability computation and
//! the translation of engine and storage errors into stable error codes.
//! It has no knowledge of HTTP.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

mod auth;
mod capabilities;
mod error;
mod handlers;
mod notify;
mod otp_limiter;
mod request_response;

#[cfg(test)]
mod tests;

pub use auth::{AuthenticationService, LoginOutcome, SessionPolicy};
pub use capabilities::compute_transfer_capabilities;
pub use error::{ApiError, AuthError, ErrorKind, translate_core_error, translate_domain_error};
pub use handlers::{
    OTP_ISSUER, TransferServices, annotate_transfer, authenticate, create_transfer, find_user_id,
    get_asset, get_transfer, list_assets, list_colleagues, list_my_assets,
    list_transferable_assets, list_transfers, login, logout, otp_enrollment, resolve_transfer,
    verify_otp, whoami,
};
pub use notify::{NotifyError, TracingNotifier, TransferNotifier};
pub use otp_limiter::{OtpAttempt, OtpAttemptLimiter, OtpAttemptPolicy};
pub use request_response::{
    AnnotateTransferRequest, AssetDetailResponse, AssetResponse, Capability,
    CreateTransferRequest, ListAssetsQuery, ListAssetsResponse, ListColleaguesResponse,
    ListTransfersQuery, ListTransfersResponse, LoginRequest, LoginResponse, OrganizationInfo,
    OtpEnrollmentResponse, ResolveTransferRequest, TransferCapabilities, TransferResponse,
    UserProfile, UserSummary, VerifyOtpRequest, VerifyOtpResponse,
};
