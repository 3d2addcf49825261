// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

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

mod error;
mod policy;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use error::DomainError;
pub use policy::AccessPolicy;
pub use types::{
    Asset, AssetId, NewTransferRequest, OTP_SECRET_LENGTH, Organization, OrganizationId,
    OtpSecret, TransferDecision, TransferId, TransferRequest, TransferStatus, User, UserId,
};
pub use validation::{
    validate_custody_for_acceptance, validate_required_text, validate_transfer_authority,
    validate_transfer_creation,
};
