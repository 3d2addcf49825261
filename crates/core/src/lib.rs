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

mod apply;
mod command;
mod error;
mod state;
mod totp;

#[cfg(test)]
mod tests;

pub use apply::{apply, authorize_transition, verify_step_up};
pub use command::Command;
pub use error::CoreError;
pub use state::{OwnershipChange, TransferContext, TransitionResult};
pub use totp::{
    OTP_DIGITS, OTP_SKEW_STEPS, OTP_STEP_SECONDS, OtpCode, TotpVerifier, generate_secret,
};
