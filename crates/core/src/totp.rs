// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Time-based one-time password verification (RFC 6238).
//!
//! Codes are six digits over 30-second steps with HMAC-SHA1, and a code is
//! accepted if it matches the current step or either adjacent step.

use crate::error::CoreError;
use custody_domain::OtpSecret;
use time::OffsetDateTime;
use totp_rs::{Algorithm, Secret, TOTP};

/// Number of digits in a code.
pub const OTP_DIGITS: usize = 6;
/// Length of one time step in seconds.
pub const OTP_STEP_SECONDS: u64 = 30;
/// Number of adjacent steps accepted on each side of the current one.
pub const OTP_SKEW_STEPS: u8 = 1;

/// A candidate one-time code as typed by the user.
///
/// `Debug` never shows the digits.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code with spaces removed, or `None` if it cannot be a
    /// well-formed code.
    fn normalized(&self) -> Option<String> {
        let digits: String = self.0.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.len() == OTP_DIGITS && digits.chars().all(|c| c.is_ascii_digit()) {
            Some(digits)
        } else {
            None
        }
    }
}

impl std::fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OtpCode(<redacted>)")
    }
}

/// Verifies and generates codes against per-user secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotpVerifier {
    digits: usize,
    skew: u8,
    step: u64,
}

impl Default for TotpVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TotpVerifier {
    /// Creates a verifier with the standard parameters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            digits: OTP_DIGITS,
            skew: OTP_SKEW_STEPS,
            step: OTP_STEP_SECONDS,
        }
    }

    fn build(
        &self,
        secret: &OtpSecret,
        issuer: Option<&str>,
        account: &str,
    ) -> Result<TOTP, CoreError> {
        let bytes: Vec<u8> = Secret::Encoded(secret.expose().to_string())
            .to_bytes()
            .map_err(|e| CoreError::OtpAdapter(format!("secret decode: {e:?}")))?;

        TOTP::new(
            Algorithm::SHA1,
            self.digits,
            self.skew,
            self.step,
            bytes,
            issuer.map(str::to_string),
            account.to_string(),
        )
        .map_err(|e| CoreError::OtpAdapter(format!("TOTP init: {e}")))
    }

    /// Checks `code` against `secret` at time `at`.
    ///
    /// Malformed codes (wrong length, non-digits) simply fail to verify.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::OtpAdapter` if the secret cannot be decoded or
    /// `at` precedes the Unix epoch.
    pub fn verify(
        &self,
        secret: &OtpSecret,
        code: &OtpCode,
        at: OffsetDateTime,
    ) -> Result<bool, CoreError> {
        let Some(candidate) = code.normalized() else {
            return Ok(false);
        };
        let totp: TOTP = self.build(secret, None, "")?;
        Ok(totp.check(&candidate, unix_seconds(at)?))
    }

    /// Generates the code valid at time `at`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::OtpAdapter` if the secret cannot be decoded or
    /// `at` precedes the Unix epoch.
    pub fn generate(&self, secret: &OtpSecret, at: OffsetDateTime) -> Result<String, CoreError> {
        let totp: TOTP = self.build(secret, None, "")?;
        Ok(totp.generate(unix_seconds(at)?))
    }

    /// Builds the `otpauth://` URI an authenticator app enrolls from.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::OtpAdapter` if the secret cannot be decoded or
    /// `issuer` or `account` contains a colon.
    pub fn provisioning_uri(
        &self,
        secret: &OtpSecret,
        issuer: &str,
        account: &str,
    ) -> Result<String, CoreError> {
        let totp: TOTP = self.build(secret, Some(issuer), account)?;
        Ok(totp.get_url())
    }
}

/// Generates a fresh random secret for a new account.
///
/// # Errors
///
/// Returns `CoreError::OtpAdapter` if the generated secret is unusable.
pub fn generate_secret() -> Result<OtpSecret, CoreError> {
    match Secret::generate_secret().to_encoded() {
        Secret::Encoded(encoded) => OtpSecret::parse(&encoded).map_err(CoreError::from),
        Secret::Raw(_) => Err(CoreError::OtpAdapter(String::from(
            "secret generator returned raw bytes",
        ))),
    }
}

fn unix_seconds(at: OffsetDateTime) -> Result<u64, CoreError> {
    u64::try_from(at.unix_timestamp())
        .map_err(|_| CoreError::OtpAdapter(String::from("timestamp precedes the Unix epoch")))
}
