// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use custody_domain::DomainError;
use thiserror::Error;

/// Errors that can occur during state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A domain rule was violated.
    #[error("Domain violation: {0}")]
    DomainViolation(#[from] DomainError),
    /// The TOTP adapter could not evaluate a code at all.
    #[error("OTP adapter failure: {0}")]
    OtpAdapter(String),
}
