// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Error types for the API layer.

use custody::CoreError;
use custody_domain::DomainError;
use custody_persistence::PersistenceError;
use thiserror::Error;

/// Authentication errors raised at the login and session boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown login name or wrong password. The two are not distinguished.
    #[error("Invalid login name or password")]
    InvalidCredentials,
    /// The account exists but the user is no longer employed.
    #[error("Account is disabled")]
    AccountDisabled,
    /// No session matches the presented token.
    #[error("Invalid session token")]
    InvalidSession,
    /// The session exists but has expired.
    #[error("Session expired")]
    SessionExpired,
    /// The session store failed.
    #[error("Authentication backend failure: {0}")]
    Backend(#[from] PersistenceError),
}

/// The error classes every API failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The resource is absent or not visible to the actor.
    NotFound,
    /// The actor may see the resource but not perform the action.
    Unauthorized,
    /// The resource is in a state that forbids the action.
    InvalidState,
    /// The request violates a business rule.
    ValidationFailed,
    /// The step-up factor was wrong or is locked out.
    AuthFactorFailed,
    /// No valid session or bad login credentials.
    AuthenticationFailed,
    /// Storage or adapter fault.
    Infrastructure,
}

/// API-level errors.
///
/// Every variant carries a stable machine-readable `code` next to the
/// human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A requested resource was not found or is not visible.
    NotFound {
        /// Stable error code.
        code: &'static str,
        /// A human-readable description of what was not found.
        message: String,
    },
    /// The actor is not allowed to perform the action.
    Unauthorized {
        /// Stable error code.
        code: &'static str,
        /// A human-readable description.
        message: String,
    },
    /// The resource's state does not allow the action.
    InvalidState {
        /// Stable error code.
        code: &'static str,
        /// A human-readable description.
        message: String,
    },
    /// A business rule or input check failed.
    ValidationFailed {
        /// Stable error code.
        code: &'static str,
        /// A human-readable description.
        message: String,
    },
    /// The one-time code was rejected or the user is locked out.
    AuthFactorFailed {
        /// Stable error code.
        code: &'static str,
        /// A human-readable description.
        message: String,
    },
    /// Authentication failed.
    AuthenticationFailed {
        /// The reason authentication failed.
        reason: String,
    },
    /// An infrastructure fault occurred.
    Infrastructure {
        /// A description of the fault.
        message: String,
    },
}

impl ApiError {
    /// Returns the error class.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            Self::AuthFactorFailed { .. } => ErrorKind::AuthFactorFailed,
            Self::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
            Self::Infrastructure { .. } => ErrorKind::Infrastructure,
        }
    }

    /// Returns the stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { code, .. }
            | Self::Unauthorized { code, .. }
            | Self::InvalidState { code, .. }
            | Self::ValidationFailed { code, .. }
            | Self::AuthFactorFailed { code, .. } => *code,
            Self::AuthenticationFailed { .. } => "authentication_failed",
            Self::Infrastructure { .. } => "infrastructure",
        }
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound { message, .. }
            | Self::Unauthorized { message, .. }
            | Self::InvalidState { message, .. }
            | Self::ValidationFailed { message, .. }
            | Self::AuthFactorFailed { message, .. }
            | Self::Infrastructure { message } => message,
            Self::AuthenticationFailed { reason } => reason,
        }
    }

    pub(crate) fn otp_locked_out(retry_after_seconds: i64) -> Self {
        Self::AuthFactorFailed {
            code: "otp_locked_out",
            message: format!(
                "Too many failed one-time codes; try again in {retry_after_seconds} seconds"
            ),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { message, .. } => write!(f, "Not found: {message}"),
            Self::Unauthorized { message, .. } => write!(f, "Unauthorized: {message}"),
            Self::InvalidState { message, .. } => write!(f, "Invalid state: {message}"),
            Self::ValidationFailed { message, .. } => write!(f, "Validation failed: {message}"),
            Self::AuthFactorFailed { message, .. } => {
                write!(f, "Second factor failed: {message}")
            }
            Self::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }
            Self::Infrastructure { message } => write!(f, "Internal error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Backend(inner) => Self::Infrastructure {
                message: inner.to_string(),
            },
            AuthError::InvalidCredentials
            | AuthError::AccountDisabled
            | AuthError::InvalidSession
            | AuthError::SessionExpired => Self::AuthenticationFailed {
                reason: err.to_string(),
            },
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::TransferNotPending(_) => Self::InvalidState {
                code: "already_resolved",
                message: err.to_string(),
            },
            PersistenceError::SenderNotHolder(_) => Self::ValidationFailed {
                code: "not_owner",
                message: err.to_string(),
            },
            PersistenceError::CustodyChanged(_) => Self::InvalidState {
                code: "sender_no_longer_owner",
                message: err.to_string(),
            },
            PersistenceError::DuplicatePendingRequest { .. } => Self::InvalidState {
                code: "duplicate_pending_request",
                message: err.to_string(),
            },
            PersistenceError::NotFound(message) => Self::NotFound {
                code: "not_found",
                message,
            },
            PersistenceError::InvalidInput(message) => Self::ValidationFailed {
                code: "invalid_input",
                message,
            },
            _ => Self::Infrastructure {
                message: err.to_string(),
            },
        }
    }
}

/// Translates a domain error into an API error.
///
/// This translation is explicit and ensures domain errors are not leaked directly.
#[must_use]
pub fn translate_domain_error(err: DomainError) -> ApiError {
    let message: String = err.to_string();
    match err {
        DomainError::ActorInactive(_) => ApiError::ValidationFailed {
            code: "actor_inactive",
            message,
        },
        DomainError::SelfTransferNotAllowed => ApiError::ValidationFailed {
            code: "self_transfer_not_allowed",
            message,
        },
        DomainError::ReceiverNotFound(_) => ApiError::NotFound {
            code: "receiver_not_found",
            message,
        },
        DomainError::AssetNotFound(_) => ApiError::NotFound {
            code: "asset_not_found",
            message,
        },
        DomainError::AssetDecommissioned(_) => ApiError::ValidationFailed {
            code: "asset_decommissioned",
            message,
        },
        DomainError::NotOwner { .. } => ApiError::ValidationFailed {
            code: "not_owner",
            message,
        },
        DomainError::DuplicatePendingRequest { .. } => ApiError::InvalidState {
            code: "duplicate_pending_request",
            message,
        },
        DomainError::TransferNotFound(_) => ApiError::NotFound {
            code: "transfer_not_found",
            message,
        },
        DomainError::NotAuthorized { .. } => ApiError::Unauthorized {
            code: "not_authorized",
            message,
        },
        DomainError::AlreadyResolved { .. } => ApiError::InvalidState {
            code: "already_resolved",
            message,
        },
        DomainError::SenderNoLongerOwner { .. } => ApiError::InvalidState {
            code: "sender_no_longer_owner",
            message,
        },
        DomainError::InvalidOtp => ApiError::AuthFactorFailed {
            code: "invalid_otp",
            message,
        },
        DomainError::InvalidTransferStatus(_)
        | DomainError::InvalidOtpSecret(_)
        | DomainError::InvalidField { .. } => ApiError::ValidationFailed {
            code: "invalid_input",
            message,
        },
        DomainError::InconsistentTransferRecord(_) => ApiError::Infrastructure { message },
    }
}

/// Translates a core error into an API error.
///
/// This translation is explicit and ensures core errors are not leaked directly.
#[must_use]
pub fn translate_core_error(err: CoreError) -> ApiError {
    match err {
        CoreError::DomainViolation(domain_err) => translate_domain_error(domain_err),
        CoreError::OtpAdapter(msg) => ApiError::Infrastructure {
            message: format!("One-time code check failed: {msg}"),
        },
    }
}
