// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use custody_domain::{AssetId, DomainError, TransferId, UserId};

/// Errors that can occur during persistence operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// A database error occurred.
    DatabaseError(String),
    /// Database connection failed.
    DatabaseConnectionFailed(String),
    /// Database migration failed.
    MigrationFailed(String),
    /// Query execution failed.
    QueryFailed(String),
    /// Initialization error.
    InitializationError(String),
    /// Foreign key enforcement is not enabled.
    ForeignKeyEnforcementNotEnabled,
    /// The requested resource was not found.
    NotFound(String),
    /// A uniqueness, check or foreign key constraint rejected the write.
    ConstraintViolation(String),
    /// A guarded insert found an existing pending request for the pair.
    DuplicatePendingRequest {
        /// The asset.
        asset: AssetId,
        /// The sender.
        sender: UserId,
    },
    /// A guarded update found the request no longer pending.
    TransferNotPending(TransferId),
    /// A guarded insert found the sender no longer holding the asset.
    SenderNotHolder(AssetId),
    /// A guarded custody write found the asset held by someone else,
    /// decommissioned, or gone.
    CustodyChanged(AssetId),
    /// A value supplied for a write was rejected before reaching the database.
    InvalidInput(String),
    /// A stored row could not be turned back into a domain value.
    CorruptRecord(String),
    /// Password hashing or verification failed.
    PasswordHash(String),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::DatabaseConnectionFailed(msg) => {
                write!(f, "Database connection failed: {msg}")
            }
            Self::MigrationFailed(msg) => write!(f, "Migration failed: {msg}"),
            Self::QueryFailed(msg) => write!(f, "Query failed: {msg}"),
            Self::InitializationError(msg) => write!(f, "Initialization error: {msg}"),
            Self::ForeignKeyEnforcementNotEnabled => {
                write!(f, "Foreign key enforcement is not enabled")
            }
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::ConstraintViolation(msg) => write!(f, "Constraint violation: {msg}"),
            Self::DuplicatePendingRequest { asset, sender } => {
                write!(
                    f,
                    "User {sender} already has a pending transfer request for asset {asset}"
                )
            }
            Self::TransferNotPending(transfer) => {
                write!(f, "Transfer request {transfer} is no longer pending")
            }
            Self::SenderNotHolder(asset) => {
                write!(f, "Sender no longer holds asset {asset}")
            }
            Self::CustodyChanged(asset) => {
                write!(f, "Custody of asset {asset} changed concurrently")
            }
            Self::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Self::CorruptRecord(msg) => write!(f, "Corrupt record: {msg}"),
            Self::PasswordHash(msg) => write!(f, "Password hashing error: {msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<diesel::result::Error> for PersistenceError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::DatabaseErrorKind;

        match err {
            diesel::result::Error::NotFound => Self::NotFound("Record not found".to_string()),
            diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::CheckViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::NotNullViolation,
                info,
            ) => Self::ConstraintViolation(info.message().to_string()),
            _ => Self::DatabaseError(err.to_string()),
        }
    }
}

impl From<diesel::ConnectionError> for PersistenceError {
    fn from(err: diesel::ConnectionError) -> Self {
        Self::DatabaseConnectionFailed(err.to_string())
    }
}

impl From<DomainError> for PersistenceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidField { .. } => Self::InvalidInput(err.to_string()),
            _ => Self::CorruptRecord(err.to_string()),
        }
    }
}

impl From<time::error::Format> for PersistenceError {
    fn from(err: time::error::Format) -> Self {
        Self::CorruptRecord(format!("timestamp format: {err}"))
    }
}

impl From<time::error::Parse> for PersistenceError {
    fn from(err: time::error::Parse) -> Self {
        Self::CorruptRecord(format!("timestamp parse: {err}"))
    }
}
