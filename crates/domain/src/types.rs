// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;

/// Declares an opaque, copyable database identifier.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database identifier.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw database identifier.
            #[must_use]
            pub const fn value(self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifies a user account.
    UserId
);
entity_id!(
    /// Identifies a physical asset.
    AssetId
);
entity_id!(
    /// Identifies a transfer request.
    TransferId
);
entity_id!(
    /// Identifies an organization.
    OrganizationId
);

/// Number of base32 characters in a provisioned OTP secret (160 bits).
pub const OTP_SECRET_LENGTH: usize = 32;

/// A per-user TOTP shared secret, stored as RFC 4648 base32 without padding.
///
/// The value is never printed by `Debug` and is deliberately not `Serialize`.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpSecret(String);

impl OtpSecret {
    /// Parses a base32 secret.
    ///
    /// Lowercase input is accepted and normalized to uppercase. Trailing `=`
    /// padding is stripped.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOtpSecret` if the value is not exactly
    /// [`OTP_SECRET_LENGTH`] characters from the base32 alphabet.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let normalized: String = value.trim().trim_end_matches('=').to_ascii_uppercase();

        if normalized.len() != OTP_SECRET_LENGTH {
            return Err(DomainError::InvalidOtpSecret(format!(
                "expected {OTP_SECRET_LENGTH} base32 characters, found {}",
                normalized.len()
            )));
        }

        if !normalized
            .chars()
            .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c))
        {
            return Err(DomainError::InvalidOtpSecret(String::from(
                "secret contains characters outside the base32 alphabet",
            )));
        }

        Ok(Self(normalized))
    }

    /// Returns the base32 text of the secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for OtpSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OtpSecret(<redacted>)")
    }
}

/// An organization users and assets may belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub short_name: String,
}

/// A person who may hold custody of assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Unique, case-insensitive login.
    pub login_name: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub organization: Option<OrganizationId>,
    /// Employment status. Inactive users may not initiate transfers.
    pub is_active: bool,
    /// Advanced-access users may read the history of any asset.
    pub is_advanced_access: bool,
    pub otp_secret: OtpSecret,
}

impl User {
    /// Renders the display name as "last first middle".
    #[must_use]
    pub fn full_name(&self) -> String {
        let mut parts: Vec<&str> = vec![self.last_name.as_str(), self.first_name.as_str()];
        if let Some(middle) = self.middle_name.as_deref()
            && !middle.is_empty()
        {
            parts.push(middle);
        }
        parts.join(" ")
    }
}

/// A tracked physical asset.
///
/// `current_owner` has no public setter. The only path that changes it is
/// the acceptance of a transfer request, which the persistence layer performs
/// inside the same transaction that resolves the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub id: AssetId,
    /// Unique manufacturer serial number.
    pub serial_number: String,
    pub inventory_number: Option<String>,
    pub model: String,
    pub asset_type: Option<String>,
    pub manufacturer: Option<String>,
    pub supplier: Option<String>,
    pub organization: Option<OrganizationId>,
    current_owner: Option<UserId>,
    pub decommissioned: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Asset {
    /// Creates an asset snapshot with no optional catalogue fields.
    ///
    /// # Arguments
    ///
    /// * `id` - The asset identifier
    /// * `serial_number` - The unique serial number
    /// * `model` - The model name
    /// * `current_owner` - The current custodian, if any
    /// * `decommissioned` - Whether the asset has been retired
    /// * `created_at` - Registration time, also used as the initial update time
    #[must_use]
    pub const fn new(
        id: AssetId,
        serial_number: String,
        model: String,
        current_owner: Option<UserId>,
        decommissioned: bool,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            serial_number,
            inventory_number: None,
            model,
            asset_type: None,
            manufacturer: None,
            supplier: None,
            organization: None,
            current_owner,
            decommissioned,
            created_at,
            updated_at: created_at,
        }
    }

    /// Returns the current custodian.
    #[must_use]
    pub const fn current_owner(&self) -> Option<UserId> {
        self.current_owner
    }

    /// Returns true if `user` currently holds this asset.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.current_owner == Some(user)
    }
}

/// The lifecycle state of a transfer request.
///
/// The only legal transitions are `Pending -> Accepted` and
/// `Pending -> Rejected`. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Accepted,
    Rejected,
}

impl TransferStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if moving from `self` to `target` is legal.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Accepted | Self::Rejected)
        )
    }
}

impl FromStr for TransferStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(DomainError::InvalidTransferStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The receiver's answer to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferDecision {
    #[serde(rename = "accepted")]
    Accept,
    #[serde(rename = "rejected")]
    Reject,
}

impl TransferDecision {
    /// Returns the terminal status this decision produces.
    #[must_use]
    pub const fn status(self) -> TransferStatus {
        match self {
            Self::Accept => TransferStatus::Accepted,
            Self::Reject => TransferStatus::Rejected,
        }
    }
}

impl FromStr for TransferDecision {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" | "accept" => Ok(Self::Accept),
            "rejected" | "reject" => Ok(Self::Reject),
            other => Err(DomainError::InvalidTransferStatus(other.to_string())),
        }
    }
}

/// A request to create a transfer, always born `Pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransferRequest {
    asset: AssetId,
    sender: UserId,
    receiver: UserId,
    requested_at: OffsetDateTime,
    comment: Option<String>,
}

impl NewTransferRequest {
    /// Builds a new pending request.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SelfTransferNotAllowed` if sender and receiver
    /// are the same user.
    pub fn new(
        asset: AssetId,
        sender: UserId,
        receiver: UserId,
        requested_at: OffsetDateTime,
        comment: Option<String>,
    ) -> Result<Self, DomainError> {
        if sender == receiver {
            return Err(DomainError::SelfTransferNotAllowed);
        }
        Ok(Self {
            asset,
            sender,
            receiver,
            requested_at,
            comment: normalize_comment(comment),
        })
    }

    #[must_use]
    pub const fn asset(&self) -> AssetId {
        self.asset
    }

    #[must_use]
    pub const fn sender(&self) -> UserId {
        self.sender
    }

    #[must_use]
    pub const fn receiver(&self) -> UserId {
        self.receiver
    }

    #[must_use]
    pub const fn requested_at(&self) -> OffsetDateTime {
        self.requested_at
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// A persisted proposal to move custody of one asset from sender to receiver.
///
/// Status and acceptance time are private so that every change goes through
/// [`TransferRequest::resolve`], which enforces the monotonic lifecycle and
/// the write-once `accepted_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRequest {
    id: TransferId,
    asset: AssetId,
    sender: UserId,
    receiver: UserId,
    status: TransferStatus,
    #[serde(with = "time::serde::rfc3339")]
    requested_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    accepted_at: Option<OffsetDateTime>,
    comment: Option<String>,
}

impl TransferRequest {
    /// Rebuilds a request from stored fields, checking internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InconsistentTransferRecord` if sender equals
    /// receiver, or if `accepted_at` disagrees with the status.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: TransferId,
        asset: AssetId,
        sender: UserId,
        receiver: UserId,
        status: TransferStatus,
        requested_at: OffsetDateTime,
        accepted_at: Option<OffsetDateTime>,
        comment: Option<String>,
    ) -> Result<Self, DomainError> {
        if sender == receiver {
            return Err(DomainError::InconsistentTransferRecord(format!(
                "transfer {id} has identical sender and receiver"
            )));
        }
        match (status, accepted_at) {
            (TransferStatus::Pending, Some(_)) => {
                return Err(DomainError::InconsistentTransferRecord(format!(
                    "pending transfer {id} carries a resolution time"
                )));
            }
            (TransferStatus::Accepted | TransferStatus::Rejected, None) => {
                return Err(DomainError::InconsistentTransferRecord(format!(
                    "{status} transfer {id} has no resolution time"
                )));
            }
            _ => {}
        }
        Ok(Self {
            id,
            asset,
            sender,
            receiver,
            status,
            requested_at,
            accepted_at,
            comment,
        })
    }

    /// Resolves a pending request.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AlreadyResolved` if the request is not pending.
    pub fn resolve(
        &mut self,
        decision: TransferDecision,
        at: OffsetDateTime,
    ) -> Result<(), DomainError> {
        let target: TransferStatus = decision.status();
        if !self.status.can_transition_to(target) {
            return Err(DomainError::AlreadyResolved {
                transfer: self.id,
                status: self.status,
            });
        }
        self.status = target;
        if self.accepted_at.is_none() {
            self.accepted_at = Some(at);
        }
        Ok(())
    }

    /// Replaces the comment on a pending request.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AlreadyResolved` if the request is not pending.
    pub fn annotate(&mut self, comment: Option<String>) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::AlreadyResolved {
                transfer: self.id,
                status: self.status,
            });
        }
        self.comment = normalize_comment(comment);
        Ok(())
    }

    #[must_use]
    pub const fn id(&self) -> TransferId {
        self.id
    }

    #[must_use]
    pub const fn asset(&self) -> AssetId {
        self.asset
    }

    #[must_use]
    pub const fn sender(&self) -> UserId {
        self.sender
    }

    #[must_use]
    pub const fn receiver(&self) -> UserId {
        self.receiver
    }

    #[must_use]
    pub const fn status(&self) -> TransferStatus {
        self.status
    }

    #[must_use]
    pub const fn requested_at(&self) -> OffsetDateTime {
        self.requested_at
    }

    /// The resolution time. Named after the stored column; it is also set
    /// when the request is rejected.
    #[must_use]
    pub const fn accepted_at(&self) -> Option<OffsetDateTime> {
        self.accepted_at
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns true if `user` is the sender or the receiver.
    #[must_use]
    pub fn involves(&self, user: UserId) -> bool {
        self.sender == user || self.receiver == user
    }
}

/// Empty or whitespace-only comments are stored as absent.
fn normalize_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}
