// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API request and response data transfer objects.

use custody_domain::{
    Asset, AssetId, Organization, OrganizationId, TransferDecision, TransferId, TransferRequest,
    TransferStatus, User, UserId,
};
use custody_persistence::{AssetOrdering, TransferDirection};
use time::OffsetDateTime;

// ========================================================================
// Capability Model
// ========================================================================

/// Represents whether a specific action is permitted.
///
/// Serializes to JSON as true/false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// The action is permitted.
    Allowed,
    /// The action is not permitted.
    Denied,
}

impl Capability {
    /// Returns true if the capability is allowed.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Creates a capability from a boolean value.
    #[must_use]
    pub const fn from_bool(value: bool) -> Self {
        if value { Self::Allowed } else { Self::Denied }
    }
}

impl serde::Serialize for Capability {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bool(self.is_allowed())
    }
}

impl<'de> serde::Deserialize<'de> for Capability {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let b: bool = bool::deserialize(deserializer)?;
        Ok(Self::from_bool(b))
    }
}

/// What the viewing user may do with one transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransferCapabilities {
    /// Whether the user may accept or reject the request.
    pub can_resolve: Capability,
    /// Whether the user may change the request's comment.
    pub can_annotate: Capability,
}

// ========================================================================
// Authentication
// ========================================================================

/// API request to log in.
#[derive(Clone, PartialEq, Eq, serde::Deserialize)]
pub struct LoginRequest {
    /// The login name.
    pub login_name: String,
    /// The password.
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("login_name", &self.login_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// API response for a successful login.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LoginResponse {
    /// The bearer token for subsequent requests.
    pub session_token: String,
    /// When the session expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// The logged-in user.
    pub user: UserProfile,
}

/// API request to check a one-time code without changing any state.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct VerifyOtpRequest {
    /// The six-digit code.
    pub otp_code: String,
}

/// API response for a successful code check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct VerifyOtpResponse {
    /// Always true; a failed check is an error.
    pub verified: bool,
}

/// The caller's authenticator enrollment data.
#[derive(Clone, PartialEq, Eq, serde::Serialize)]
pub struct OtpEnrollmentResponse {
    /// The Base32 secret, for manual entry.
    pub secret: String,
    /// The `otpauth://` URI, usually rendered as a QR code.
    pub otpauth_uri: String,
}

impl std::fmt::Debug for OtpEnrollmentResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpEnrollmentResponse")
            .field("secret", &"<redacted>")
            .field("otpauth_uri", &"<redacted>")
            .finish()
    }
}

// ========================================================================
// Users
// ========================================================================

/// An organization as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OrganizationInfo {
    /// The organization ID.
    pub organization_id: OrganizationId,
    /// The full name.
    pub name: String,
    /// The abbreviation.
    pub short_name: String,
}

impl From<Organization> for OrganizationInfo {
    fn from(org: Organization) -> Self {
        Self {
            organization_id: org.id,
            name: org.name,
            short_name: org.short_name,
        }
    }
}

/// A user's own profile. The one-time code secret is never included.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub login_name: String,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub organization: Option<OrganizationInfo>,
    pub is_active: bool,
    pub is_advanced_access: bool,
}

impl UserProfile {
    /// Builds a profile from a user record and its organization.
    #[must_use]
    pub fn new(user: &User, organization: Option<Organization>) -> Self {
        Self {
            user_id: user.id,
            login_name: user.login_name.clone(),
            full_name: user.full_name(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            middle_name: user.middle_name.clone(),
            email: user.email.clone(),
            position: user.position.clone(),
            organization: organization.map(OrganizationInfo::from),
            is_active: user.is_active,
            is_advanced_access: user.is_advanced_access,
        }
    }
}

/// A colleague as shown in a receiver picker.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UserSummary {
    pub user_id: UserId,
    pub login_name: String,
    pub full_name: String,
    pub position: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            login_name: user.login_name.clone(),
            full_name: user.full_name(),
            position: user.position.clone(),
        }
    }
}

/// API response listing colleagues.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ListColleaguesResponse {
    pub users: Vec<UserSummary>,
}

// ========================================================================
// Transfers
// ========================================================================

/// API request to propose a transfer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct CreateTransferRequest {
    /// The asset to hand over.
    pub asset_id: AssetId,
    /// The proposed new custodian.
    pub receiver_id: UserId,
    /// Optional free-text note.
    #[serde(default)]
    pub comment: Option<String>,
}

/// API request to accept or reject a transfer.
#[derive(Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ResolveTransferRequest {
    /// `accepted` or `rejected`.
    pub decision: TransferDecision,
    /// The receiver's current one-time code.
    pub otp_code: String,
    /// Replaces the stored comment when present.
    #[serde(default)]
    pub comment: Option<String>,
}

impl std::fmt::Debug for ResolveTransferRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveTransferRequest")
            .field("decision", &self.decision)
            .field("otp_code", &"<redacted>")
            .field("comment", &self.comment)
            .finish()
    }
}

/// API request to change the comment of a pending transfer.
#[derive(Clone, PartialEq, Eq, serde::Deserialize)]
pub struct AnnotateTransferRequest {
    /// The receiver's current one-time code.
    pub otp_code: String,
    /// The new comment; empty or absent clears it.
    #[serde(default)]
    pub comment: Option<String>,
}

impl std::fmt::Debug for AnnotateTransferRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotateTransferRequest")
            .field("otp_code", &"<redacted>")
            .field("comment", &self.comment)
            .finish()
    }
}

/// Query parameters for listing transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct ListTransfersQuery {
    /// Which side of the request the caller is on.
    pub direction: TransferDirection,
    /// Restrict to pending requests.
    #[serde(default)]
    pub pending_only: bool,
}

/// Query parameters for the asset catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct ListAssetsQuery {
    /// Terms separated by whitespace or commas; every term must match.
    #[serde(default)]
    pub search: Option<String>,
    /// The sort key.
    #[serde(default)]
    pub ordering: AssetOrdering,
}

impl ListAssetsQuery {
    /// Splits the search string into terms, dropping empty ones.
    #[must_use]
    pub fn search_terms(&self) -> Vec<&str> {
        self.search
            .as_deref()
            .unwrap_or_default()
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|term| !term.is_empty())
            .collect()
    }
}

/// A transfer request as shown to one of its parties.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TransferResponse {
    pub transfer_id: TransferId,
    pub asset_id: AssetId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub status: TransferStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub requested_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub accepted_at: Option<OffsetDateTime>,
    pub comment: Option<String>,
    /// What the viewing user may do next.
    pub capabilities: TransferCapabilities,
}

impl TransferResponse {
    /// Builds a response for `request` with precomputed capabilities.
    #[must_use]
    pub fn new(request: &TransferRequest, capabilities: TransferCapabilities) -> Self {
        Self {
            transfer_id: request.id(),
            asset_id: request.asset(),
            sender_id: request.sender(),
            receiver_id: request.receiver(),
            status: request.status(),
            requested_at: request.requested_at(),
            accepted_at: request.accepted_at(),
            comment: request.comment().map(str::to_string),
            capabilities,
        }
    }
}

/// API response listing transfers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ListTransfersResponse {
    pub transfers: Vec<TransferResponse>,
}

// ========================================================================
// Assets
// ========================================================================

/// An asset as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AssetResponse {
    pub asset_id: AssetId,
    pub serial_number: String,
    pub inventory_number: Option<String>,
    pub model: String,
    pub asset_type: Option<String>,
    pub manufacturer: Option<String>,
    pub supplier: Option<String>,
    pub organization_id: Option<OrganizationId>,
    pub current_owner_id: Option<UserId>,
    pub decommissioned: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&Asset> for AssetResponse {
    fn from(asset: &Asset) -> Self {
        Self {
            asset_id: asset.id,
            serial_number: asset.serial_number.clone(),
            inventory_number: asset.inventory_number.clone(),
            model: asset.model.clone(),
            asset_type: asset.asset_type.clone(),
            manufacturer: asset.manufacturer.clone(),
            supplier: asset.supplier.clone(),
            organization_id: asset.organization,
            current_owner_id: asset.current_owner(),
            decommissioned: asset.decommissioned,
            created_at: asset.created_at,
            updated_at: asset.updated_at,
        }
    }
}

/// API response listing assets.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ListAssetsResponse {
    pub assets: Vec<AssetResponse>,
}

/// An asset with its full transfer history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AssetDetailResponse {
    pub asset: AssetResponse,
    pub history: Vec<TransferResponse>,
}
