// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use custody_domain::{OrganizationId, OtpSecret, User, UserId};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Input for creating a user account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login_name: String,
    /// Plain-text password; hashed before it is stored.
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub organization: Option<OrganizationId>,
    pub is_active: bool,
    pub is_advanced_access: bool,
    pub otp_secret: OtpSecret,
}

/// Input for registering an asset.
#[derive(Debug, Clone, Default)]
pub struct NewAsset {
    pub serial_number: String,
    pub inventory_number: Option<String>,
    pub model: String,
    pub asset_type: Option<String>,
    pub manufacturer: Option<String>,
    pub supplier: Option<String>,
    pub organization: Option<OrganizationId>,
    /// The custodian at registration time, if any.
    pub initial_owner: Option<UserId>,
}

/// A user together with the stored password hash, used only at login.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// A stored session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub session_id: i64,
    pub session_token: String,
    pub user_id: UserId,
    pub created_at: OffsetDateTime,
    pub last_activity_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// Sort key for the asset catalog. Serial number breaks ties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetOrdering {
    #[default]
    SerialNumber,
    Model,
    AssetType,
    Manufacturer,
}

/// Which side of a transfer the listing user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    /// Requests where the user is the receiver.
    Incoming,
    /// Requests where the user is the sender.
    Outgoing,
}
