// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Startup provisioning of organizations, users and assets.
//!
//! Records that already exist (by organization name, login name or serial
//! number) are skipped, so loading the same file twice changes nothing.

use custody::generate_secret;
use custody_domain::{AssetId, OrganizationId, OtpSecret, UserId};
use custody_persistence::{NewAsset, NewUser, Persistence, PersistenceError};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

/// Provisioning failures.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The file could not be read.
    #[error("Failed to read provisioning file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid provisioning JSON.
    #[error("Invalid provisioning file: {0}")]
    Parse(#[from] serde_json::Error),
    /// A record names an organization that does not exist.
    #[error("Unknown organization: {0}")]
    UnknownOrganization(String),
    /// An asset names an owner that does not exist.
    #[error("Unknown owner login: {0}")]
    UnknownOwner(String),
    /// A supplied one-time code secret is not usable.
    #[error("Invalid one-time code secret for {0}")]
    InvalidSecret(String),
    /// The store rejected a record.
    #[error("Provisioning write failed: {0}")]
    Persistence(#[from] PersistenceError),
}

/// The provisioning document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisionFile {
    #[serde(default)]
    pub organizations: Vec<ProvisionOrganization>,
    #[serde(default)]
    pub users: Vec<ProvisionUser>,
    #[serde(default)]
    pub assets: Vec<ProvisionAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionOrganization {
    pub name: String,
    pub short_name: String,
}

#[derive(Clone, Deserialize)]
pub struct ProvisionUser {
    pub login_name: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    /// Organization name.
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_advanced_access: bool,
    /// Base32 secret; generated when absent.
    #[serde(default)]
    pub otp_secret: Option<String>,
}

impl std::fmt::Debug for ProvisionUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionUser")
            .field("login_name", &self.login_name)
            .field("password", &"<redacted>")
            .field("organization", &self.organization)
            .field("is_active", &self.is_active)
            .field("otp_secret", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionAsset {
    pub serial_number: String,
    #[serde(default)]
    pub inventory_number: Option<String>,
    pub model: String,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    /// Organization name.
    #[serde(default)]
    pub organization: Option<String>,
    /// Login name of the initial custodian.
    #[serde(default)]
    pub owner: Option<String>,
}

const fn default_true() -> bool {
    true
}

/// Counts of records created by one provisioning run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionSummary {
    pub organizations: usize,
    pub users: usize,
    pub assets: usize,
}

/// Reads and applies a provisioning file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if any record
/// fails to apply.
pub fn load_provisioning(
    persistence: &mut Persistence,
    path: &Path,
    now: OffsetDateTime,
) -> Result<ProvisionSummary, ProvisionError> {
    let contents: String = std::fs::read_to_string(path)?;
    let file: ProvisionFile = serde_json::from_str(&contents)?;
    apply_provisioning(persistence, &file, now)
}

/// Applies a parsed provisioning document.
///
/// Organizations are created first, then users, then assets, so later
/// records may refer to earlier ones by name.
///
/// # Errors
///
/// Returns an error on the first record that cannot be applied. Records
/// applied before it stay applied.
pub fn apply_provisioning(
    persistence: &mut Persistence,
    file: &ProvisionFile,
    now: OffsetDateTime,
) -> Result<ProvisionSummary, ProvisionError> {
    let mut summary: ProvisionSummary = ProvisionSummary::default();

    for org in &file.organizations {
        if persistence.get_organization_by_name(&org.name)?.is_some() {
            debug!(name = %org.name, "Organization exists, skipping");
            continue;
        }
        persistence.create_organization(&org.name, &org.short_name)?;
        summary.organizations += 1;
    }

    for user in &file.users {
        if persistence.login_exists(&user.login_name)? {
            debug!(login_name = %user.login_name, "User exists, skipping");
            continue;
        }
        let otp_secret: OtpSecret = match &user.otp_secret {
            Some(secret) => OtpSecret::parse(secret)
                .map_err(|_| ProvisionError::InvalidSecret(user.login_name.clone()))?,
            None => {
                info!(
                    login_name = %user.login_name,
                    "Generated one-time code secret; user enrolls via /auth/otp/enrollment"
                );
                generate_secret()
                    .map_err(|_| ProvisionError::InvalidSecret(user.login_name.clone()))?
            }
        };
        let new_user: NewUser = NewUser {
            login_name: user.login_name.clone(),
            password: user.password.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            middle_name: user.middle_name.clone(),
            email: user.email.clone(),
            position: user.position.clone(),
            organization: resolve_organization(persistence, user.organization.as_deref())?,
            is_active: user.is_active,
            is_advanced_access: user.is_advanced_access,
            otp_secret,
        };
        let id: UserId = persistence.create_user(&new_user, now)?;
        debug!(user_id = id.value(), "Provisioned user");
        summary.users += 1;
    }

    for asset in &file.assets {
        if persistence.serial_number_exists(&asset.serial_number)? {
            debug!(serial_number = %asset.serial_number, "Asset exists, skipping");
            continue;
        }
        let initial_owner: Option<UserId> = match &asset.owner {
            Some(login) => Some(
                persistence
                    .get_credentials_by_login(login)?
                    .map(|credentials| credentials.user.id)
                    .ok_or_else(|| ProvisionError::UnknownOwner(login.clone()))?,
            ),
            None => None,
        };
        let new_asset: NewAsset = NewAsset {
            serial_number: asset.serial_number.clone(),
            inventory_number: asset.inventory_number.clone(),
            model: asset.model.clone(),
            asset_type: asset.asset_type.clone(),
            manufacturer: asset.manufacturer.clone(),
            supplier: asset.supplier.clone(),
            organization: resolve_organization(persistence, asset.organization.as_deref())?,
            initial_owner,
        };
        let id: AssetId = persistence.register_asset(&new_asset, now)?;
        debug!(asset_id = id.value(), "Provisioned asset");
        summary.assets += 1;
    }

    info!(
        organizations = summary.organizations,
        users = summary.users,
        assets = summary.assets,
        "Provisioning applied"
    );
    Ok(summary)
}

fn resolve_organization(
    persistence: &mut Persistence,
    name: Option<&str>,
) -> Result<Option<OrganizationId>, ProvisionError> {
    let Some(name) = name else {
        return Ok(None);
    };
    persistence
        .get_organization_by_name(name)?
        .map(|org| Some(org.id))
        .ok_or_else(|| ProvisionError::UnknownOrganization(name.to_string()))
}
