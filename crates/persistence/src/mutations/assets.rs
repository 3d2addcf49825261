// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Asset registry mutations.
//!
//! There is intentionally no function that sets `current_owner_id` from
//! outside this crate. Registration may name an initial custodian, and
//! afterwards the column is only written by [`transfer_custody`], which is
//! called from the resolution transaction.

use custody::OwnershipChange;
use custody_domain::{AssetId, OrganizationId, UserId, validate_required_text};
use diesel::SqliteConnection;
use diesel::prelude::*;
use time::OffsetDateTime;
use tracing::info;

use crate::backend::sqlite::get_last_insert_rowid;
use crate::data_models::NewAsset;
use crate::diesel_schema::assets;
use crate::error::PersistenceError;
use crate::timestamps::to_stored;

/// Registers an asset.
///
/// # Errors
///
/// Returns an error if the serial number or model is empty, or the serial
/// or inventory number is already registered.
pub fn register_asset(
    conn: &mut SqliteConnection,
    asset: &NewAsset,
    now: OffsetDateTime,
) -> Result<AssetId, PersistenceError> {
    let serial_number: String = validate_required_text("serial number", &asset.serial_number)?;
    let model: String = validate_required_text("model", &asset.model)?;
    let stamp: String = to_stored(now)?;

    diesel::insert_into(assets::table)
        .values((
            assets::serial_number.eq(&serial_number),
            assets::inventory_number.eq(asset.inventory_number.as_deref()),
            assets::model.eq(&model),
            assets::asset_type.eq(asset.asset_type.as_deref()),
            assets::manufacturer.eq(asset.manufacturer.as_deref()),
            assets::supplier.eq(asset.supplier.as_deref()),
            assets::organization_id.eq(asset.organization.map(OrganizationId::value)),
            assets::current_owner_id.eq(asset.initial_owner.map(UserId::value)),
            assets::decommissioned.eq(0),
            assets::created_at.eq(&stamp),
            assets::updated_at.eq(&stamp),
        ))
        .execute(conn)?;

    let asset_id: i64 = get_last_insert_rowid(conn)?;
    info!(
        asset_id,
        serial_number = %serial_number,
        initial_owner = ?asset.initial_owner.map(UserId::value),
        "Asset registered"
    );
    Ok(AssetId::new(asset_id))
}

/// Retires an asset. Its custodian is left as-is.
///
/// # Errors
///
/// Returns `NotFound` if the asset does not exist.
pub fn decommission_asset(
    conn: &mut SqliteConnection,
    asset_id: AssetId,
    now: OffsetDateTime,
) -> Result<(), PersistenceError> {
    let rows_affected: usize = diesel::update(assets::table)
        .filter(assets::asset_id.eq(asset_id.value()))
        .set((
            assets::decommissioned.eq(1),
            assets::updated_at.eq(to_stored(now)?),
        ))
        .execute(conn)?;

    if rows_affected == 0 {
        return Err(PersistenceError::NotFound(format!(
            "Asset {asset_id} not found"
        )));
    }

    info!(asset_id = asset_id.value(), "Asset decommissioned");
    Ok(())
}

/// Moves custody as part of an accepted transfer.
///
/// The update only matches while the sender still holds the asset and it
/// is not decommissioned; otherwise nothing is written and
/// `CustodyChanged` is returned so the enclosing transaction rolls back.
///
/// # Errors
///
/// Returns `CustodyChanged` if the guard did not match.
pub(crate) fn transfer_custody(
    conn: &mut SqliteConnection,
    change: &OwnershipChange,
    now: OffsetDateTime,
) -> Result<(), PersistenceError> {
    let rows_affected: usize = diesel::update(assets::table)
        .filter(assets::asset_id.eq(change.asset.value()))
        .filter(assets::current_owner_id.eq(change.from.value()))
        .filter(assets::decommissioned.eq(0))
        .set((
            assets::current_owner_id.eq(Some(change.to.value())),
            assets::updated_at.eq(to_stored(now)?),
        ))
        .execute(conn)?;

    if rows_affected == 0 {
        return Err(PersistenceError::CustodyChanged(change.asset));
    }

    info!(
        asset_id = change.asset.value(),
        from = change.from.value(),
        to = change.to.value(),
        "Custody transferred"
    );
    Ok(())
}
