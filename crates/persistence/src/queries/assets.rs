// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Asset registry queries.

use custody_domain::{Asset, AssetId, OrganizationId, TransferStatus, UserId};
use diesel::SqliteConnection;
use diesel::dsl::not;
use diesel::prelude::*;
use tracing::debug;

use crate::data_models::AssetOrdering;
use crate::diesel_schema::{assets, transfer_requests, users};
use crate::error::PersistenceError;
use crate::timestamps::from_stored;

/// Diesel Queryable struct for asset rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = assets)]
struct AssetRow {
    asset_id: i64,
    serial_number: String,
    inventory_number: Option<String>,
    model: String,
    asset_type: Option<String>,
    manufacturer: Option<String>,
    supplier: Option<String>,
    organization_id: Option<i64>,
    current_owner_id: Option<i64>,
    decommissioned: i32,
    created_at: String,
    updated_at: String,
}

impl AssetRow {
    fn into_asset(self) -> Result<Asset, PersistenceError> {
        let mut asset: Asset = Asset::new(
            AssetId::new(self.asset_id),
            self.serial_number,
            self.model,
            self.current_owner_id.map(UserId::new),
            self.decommissioned != 0,
            from_stored(&self.created_at)?,
        );
        asset.inventory_number = self.inventory_number;
        asset.asset_type = self.asset_type;
        asset.manufacturer = self.manufacturer;
        asset.supplier = self.supplier;
        asset.organization = self.organization_id.map(OrganizationId::new);
        asset.updated_at = from_stored(&self.updated_at)?;
        Ok(asset)
    }
}

/// Retrieves an asset by ID.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is malformed.
pub fn get_asset(
    conn: &mut SqliteConnection,
    asset_id: AssetId,
) -> Result<Option<Asset>, PersistenceError> {
    debug!(asset_id = asset_id.value(), "Looking up asset");

    assets::table
        .filter(assets::asset_id.eq(asset_id.value()))
        .select(AssetRow::as_select())
        .first(conn)
        .optional()?
        .map(AssetRow::into_asset)
        .transpose()
}

/// Returns true if an asset with this serial number is registered.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn serial_number_exists(
    conn: &mut SqliteConnection,
    serial_number: &str,
) -> Result<bool, PersistenceError> {
    let count: i64 = assets::table
        .filter(assets::serial_number.eq(serial_number))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

/// Lists the non-decommissioned assets `owner` currently holds, by serial number.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is malformed.
pub fn list_assets_held_by(
    conn: &mut SqliteConnection,
    owner: UserId,
) -> Result<Vec<Asset>, PersistenceError> {
    let rows: Vec<AssetRow> = assets::table
        .filter(assets::current_owner_id.eq(owner.value()))
        .filter(assets::decommissioned.eq(0))
        .order(assets::serial_number.asc())
        .select(AssetRow::as_select())
        .load(conn)?;

    rows.into_iter().map(AssetRow::into_asset).collect()
}

/// Lists the assets `owner` could hand over right now.
///
/// Same as [`list_assets_held_by`] minus assets that already have a
/// pending request from anyone.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is malformed.
pub fn list_transferable_assets(
    conn: &mut SqliteConnection,
    owner: UserId,
) -> Result<Vec<Asset>, PersistenceError> {
    let pending_assets = transfer_requests::table
        .filter(transfer_requests::status.eq(TransferStatus::Pending.as_str()))
        .select(transfer_requests::asset_id);

    let rows: Vec<AssetRow> = assets::table
        .filter(assets::current_owner_id.eq(owner.value()))
        .filter(assets::decommissioned.eq(0))
        .filter(not(assets::asset_id.eq_any(pending_assets)))
        .order(assets::serial_number.asc())
        .select(AssetRow::as_select())
        .load(conn)?;

    rows.into_iter().map(AssetRow::into_asset).collect()
}

/// Escapes `LIKE` wildcards and wraps `term` for a substring match.
fn contains_pattern(term: &str) -> String {
    let mut pattern: String = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Lists catalog assets, decommissioned ones included.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `holder` - Restrict to assets this user holds; `None` lists all
/// * `search_terms` - Every term must match one field: the serial number
///   exactly, or the model, type, manufacturer, inventory number or
///   holder login as a case-insensitive substring
/// * `ordering` - The sort key
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is malformed.
pub fn list_assets(
    conn: &mut SqliteConnection,
    holder: Option<UserId>,
    search_terms: &[&str],
    ordering: AssetOrdering,
) -> Result<Vec<Asset>, PersistenceError> {
    let mut query = assets::table.select(AssetRow::as_select()).into_boxed();

    if let Some(holder) = holder {
        query = query.filter(assets::current_owner_id.eq(holder.value()));
    }

    for term in search_terms {
        let pattern: String = contains_pattern(term);
        let matching_holders = users::table
            .filter(users::login_name.like(pattern.clone()).escape('\\'))
            .select(users::user_id.nullable());

        query = query.filter(
            assets::serial_number
                .eq(*term)
                .nullable()
                .or(assets::model.like(pattern.clone()).escape('\\').nullable())
                .or(assets::asset_type.like(pattern.clone()).escape('\\'))
                .or(assets::manufacturer.like(pattern.clone()).escape('\\'))
                .or(assets::inventory_number.like(pattern).escape('\\'))
                .or(assets::current_owner_id.eq_any(matching_holders)),
        );
    }

    query = match ordering {
        AssetOrdering::SerialNumber => query.order(assets::serial_number.asc()),
        AssetOrdering::Model => query.order((assets::model.asc(), assets::serial_number.asc())),
        AssetOrdering::AssetType => {
            query.order((assets::asset_type.asc(), assets::serial_number.asc()))
        }
        AssetOrdering::Manufacturer => {
            query.order((assets::manufacturer.asc(), assets::serial_number.asc()))
        }
    };

    debug!(
        holder = holder.map(UserId::value),
        terms = search_terms.len(),
        ?ordering,
        "Listing asset catalog"
    );

    let rows: Vec<AssetRow> = query.load(conn)?;
    rows.into_iter().map(AssetRow::into_asset).collect()
}
