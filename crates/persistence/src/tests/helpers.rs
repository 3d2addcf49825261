// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use custody::{OwnershipChange, TransitionResult};
use custody_domain::{
    AssetId, NewTransferRequest, OrganizationId, OtpSecret, TransferDecision, TransferRequest,
    UserId,
};
use time::OffsetDateTime;
use time::macros::datetime;

use crate::{NewAsset, NewUser, Persistence};

pub const TEST_SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";
pub const TEST_PASSWORD: &str = "correct horse battery staple";
pub const TEST_PASSWORD_COST: u32 = 4;

pub const fn test_time() -> OffsetDateTime {
    datetime!(2026-03-02 09:00 UTC)
}

pub fn create_test_persistence() -> Persistence {
    Persistence::new_in_memory()
        .expect("Failed to create in-memory persistence")
        .with_password_cost(TEST_PASSWORD_COST)
}

pub fn create_test_new_user(login_name: &str, organization: Option<OrganizationId>) -> NewUser {
    NewUser {
        login_name: login_name.to_string(),
        password: TEST_PASSWORD.to_string(),
        first_name: String::from("Test"),
        last_name: login_name.to_string(),
        middle_name: None,
        email: Some(format!("{login_name}@example.com")),
        position: None,
        organization,
        is_active: true,
        is_advanced_access: false,
        otp_secret: OtpSecret::parse(TEST_SECRET).unwrap(),
    }
}

pub fn create_test_user(
    persistence: &mut Persistence,
    login_name: &str,
    organization: Option<OrganizationId>,
) -> UserId {
    persistence
        .create_user(&create_test_new_user(login_name, organization), test_time())
        .expect("Failed to create user")
}

pub fn create_test_asset(
    persistence: &mut Persistence,
    serial_number: &str,
    owner: Option<UserId>,
) -> AssetId {
    let asset: NewAsset = NewAsset {
        serial_number: serial_number.to_string(),
        model: String::from("ThinkPad T14"),
        initial_owner: owner,
        ..NewAsset::default()
    };
    persistence
        .register_asset(&asset, test_time())
        .expect("Failed to register asset")
}

/// Stores a new pending request and returns it as read back.
pub fn create_test_request(
    persistence: &mut Persistence,
    asset: AssetId,
    sender: UserId,
    receiver: UserId,
    requested_at: OffsetDateTime,
) -> TransferRequest {
    let request: NewTransferRequest =
        NewTransferRequest::new(asset, sender, receiver, requested_at, None).unwrap();
    persistence
        .persist_transition(&TransitionResult::Created(request), requested_at)
        .expect("Failed to create transfer request")
}

/// Builds the resolution result the workflow engine would produce.
pub fn resolution_of(
    stored: &TransferRequest,
    decision: TransferDecision,
    at: OffsetDateTime,
) -> TransitionResult {
    let mut request: TransferRequest = stored.clone();
    request.resolve(decision, at).unwrap();
    let ownership: Option<OwnershipChange> = match decision {
        TransferDecision::Accept => Some(OwnershipChange {
            asset: stored.asset(),
            from: stored.sender(),
            to: stored.receiver(),
        }),
        TransferDecision::Reject => None,
    };
    TransitionResult::Resolved { request, ownership }
}
