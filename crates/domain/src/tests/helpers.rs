// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{
    Asset, AssetId, OtpSecret, TransferId, TransferRequest, TransferStatus, User, UserId,
};
use time::OffsetDateTime;
use time::macros::datetime;

pub const TEST_SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";

pub const fn test_time() -> OffsetDateTime {
    datetime!(2026-03-02 09:00 UTC)
}

pub fn create_test_user(id: i64, login_name: &str) -> User {
    User {
        id: UserId::new(id),
        login_name: login_name.to_string(),
        first_name: String::from("Test"),
        last_name: login_name.to_string(),
        middle_name: None,
        email: None,
        position: None,
        organization: None,
        is_active: true,
        is_advanced_access: false,
        otp_secret: OtpSecret::parse(TEST_SECRET).unwrap(),
    }
}

pub fn create_test_asset(id: i64, owner: Option<i64>) -> Asset {
    Asset::new(
        AssetId::new(id),
        format!("SN-{id:04}"),
        String::from("ThinkPad T14"),
        owner.map(UserId::new),
        false,
        test_time(),
    )
}

pub fn create_test_request(id: i64, asset: i64, sender: i64, receiver: i64) -> TransferRequest {
    TransferRequest::restore(
        TransferId::new(id),
        AssetId::new(asset),
        UserId::new(sender),
        UserId::new(receiver),
        TransferStatus::Pending,
        test_time(),
        None,
        None,
    )
    .unwrap()
}
