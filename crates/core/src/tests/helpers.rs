// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{OtpCode, TotpVerifier};
use custody_domain::{
    Asset, AssetId, OtpSecret, TransferId, TransferRequest, TransferStatus, User, UserId,
};
use time::OffsetDateTime;
use time::macros::datetime;

pub const ALICE_SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";
pub const BOB_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

pub const fn test_time() -> OffsetDateTime {
    datetime!(2026-03-02 09:00:10 UTC)
}

pub fn create_test_user(id: i64, login_name: &str, secret: &str) -> User {
    User {
        id: UserId::new(id),
        login_name: login_name.to_string(),
        first_name: login_name.to_string(),
        last_name: String::from("Tester"),
        middle_name: None,
        email: None,
        position: None,
        organization: None,
        is_active: true,
        is_advanced_access: false,
        otp_secret: OtpSecret::parse(secret).unwrap(),
    }
}

pub fn create_alice() -> User {
    create_test_user(1, "alice", ALICE_SECRET)
}

pub fn create_bob() -> User {
    create_test_user(2, "bob", BOB_SECRET)
}

/// Asset E1, held by alice.
pub fn create_laptop() -> Asset {
    Asset::new(
        AssetId::new(100),
        String::from("E1"),
        String::from("Latitude 5440"),
        Some(UserId::new(1)),
        false,
        test_time(),
    )
}

pub fn create_pending_request(comment: Option<&str>) -> TransferRequest {
    TransferRequest::restore(
        TransferId::new(7),
        AssetId::new(100),
        UserId::new(1),
        UserId::new(2),
        TransferStatus::Pending,
        test_time(),
        None,
        comment.map(String::from),
    )
    .unwrap()
}

pub fn current_code(user: &User, at: OffsetDateTime) -> OtpCode {
    OtpCode::new(TotpVerifier::new().generate(&user.otp_secret, at).unwrap())
}
