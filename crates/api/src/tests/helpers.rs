// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Test helper functions and fixtures.

use custody::{OtpCode, TotpVerifier};
use custody_domain::{
    AssetId, OrganizationId, OtpSecret, TransferDecision, TransferRequest, User, UserId,
};
use custody_persistence::{NewAsset, NewUser, Persistence};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use time::macros::datetime;

use crate::{
    CreateTransferRequest, NotifyError, OtpAttemptPolicy, ResolveTransferRequest,
    TransferNotifier, TransferResponse, TransferServices, create_transfer,
};

pub const TEST_SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";
pub const OTHER_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";
pub const TEST_PASSWORD: &str = "correct horse battery staple";
pub const TEST_PASSWORD_COST: u32 = 4;

pub const fn test_time() -> OffsetDateTime {
    datetime!(2026-03-02 09:00 UTC)
}

/// A seeded database: alice holds laptop E1, bob and carol hold nothing.
/// Alice, bob and carol share one organization; carol has a different
/// one-time code secret.
pub struct Fixture {
    pub persistence: Persistence,
    pub services: TransferServices,
    pub organization: OrganizationId,
    pub alice: User,
    pub bob: User,
    pub carol: User,
    pub laptop: AssetId,
}

impl Fixture {
    /// Re-reads a user so tests act with the current record.
    pub fn reload(&mut self, user: UserId) -> User {
        self.persistence.get_user(user).unwrap().unwrap()
    }
}

/// Records every event it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<(String, TransferRequest)>>,
}

impl TransferNotifier for RecordingNotifier {
    fn transfer_requested(&self, request: &TransferRequest) -> Result<(), NotifyError> {
        self.events
            .lock()
            .unwrap()
            .push((String::from("requested"), request.clone()));
        Ok(())
    }

    fn transfer_resolved(&self, request: &TransferRequest) -> Result<(), NotifyError> {
        self.events
            .lock()
            .unwrap()
            .push((String::from("resolved"), request.clone()));
        Ok(())
    }
}

/// Fails every delivery.
pub struct FailingNotifier;

impl TransferNotifier for FailingNotifier {
    fn transfer_requested(&self, _request: &TransferRequest) -> Result<(), NotifyError> {
        Err(NotifyError(String::from("subscriber gone")))
    }

    fn transfer_resolved(&self, _request: &TransferRequest) -> Result<(), NotifyError> {
        Err(NotifyError(String::from("subscriber gone")))
    }
}

pub fn create_test_new_user(
    login_name: &str,
    organization: Option<OrganizationId>,
    secret: &str,
) -> NewUser {
    NewUser {
        login_name: login_name.to_string(),
        password: TEST_PASSWORD.to_string(),
        first_name: String::from("Test"),
        last_name: login_name.to_string(),
        middle_name: None,
        email: Some(format!("{login_name}@example.com")),
        position: Some(String::from("Engineer")),
        organization,
        is_active: true,
        is_advanced_access: false,
        otp_secret: OtpSecret::parse(secret).unwrap(),
    }
}

pub fn create_test_fixture() -> Fixture {
    create_test_fixture_with(Arc::new(RecordingNotifier::default()))
}

pub fn create_test_fixture_with(notifier: Arc<dyn TransferNotifier>) -> Fixture {
    let mut persistence: Persistence = Persistence::new_in_memory()
        .expect("Failed to create in-memory persistence")
        .with_password_cost(TEST_PASSWORD_COST);
    let organization: OrganizationId = persistence
        .create_organization("Field Engineering", "FE")
        .expect("Failed to create organization");

    let mut add_user = |login: &str, secret: &str| -> User {
        let id: UserId = persistence
            .create_user(
                &create_test_new_user(login, Some(organization), secret),
                test_time(),
            )
            .expect("Failed to create user");
        persistence.get_user(id).unwrap().unwrap()
    };
    let alice: User = add_user("alice", TEST_SECRET);
    let bob: User = add_user("bob", TEST_SECRET);
    let carol: User = add_user("carol", OTHER_SECRET);

    let laptop: AssetId = persistence
        .register_asset(
            &NewAsset {
                serial_number: String::from("E1"),
                model: String::from("ThinkPad T14"),
                organization: Some(organization),
                initial_owner: Some(alice.id),
                ..NewAsset::default()
            },
            test_time(),
        )
        .expect("Failed to register asset");

    Fixture {
        persistence,
        services: TransferServices::new(notifier, OtpAttemptPolicy::default()),
        organization,
        alice,
        bob,
        carol,
        laptop,
    }
}

/// The code the user's authenticator shows at `at`.
pub fn current_code(user: &User, at: OffsetDateTime) -> String {
    TotpVerifier::new().generate(&user.otp_secret, at).unwrap()
}

/// A six-digit code that is not valid for the user at `at`.
pub fn wrong_code(user: &User, at: OffsetDateTime) -> String {
    let verifier: TotpVerifier = TotpVerifier::new();
    (0..1_000_000)
        .map(|n| format!("{n:06}"))
        .find(|candidate| {
            !verifier
                .verify(&user.otp_secret, &OtpCode::new(candidate.as_str()), at)
                .unwrap()
        })
        .unwrap()
}

/// Has alice propose handing the laptop to bob.
pub fn create_test_transfer(fixture: &mut Fixture) -> TransferResponse {
    create_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &fixture.alice,
        CreateTransferRequest {
            asset_id: fixture.laptop,
            receiver_id: fixture.bob.id,
            comment: Some(String::from("handover after project")),
        },
        test_time(),
    )
    .expect("Failed to create transfer")
}

pub fn create_test_resolution(
    decision: TransferDecision,
    otp_code: String,
) -> ResolveTransferRequest {
    ResolveTransferRequest {
        decision,
        otp_code,
        comment: None,
    }
}
