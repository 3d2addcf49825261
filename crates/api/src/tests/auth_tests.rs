// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Login and session tests.

use custody::TotpVerifier;
use custody_domain::OtpSecret;
use time::Duration;

use crate::{
    ApiError, ErrorKind, LoginRequest, SessionPolicy, VerifyOtpRequest, authenticate, login,
    logout, otp_enrollment, verify_otp, whoami,
};

use super::helpers::{OTHER_SECRET, TEST_PASSWORD, TEST_SECRET, create_test_fixture, test_time};

fn login_request(login_name: &str, password: &str) -> LoginRequest {
    LoginRequest {
        login_name: login_name.to_string(),
        password: password.to_string(),
    }
}

#[test]
fn test_login_returns_session_and_profile() {
    let mut fixture = create_test_fixture();

    let response = login(
        &mut fixture.persistence,
        &login_request("ALICE", TEST_PASSWORD),
        &SessionPolicy::default(),
        test_time(),
    )
    .expect("Login should succeed");

    assert_eq!(response.session_token.len(), 64);
    assert_eq!(response.expires_at, test_time() + Duration::hours(12));
    assert_eq!(response.user.user_id, fixture.alice.id);
    assert_eq!(
        response.user.organization.map(|o| o.short_name).as_deref(),
        Some("FE")
    );

    let user = authenticate(
        &mut fixture.persistence,
        &response.session_token,
        test_time() + Duration::minutes(1),
    )
    .unwrap();
    assert_eq!(user.id, fixture.alice.id);
}

#[test]
fn test_login_with_wrong_password_fails() {
    let mut fixture = create_test_fixture();

    let err = login(
        &mut fixture.persistence,
        &login_request("alice", "wrong"),
        &SessionPolicy::default(),
        test_time(),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
}

#[test]
fn test_login_with_unknown_name_fails_the_same_way() {
    let mut fixture = create_test_fixture();

    let unknown = login(
        &mut fixture.persistence,
        &login_request("mallory", TEST_PASSWORD),
        &SessionPolicy::default(),
        test_time(),
    )
    .unwrap_err();
    let wrong = login(
        &mut fixture.persistence,
        &login_request("alice", "wrong"),
        &SessionPolicy::default(),
        test_time(),
    )
    .unwrap_err();

    assert_eq!(unknown, wrong);
}

#[test]
fn test_disabled_account_cannot_log_in() {
    let mut fixture = create_test_fixture();
    fixture
        .persistence
        .set_user_active(fixture.alice.id, false)
        .unwrap();

    let err = login(
        &mut fixture.persistence,
        &login_request("alice", TEST_PASSWORD),
        &SessionPolicy::default(),
        test_time(),
    )
    .unwrap_err();

    assert_eq!(
        err,
        ApiError::AuthenticationFailed {
            reason: String::from("Account is disabled")
        }
    );
}

#[test]
fn test_expired_session_is_rejected() {
    let mut fixture = create_test_fixture();
    let policy = SessionPolicy {
        lifetime: Duration::minutes(30),
    };
    let response = login(
        &mut fixture.persistence,
        &login_request("alice", TEST_PASSWORD),
        &policy,
        test_time(),
    )
    .unwrap();

    let err = authenticate(
        &mut fixture.persistence,
        &response.session_token,
        test_time() + Duration::minutes(30),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
}

#[test]
fn test_session_sees_current_user_record() {
    let mut fixture = create_test_fixture();
    let response = login(
        &mut fixture.persistence,
        &login_request("alice", TEST_PASSWORD),
        &SessionPolicy::default(),
        test_time(),
    )
    .unwrap();
    fixture
        .persistence
        .set_user_active(fixture.alice.id, false)
        .unwrap();

    let user = authenticate(&mut fixture.persistence, &response.session_token, test_time())
        .unwrap();

    assert!(!user.is_active);
}

#[test]
fn test_logout_invalidates_session() {
    let mut fixture = create_test_fixture();
    let response = login(
        &mut fixture.persistence,
        &login_request("alice", TEST_PASSWORD),
        &SessionPolicy::default(),
        test_time(),
    )
    .unwrap();

    logout(&mut fixture.persistence, &response.session_token).unwrap();

    assert!(authenticate(&mut fixture.persistence, &response.session_token, test_time()).is_err());
}

#[test]
fn test_whoami_never_exposes_secret() {
    let mut fixture = create_test_fixture();
    let alice = fixture.alice.clone();

    let profile = whoami(&mut fixture.persistence, &alice).unwrap();
    let json = serde_json::to_string(&profile).unwrap();

    assert_eq!(profile.login_name, "alice");
    assert!(!json.contains("otp"));
    assert!(!json.contains("password"));
}

#[test]
fn test_enrollment_returns_own_secret_and_uri() {
    let fixture = create_test_fixture();

    let enrollment = otp_enrollment(&fixture.services, &fixture.alice).unwrap();

    assert_eq!(enrollment.secret, TEST_SECRET);
    assert!(
        enrollment
            .otpauth_uri
            .starts_with("otpauth://totp/Custody:alice")
    );
    assert!(
        enrollment
            .otpauth_uri
            .contains(&format!("secret={TEST_SECRET}"))
    );
    assert!(!format!("{enrollment:?}").contains(TEST_SECRET));
}

#[test]
fn test_enrolled_secret_produces_accepted_codes() {
    let fixture = create_test_fixture();
    let carol = fixture.carol.clone();

    let enrollment = otp_enrollment(&fixture.services, &carol).unwrap();
    assert_eq!(enrollment.secret, OTHER_SECRET);
    let code: String = TotpVerifier::new()
        .generate(&OtpSecret::parse(&enrollment.secret).unwrap(), test_time())
        .unwrap();

    let response = verify_otp(
        &fixture.services,
        &carol,
        VerifyOtpRequest { otp_code: code },
        test_time(),
    )
    .unwrap();
    assert!(response.verified);
}
