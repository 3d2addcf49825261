// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Transfer workflow tests through the operation set.

use custody_domain::{Asset, TransferDecision, TransferStatus, UserId};
use custody_persistence::TransferDirection;
use time::Duration;

use crate::{
    AnnotateTransferRequest, ApiError, Capability, CreateTransferRequest, ErrorKind,
    ListTransfersQuery, annotate_transfer, create_transfer, get_transfer, list_transfers,
    resolve_transfer,
};

use super::helpers::{
    create_test_fixture, create_test_resolution, create_test_transfer, current_code, test_time,
    wrong_code,
};

// ============================================================================
// Creation
// ============================================================================

#[test]
fn test_create_transfer_is_pending_with_sender_capabilities() {
    let mut fixture = create_test_fixture();

    let response = create_test_transfer(&mut fixture);

    assert_eq!(response.status, TransferStatus::Pending);
    assert_eq!(response.sender_id, fixture.alice.id);
    assert_eq!(response.receiver_id, fixture.bob.id);
    assert_eq!(response.requested_at, test_time());
    assert_eq!(response.accepted_at, None);
    assert_eq!(response.comment.as_deref(), Some("handover after project"));
    assert_eq!(response.capabilities.can_resolve, Capability::Denied);
    assert_eq!(response.capabilities.can_annotate, Capability::Denied);
}

#[test]
fn test_create_transfer_to_self_is_rejected() {
    let mut fixture = create_test_fixture();

    let result = create_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &fixture.alice,
        CreateTransferRequest {
            asset_id: fixture.laptop,
            receiver_id: fixture.alice.id,
            comment: None,
        },
        test_time(),
    );

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert_eq!(err.code(), "self_transfer_not_allowed");
}

#[test]
fn test_create_transfer_of_asset_not_held_is_rejected() {
    let mut fixture = create_test_fixture();

    let result = create_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &fixture.bob,
        CreateTransferRequest {
            asset_id: fixture.laptop,
            receiver_id: fixture.carol.id,
            comment: None,
        },
        test_time(),
    );

    assert_eq!(result.unwrap_err().code(), "not_owner");
}

#[test]
fn test_create_transfer_to_unknown_receiver_is_not_found() {
    let mut fixture = create_test_fixture();

    let result = create_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &fixture.alice,
        CreateTransferRequest {
            asset_id: fixture.laptop,
            receiver_id: UserId::new(9999),
            comment: None,
        },
        test_time(),
    );

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.code(), "receiver_not_found");
}

#[test]
fn test_second_pending_request_for_same_asset_is_rejected() {
    let mut fixture = create_test_fixture();
    create_test_transfer(&mut fixture);

    let result = create_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &fixture.alice,
        CreateTransferRequest {
            asset_id: fixture.laptop,
            receiver_id: fixture.carol.id,
            comment: None,
        },
        test_time(),
    );

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.code(), "duplicate_pending_request");
}

#[test]
fn test_inactive_sender_cannot_create_transfer() {
    let mut fixture = create_test_fixture();
    fixture
        .persistence
        .set_user_active(fixture.alice.id, false)
        .unwrap();
    let alice = fixture.reload(fixture.alice.id);

    let result = create_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &alice,
        CreateTransferRequest {
            asset_id: fixture.laptop,
            receiver_id: fixture.bob.id,
            comment: None,
        },
        test_time(),
    );

    assert_eq!(result.unwrap_err().code(), "actor_inactive");
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_accept_moves_custody_to_receiver() {
    let mut fixture = create_test_fixture();
    let created = create_test_transfer(&mut fixture);
    let at = test_time() + Duration::minutes(5);
    let bob = fixture.bob.clone();

    let response = resolve_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &bob,
        created.transfer_id,
        create_test_resolution(TransferDecision::Accept, current_code(&bob, at)),
        at,
    )
    .expect("Acceptance should succeed");

    assert_eq!(response.status, TransferStatus::Accepted);
    assert_eq!(response.accepted_at, Some(at));
    assert_eq!(response.capabilities.can_resolve, Capability::Denied);

    let asset: Asset = fixture.persistence.get_asset(fixture.laptop).unwrap().unwrap();
    assert_eq!(asset.current_owner(), Some(bob.id));
}

#[test]
fn test_reject_keeps_custody_with_sender() {
    let mut fixture = create_test_fixture();
    let created = create_test_transfer(&mut fixture);
    let bob = fixture.bob.clone();

    let response = resolve_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &bob,
        created.transfer_id,
        create_test_resolution(TransferDecision::Reject, current_code(&bob, test_time())),
        test_time(),
    )
    .expect("Rejection should succeed");

    assert_eq!(response.status, TransferStatus::Rejected);
    assert_eq!(response.accepted_at, Some(test_time()));

    let asset: Asset = fixture.persistence.get_asset(fixture.laptop).unwrap().unwrap();
    assert_eq!(asset.current_owner(), Some(fixture.alice.id));
}

#[test]
fn test_resolve_with_wrong_code_changes_nothing() {
    let mut fixture = create_test_fixture();
    let created = create_test_transfer(&mut fixture);
    let bob = fixture.bob.clone();

    let err = resolve_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &bob,
        created.transfer_id,
        create_test_resolution(TransferDecision::Accept, wrong_code(&bob, test_time())),
        test_time(),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthFactorFailed);
    assert_eq!(err.code(), "invalid_otp");

    let stored = fixture
        .persistence
        .get_transfer(created.transfer_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.status(), TransferStatus::Pending);
    let asset: Asset = fixture.persistence.get_asset(fixture.laptop).unwrap().unwrap();
    assert_eq!(asset.current_owner(), Some(fixture.alice.id));
}

#[test]
fn test_sender_cannot_resolve_own_request() {
    let mut fixture = create_test_fixture();
    let created = create_test_transfer(&mut fixture);
    let alice = fixture.alice.clone();

    let err = resolve_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &alice,
        created.transfer_id,
        create_test_resolution(TransferDecision::Accept, current_code(&alice, test_time())),
        test_time(),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.code(), "not_authorized");
}

#[test]
fn test_outsider_sees_request_as_not_found() {
    let mut fixture = create_test_fixture();
    let created = create_test_transfer(&mut fixture);
    let carol = fixture.carol.clone();

    let err = resolve_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &carol,
        created.transfer_id,
        create_test_resolution(TransferDecision::Accept, current_code(&carol, test_time())),
        test_time(),
    )
    .unwrap_err();
    assert_eq!(err.code(), "transfer_not_found");

    let err = get_transfer(&mut fixture.persistence, &carol, created.transfer_id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_second_resolution_is_already_resolved() {
    let mut fixture = create_test_fixture();
    let created = create_test_transfer(&mut fixture);
    let bob = fixture.bob.clone();

    resolve_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &bob,
        created.transfer_id,
        create_test_resolution(TransferDecision::Reject, current_code(&bob, test_time())),
        test_time(),
    )
    .unwrap();

    let later = test_time() + Duration::minutes(2);
    let err = resolve_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &bob,
        created.transfer_id,
        create_test_resolution(TransferDecision::Accept, current_code(&bob, later)),
        later,
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.code(), "already_resolved");
}

#[test]
fn test_accept_fails_when_asset_decommissioned_meanwhile() {
    let mut fixture = create_test_fixture();
    let created = create_test_transfer(&mut fixture);
    fixture
        .persistence
        .decommission_asset(fixture.laptop, test_time())
        .unwrap();
    let bob = fixture.bob.clone();

    let err = resolve_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &bob,
        created.transfer_id,
        create_test_resolution(TransferDecision::Accept, current_code(&bob, test_time())),
        test_time(),
    )
    .unwrap_err();

    assert_eq!(err.code(), "asset_decommissioned");
    let stored = fixture
        .persistence
        .get_transfer(created.transfer_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.status(), TransferStatus::Pending);
}

#[test]
fn test_inactive_receiver_can_still_resolve() {
    let mut fixture = create_test_fixture();
    let created = create_test_transfer(&mut fixture);
    fixture
        .persistence
        .set_user_active(fixture.bob.id, false)
        .unwrap();
    let bob = fixture.reload(fixture.bob.id);

    let response = resolve_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &bob,
        created.transfer_id,
        create_test_resolution(TransferDecision::Reject, current_code(&bob, test_time())),
        test_time(),
    )
    .expect("Rejection should succeed");

    assert_eq!(response.status, TransferStatus::Rejected);
}

#[test]
fn test_resolve_comment_replaces_stored_comment() {
    let mut fixture = create_test_fixture();
    let created = create_test_transfer(&mut fixture);
    let bob = fixture.bob.clone();

    let mut request =
        create_test_resolution(TransferDecision::Accept, current_code(&bob, test_time()));
    request.comment = Some(String::from("received in good condition"));

    let response = resolve_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &bob,
        created.transfer_id,
        request,
        test_time(),
    )
    .unwrap();

    assert_eq!(
        response.comment.as_deref(),
        Some("received in good condition")
    );
}

// ============================================================================
// Annotation
// ============================================================================

#[test]
fn test_annotate_changes_only_the_comment() {
    let mut fixture = create_test_fixture();
    let created = create_test_transfer(&mut fixture);
    let bob = fixture.bob.clone();

    let response = annotate_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &bob,
        created.transfer_id,
        AnnotateTransferRequest {
            otp_code: current_code(&bob, test_time()),
            comment: Some(String::from("will pick up on Friday")),
        },
        test_time(),
    )
    .unwrap();

    assert_eq!(response.status, TransferStatus::Pending);
    assert_eq!(response.accepted_at, None);
    assert_eq!(response.comment.as_deref(), Some("will pick up on Friday"));
    assert_eq!(response.capabilities.can_annotate, Capability::Allowed);
}

#[test]
fn test_annotate_with_blank_comment_clears_it() {
    let mut fixture = create_test_fixture();
    let created = create_test_transfer(&mut fixture);
    let bob = fixture.bob.clone();

    let response = annotate_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &bob,
        created.transfer_id,
        AnnotateTransferRequest {
            otp_code: current_code(&bob, test_time()),
            comment: Some(String::from("   ")),
        },
        test_time(),
    )
    .unwrap();

    assert_eq!(response.comment, None);
}

#[test]
fn test_annotate_requires_valid_code() {
    let mut fixture = create_test_fixture();
    let created = create_test_transfer(&mut fixture);
    let bob = fixture.bob.clone();

    let result: Result<_, ApiError> = annotate_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &bob,
        created.transfer_id,
        AnnotateTransferRequest {
            otp_code: wrong_code(&bob, test_time()),
            comment: Some(String::from("sneaky")),
        },
        test_time(),
    );

    assert_eq!(result.unwrap_err().code(), "invalid_otp");
    let stored = fixture
        .persistence
        .get_transfer(created.transfer_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.comment(), Some("handover after project"));
}

// ============================================================================
// Listing
// ============================================================================

#[test]
fn test_receiver_sees_incoming_request_with_capabilities() {
    let mut fixture = create_test_fixture();
    let created = create_test_transfer(&mut fixture);
    let bob = fixture.bob.clone();

    let incoming = list_transfers(
        &mut fixture.persistence,
        &bob,
        ListTransfersQuery {
            direction: TransferDirection::Incoming,
            pending_only: true,
        },
    )
    .unwrap();

    assert_eq!(incoming.transfers.len(), 1);
    assert_eq!(incoming.transfers[0].transfer_id, created.transfer_id);
    assert_eq!(incoming.transfers[0].capabilities.can_resolve, Capability::Allowed);

    let outgoing = list_transfers(
        &mut fixture.persistence,
        &bob,
        ListTransfersQuery {
            direction: TransferDirection::Outgoing,
            pending_only: false,
        },
    )
    .unwrap();
    assert!(outgoing.transfers.is_empty());
}

#[test]
fn test_pending_only_hides_resolved_requests() {
    let mut fixture = create_test_fixture();
    let created = create_test_transfer(&mut fixture);
    let bob = fixture.bob.clone();

    resolve_transfer(
        &mut fixture.persistence,
        &fixture.services,
        &bob,
        created.transfer_id,
        create_test_resolution(TransferDecision::Reject, current_code(&bob, test_time())),
        test_time(),
    )
    .unwrap();

    let alice = fixture.alice.clone();
    let pending = list_transfers(
        &mut fixture.persistence,
        &alice,
        ListTransfersQuery {
            direction: TransferDirection::Outgoing,
            pending_only: true,
        },
    )
    .unwrap();
    assert!(pending.transfers.is_empty());

    let all = list_transfers(
        &mut fixture.persistence,
        &alice,
        ListTransfersQuery {
            direction: TransferDirection::Outgoing,
            pending_only: false,
        },
    )
    .unwrap();
    assert_eq!(all.transfers.len(), 1);
    assert_eq!(all.transfers[0].status, TransferStatus::Rejected);
}
