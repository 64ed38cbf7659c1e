//! Tests for error classification

use credit_ledger::core::{ErrorKind, EventId, LedgerError, UserId};

#[test]
fn test_error_display() {
    let err = LedgerError::InsufficientBalance {
        user_id: UserId::new("c1"),
        balance: 0,
    };
    assert_eq!(err.to_string(), "insufficient balance for user c1: 0");
    assert_eq!(
        LedgerError::EventNotFound(EventId::new("e1")).to_string(),
        "event not found: e1"
    );
}

#[test]
fn test_error_kinds() {
    assert_eq!(LedgerError::Unauthenticated.kind(), ErrorKind::Unauthenticated);
    assert_eq!(LedgerError::Forbidden("x".into()).kind(), ErrorKind::Forbidden);
    assert_eq!(LedgerError::UserNotFound(UserId::new("u")).kind(), ErrorKind::NotFound);
    assert_eq!(LedgerError::EventNotFound(EventId::new("e")).kind(), ErrorKind::NotFound);
    assert_eq!(LedgerError::DeadlineExpired.kind(), ErrorKind::Timeout);
    assert_eq!(LedgerError::Store("down".into()).kind(), ErrorKind::StoreFailure);
}

#[test]
fn test_status_codes() {
    assert_eq!(ErrorKind::InvalidRequest.status_code(), 400);
    assert_eq!(ErrorKind::Unauthenticated.status_code(), 401);
    assert_eq!(ErrorKind::Forbidden.status_code(), 403);
    assert_eq!(ErrorKind::NotFound.status_code(), 404);
    assert_eq!(ErrorKind::InsufficientBalance.status_code(), 409);
    assert_eq!(ErrorKind::AlreadyEnrolled.status_code(), 409);
    assert_eq!(ErrorKind::NotEnrolled.status_code(), 409);
    assert_eq!(ErrorKind::ConflictingUpdate.status_code(), 409);
    assert_eq!(ErrorKind::PolicyViolation.status_code(), 422);
    assert_eq!(ErrorKind::StoreFailure.status_code(), 500);
    assert_eq!(ErrorKind::Timeout.status_code(), 504);
}

#[test]
fn test_error_kind_wire_names() {
    let json = serde_json::to_string(&ErrorKind::InsufficientBalance).unwrap();
    assert_eq!(json, "\"insufficient_balance\"");
}
