//! Tests for audit sink

use credit_ledger::core::{
    build_audit_event, AuditSink, BalanceAdjustment, ErrorKind, EventId, InMemoryAuditSink,
    Operation, UserId,
};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(
        EventId::new("evt1"),
        Some(UserId::new("p1")),
        Operation::Create,
        vec![BalanceAdjustment::charge(UserId::new("c1"))],
        None,
    );

    sink.record(event);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_id, EventId::new("evt1"));
    assert_eq!(events[0].operation, Operation::Create);
    assert!(events[0].is_applied());
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    for id in ["evt1", "evt2", "evt3"] {
        sink.record(build_audit_event(EventId::new(id), None, Operation::Delete, Vec::new(), None));
    }

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_id, EventId::new("evt2")); // oldest dropped
    assert_eq!(events[1].event_id, EventId::new("evt3"));
}

#[test]
fn test_rejected_audit_event() {
    let event = build_audit_event(
        EventId::new("evt1"),
        Some(UserId::new("c1")),
        Operation::Enroll,
        Vec::new(),
        Some(ErrorKind::InsufficientBalance),
    );

    assert!(!event.is_applied());
    assert!(event.adjustments.is_empty());
    assert!(!event.audit_id.is_empty());
    assert!(event.created_at_ms > 0);
}

#[test]
fn test_audit_event_serializes_snake_case() {
    let event = build_audit_event(
        EventId::new("evt1"),
        None,
        Operation::Withdraw,
        Vec::new(),
        Some(ErrorKind::NotEnrolled),
    );
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["operation"], "withdraw");
    assert_eq!(json["rejected"], "not_enrolled");
}

#[test]
fn test_audit_events_for_one_event() {
    let mut sink = InMemoryAuditSink::new(8);
    for id in ["evt1", "evt2", "evt1"] {
        sink.record(build_audit_event(EventId::new(id), None, Operation::Update, Vec::new(), None));
    }

    assert_eq!(sink.events_for(&EventId::new("evt1")).len(), 2);
    assert!(sink.events_for(&EventId::new("missing")).is_empty());
}

#[test]
fn test_zero_capacity_keeps_latest() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event(EventId::new("evt1"), None, Operation::Create, Vec::new(), None));
    sink.record(build_audit_event(EventId::new("evt2"), None, Operation::Create, Vec::new(), None));

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_id, EventId::new("evt2"));
}
