//! Audit trail of engine operations.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::model::{BalanceAdjustment, EventId, Operation, UserId};
use crate::core::ErrorKind;
use crate::util::clock::now_ms;

/// One engine operation as seen by the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Audit record identifier.
    pub audit_id: String,
    /// Event the operation targeted.
    pub event_id: EventId,
    /// Caller, if one was resolved.
    pub actor: Option<UserId>,
    /// Operation attempted.
    pub operation: Operation,
    /// Adjustments applied; empty for rejected operations.
    pub adjustments: Vec<BalanceAdjustment>,
    /// Failure classification for rejected operations.
    pub rejected: Option<ErrorKind>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

impl AuditEvent {
    /// Whether the operation was committed.
    pub const fn is_applied(&self) -> bool {
        self.rejected.is_none()
    }
}

/// Destination for per-operation audit records.
///
/// The engine records every operation it finishes, committed or rejected,
/// while holding the sink's lock, so implementations should not block.
pub trait AuditSink: Send {
    /// Store one record.
    fn record(&mut self, event: AuditEvent);
}

/// Ring buffer keeping the most recent records; older ones are evicted.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    capacity: usize,
}

impl InMemoryAuditSink {
    /// Buffer retaining at most `capacity` records (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(1_024)),
            capacity,
        }
    }

    /// Retained records, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }

    /// Retained records for one event, oldest first.
    pub fn events_for(&self, event_id: &EventId) -> Vec<AuditEvent> {
        self.events
            .iter()
            .filter(|record| &record.event_id == event_id)
            .cloned()
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Stamp a record with a fresh id and the current time.
pub fn build_audit_event(
    event_id: EventId,
    actor: Option<UserId>,
    operation: Operation,
    adjustments: Vec<BalanceAdjustment>,
    rejected: Option<ErrorKind>,
) -> AuditEvent {
    AuditEvent {
        audit_id: uuid::Uuid::new_v4().to_string(),
        event_id,
        actor,
        operation,
        adjustments,
        rejected,
        created_at_ms: now_ms(),
    }
}
