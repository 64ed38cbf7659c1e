//! Store contracts the engine depends on.
//!
//! Event and ledger stores are external collaborators; the engine only
//! needs the operations below. Mutations that belong to one engine
//! operation are handed over as a single [`Changeset`] so the backend can
//! apply them in one transaction.

use async_trait::async_trait;

use crate::core::model::{BalanceAdjustment, Event, EventId, UserId};
use crate::core::LedgerResult;

/// Read and write access to event records.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Load an event, failing with `EventNotFound`.
    async fn find_event(&self, id: &EventId) -> LedgerResult<Event>;
    /// Insert or overwrite an event without version checks.
    async fn save_event(&self, event: Event) -> LedgerResult<Event>;
    /// Remove an event, failing with `EventNotFound`.
    async fn delete_event(&self, id: &EventId) -> LedgerResult<()>;
}

/// Per-user credit balances.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Current balance, failing with `UserNotFound`.
    async fn balance(&self, user: &UserId) -> LedgerResult<i64>;
    /// Apply one signed delta and return the new balance.
    async fn adjust(&self, user: &UserId, delta: i64) -> LedgerResult<i64>;
}

/// Event mutation carried by a changeset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventWrite {
    /// Store a new event. Fails with `ConflictingUpdate` if the id exists.
    Insert(Event),
    /// Overwrite an event whose stored version must equal `expected_version`.
    Replace {
        /// New contents.
        event: Event,
        /// Version read before computing the change.
        expected_version: u64,
    },
    /// Delete an event whose stored version must equal `expected_version`.
    Remove {
        /// Event to delete.
        id: EventId,
        /// Version read before computing the change.
        expected_version: u64,
    },
}

impl EventWrite {
    /// Event targeted by this write.
    pub const fn event_id(&self) -> &EventId {
        match self {
            Self::Insert(event) | Self::Replace { event, .. } => &event.id,
            Self::Remove { id, .. } => id,
        }
    }
}

/// Everything one engine operation writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changeset {
    /// Event mutation.
    pub event_write: EventWrite,
    /// Balance adjustments.
    pub adjustments: Vec<BalanceAdjustment>,
}

/// What a successful commit changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Stored event after the write; `None` after a removal.
    pub event: Option<Event>,
    /// Adjustments applied. Refunds to missing users are left out.
    pub applied: Vec<BalanceAdjustment>,
    /// Balances after the commit, one entry per applied adjustment.
    pub balances: Vec<(UserId, i64)>,
}

/// Store able to apply a changeset as one unit.
///
/// Implementations must apply either the whole changeset or nothing.
/// Charges against a missing user abort with `UserNotFound`; refunds against
/// a missing user are skipped. Version mismatches abort with
/// `ConflictingUpdate`.
#[async_trait]
pub trait TransactionalStore: EventStore + LedgerStore {
    /// Apply `changeset` atomically.
    async fn commit(&self, changeset: Changeset) -> LedgerResult<CommitReceipt>;
}
