//! In-memory implementation of every store contract.
//!
//! Users and events share one lock, so a [`Changeset`] is staged against the
//! current state and only written back once every step has validated.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::model::{BalanceAdjustment, Event, EventId, User, UserId};
use crate::core::store::{
    Changeset, CommitReceipt, EventStore, EventWrite, LedgerStore, TransactionalStore,
};
use crate::core::{LedgerError, LedgerResult};

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    events: HashMap<EventId, Event>,
}

/// Store backed by process memory.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `users`.
    pub fn with_users<I>(users: I) -> Self
    where
        I: IntoIterator<Item = User>,
    {
        let store = Self::new();
        {
            let mut state = store.state.lock();
            for user in users {
                state.users.insert(user.id.clone(), user);
            }
        }
        store
    }

    /// Insert or replace a user record.
    pub fn insert_user(&self, user: User) {
        self.state.lock().users.insert(user.id.clone(), user);
    }

    /// Drop a user record, returning it if present.
    pub fn remove_user(&self, id: &UserId) -> Option<User> {
        self.state.lock().users.remove(id)
    }

    /// Snapshot of a user record.
    pub fn user(&self, id: &UserId) -> Option<User> {
        self.state.lock().users.get(id).cloned()
    }

    /// Current balance of `id`, if the user exists.
    pub fn credits(&self, id: &UserId) -> Option<i64> {
        self.state.lock().users.get(id).map(|u| u.class_credits)
    }

    /// Snapshot of an event record.
    pub fn event(&self, id: &EventId) -> Option<Event> {
        self.state.lock().events.get(id).cloned()
    }

    /// Number of stored events.
    pub fn event_count(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Sum of every user's balance.
    pub fn total_credits(&self) -> i64 {
        self.state.lock().users.values().map(|u| u.class_credits).sum()
    }

    /// Make every subsequent call fail with a store error until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> LedgerResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Store("in-memory store marked unavailable".into()));
        }
        Ok(())
    }
}

fn stage_event(state: &State, write: &EventWrite) -> LedgerResult<Option<Event>> {
    match write {
        EventWrite::Insert(event) => {
            if state.events.contains_key(&event.id) {
                return Err(LedgerError::ConflictingUpdate(event.id.clone()));
            }
            let mut stored = event.clone();
            stored.version = 1;
            Ok(Some(stored))
        }
        EventWrite::Replace {
            event,
            expected_version,
        } => {
            let current = state
                .events
                .get(&event.id)
                .ok_or_else(|| LedgerError::EventNotFound(event.id.clone()))?;
            if current.version != *expected_version {
                return Err(LedgerError::ConflictingUpdate(event.id.clone()));
            }
            let mut stored = event.clone();
            stored.version = expected_version + 1;
            Ok(Some(stored))
        }
        EventWrite::Remove {
            id,
            expected_version,
        } => {
            let current = state
                .events
                .get(id)
                .ok_or_else(|| LedgerError::EventNotFound(id.clone()))?;
            if current.version != *expected_version {
                return Err(LedgerError::ConflictingUpdate(id.clone()));
            }
            Ok(None)
        }
    }
}

fn stage_balances(
    state: &State,
    adjustments: Vec<BalanceAdjustment>,
) -> LedgerResult<(Vec<BalanceAdjustment>, HashMap<UserId, i64>)> {
    let mut applied = Vec::with_capacity(adjustments.len());
    let mut balances: HashMap<UserId, i64> = HashMap::new();
    for adjustment in adjustments {
        let current = match balances.get(&adjustment.user_id) {
            Some(staged) => *staged,
            None => match state.users.get(&adjustment.user_id) {
                Some(user) => user.class_credits,
                None if adjustment.is_charge() => {
                    return Err(LedgerError::UserNotFound(adjustment.user_id));
                }
                None => {
                    tracing::warn!(user = %adjustment.user_id, "refund skipped, user no longer exists");
                    continue;
                }
            },
        };
        let next = current.checked_add(adjustment.delta).ok_or_else(|| {
            LedgerError::Store(format!("balance overflow for user {}", adjustment.user_id))
        })?;
        balances.insert(adjustment.user_id.clone(), next);
        applied.push(adjustment);
    }
    Ok((applied, balances))
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn find_event(&self, id: &EventId) -> LedgerResult<Event> {
        self.ensure_available()?;
        self.state
            .lock()
            .events
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::EventNotFound(id.clone()))
    }

    async fn save_event(&self, mut event: Event) -> LedgerResult<Event> {
        self.ensure_available()?;
        let mut state = self.state.lock();
        let version = state.events.get(&event.id).map_or(0, |e| e.version);
        event.version = version + 1;
        state.events.insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn delete_event(&self, id: &EventId) -> LedgerResult<()> {
        self.ensure_available()?;
        self.state
            .lock()
            .events
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| LedgerError::EventNotFound(id.clone()))
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn balance(&self, user: &UserId) -> LedgerResult<i64> {
        self.ensure_available()?;
        self.credits(user)
            .ok_or_else(|| LedgerError::UserNotFound(user.clone()))
    }

    async fn adjust(&self, user: &UserId, delta: i64) -> LedgerResult<i64> {
        self.ensure_available()?;
        let mut state = self.state.lock();
        let record = state
            .users
            .get_mut(user)
            .ok_or_else(|| LedgerError::UserNotFound(user.clone()))?;
        record.class_credits = record
            .class_credits
            .checked_add(delta)
            .ok_or_else(|| LedgerError::Store(format!("balance overflow for user {user}")))?;
        Ok(record.class_credits)
    }
}

#[async_trait]
impl TransactionalStore for InMemoryStore {
    async fn commit(&self, changeset: Changeset) -> LedgerResult<CommitReceipt> {
        self.ensure_available()?;
        let mut state = self.state.lock();

        let staged_event = stage_event(&state, &changeset.event_write)?;
        let (applied, staged_balances) = stage_balances(&state, changeset.adjustments)?;

        match (&changeset.event_write, &staged_event) {
            (EventWrite::Remove { id, .. }, _) => {
                state.events.remove(id);
            }
            (_, Some(event)) => {
                state.events.insert(event.id.clone(), event.clone());
            }
            (_, None) => {}
        }
        for (user, balance) in &staged_balances {
            if let Some(record) = state.users.get_mut(user) {
                record.class_credits = *balance;
            }
        }

        let balances = applied
            .iter()
            .map(|a| (a.user_id.clone(), staged_balances[&a.user_id]))
            .collect();
        tracing::debug!(
            event = %changeset.event_write.event_id(),
            applied = applied.len(),
            "changeset committed"
        );
        Ok(CommitReceipt {
            event: staged_event,
            applied,
            balances,
        })
    }
}
