//! Keyed mutual exclusion for read-check-commit sequences.
//!
//! Every engine operation locks its event first and then the users it
//! touches in sorted order. Since no holder of a user lock ever waits for an
//! event lock, and user locks are always taken in the same global order, two
//! operations cannot deadlock.
//!
//! The order is carried by the types: [`KeyedLocks::lock_event`] yields an
//! [`EventLock`], and [`KeyedLocks::lock_users`] consumes it to produce the
//! final [`LockScope`], so user locks are taken exactly once per scope.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::core::model::{EventId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LockKey {
    Event(EventId),
    User(UserId),
}

struct Slots {
    map: HashMap<LockKey, Arc<AsyncMutex<()>>>,
    // Table size at which the next prune runs.
    next_prune: usize,
}

/// Table of per-key async mutexes.
pub struct KeyedLocks {
    slots: Mutex<Slots>,
    prune_threshold: usize,
}

/// Event lock awaiting its user locks.
pub struct EventLock {
    guard: OwnedMutexGuard<()>,
}

/// Guards held for the duration of one operation.
pub struct LockScope {
    _event: OwnedMutexGuard<()>,
    users: Vec<OwnedMutexGuard<()>>,
}

impl LockScope {
    /// Number of user locks held.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl KeyedLocks {
    /// Create a table that drops idle entries once it holds `prune_threshold` keys.
    pub fn new(prune_threshold: usize) -> Self {
        let prune_threshold = prune_threshold.max(1);
        Self {
            slots: Mutex::new(Slots {
                map: HashMap::new(),
                next_prune: prune_threshold,
            }),
            prune_threshold,
        }
    }

    fn slot(&self, key: LockKey) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock();
        if slots.map.len() >= slots.next_prune {
            // Entries only referenced by the table are idle.
            slots.map.retain(|_, slot| Arc::strong_count(slot) > 1);
            // Busy keys stay; wait for the table to double before scanning again.
            slots.next_prune = self.prune_threshold.max(slots.map.len() * 2);
            tracing::debug!(live = slots.map.len(), next = slots.next_prune, "lock table pruned");
        }
        Arc::clone(slots.map.entry(key).or_default())
    }

    /// Lock an event. User locks for the same operation follow via [`Self::lock_users`].
    pub async fn lock_event(&self, id: &EventId) -> EventLock {
        let guard = self.slot(LockKey::Event(id.clone())).lock_owned().await;
        tracing::debug!(event = %id, "event lock acquired");
        EventLock { guard }
    }

    /// Lock `users` in sorted order, skipping duplicates, under `event`.
    pub async fn lock_users<'a, I>(&self, event: EventLock, users: I) -> LockScope
    where
        I: IntoIterator<Item = &'a UserId>,
    {
        let ordered: BTreeSet<&UserId> = users.into_iter().collect();
        let mut guards = Vec::with_capacity(ordered.len());
        for user in ordered {
            guards.push(self.slot(LockKey::User(user.clone())).lock_owned().await);
        }
        tracing::debug!(count = guards.len(), "user locks acquired");
        LockScope {
            _event: event.guard,
            users: guards,
        }
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.slots.lock().map.len()
    }
}

impl Default for KeyedLocks {
    fn default() -> Self {
        Self::new(1024)
    }
}
