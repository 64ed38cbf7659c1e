//! Pure credit reconciliation.
//!
//! A class event holds one credit per attendee. Moving an event from one
//! `(category, attendees)` state to another therefore amounts to refunding
//! every user who stops holding a charged seat and charging every user who
//! starts holding one. Creation and deletion are transitions from and to the
//! absent state; enrollment and withdrawal are single-seat transitions.
//!
//! Nothing in this module touches a store. The engine feeds it snapshots
//! taken under lock and commits whatever it returns.

use std::collections::HashSet;

use crate::core::model::{BalanceAdjustment, Event, EventCategory, UserId};
use crate::core::{LedgerError, LedgerResult};

/// Ledger-relevant projection of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventState {
    /// Event category.
    pub category: EventCategory,
    /// Attendees in display order.
    pub attendees: Vec<UserId>,
}

impl EventState {
    /// Build a state.
    pub fn new<I, U>(category: EventCategory, attendees: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserId>,
    {
        Self {
            category,
            attendees: attendees.into_iter().map(Into::into).collect(),
        }
    }

    /// Attendees currently holding a charged seat.
    fn charged(&self) -> &[UserId] {
        if self.category.draws_credits() {
            &self.attendees
        } else {
            &[]
        }
    }
}

impl From<&Event> for EventState {
    fn from(event: &Event) -> Self {
        Self {
            category: event.category,
            attendees: event.attendees.clone(),
        }
    }
}

/// Compute the adjustments that move the ledger from `old` to `new`.
///
/// `None` stands for "no event". Refunds come first, in old attendee order,
/// followed by charges in new attendee order. Users holding a seat in both
/// states are untouched.
pub fn reconcile(old: Option<&EventState>, new: Option<&EventState>) -> Vec<BalanceAdjustment> {
    let before = old.map(EventState::charged).unwrap_or_default();
    let after = new.map(EventState::charged).unwrap_or_default();

    let before_set: HashSet<&UserId> = before.iter().collect();
    let after_set: HashSet<&UserId> = after.iter().collect();

    let refunds = before
        .iter()
        .filter(|id| !after_set.contains(id))
        .cloned()
        .map(BalanceAdjustment::refund);
    let charges = after
        .iter()
        .filter(|id| !before_set.contains(id))
        .cloned()
        .map(BalanceAdjustment::charge);

    refunds.chain(charges).collect()
}

/// A state change of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    before: Option<EventState>,
    after: Option<EventState>,
}

impl Transition {
    /// Event comes into existence.
    pub const fn create(state: EventState) -> Self {
        Self {
            before: None,
            after: Some(state),
        }
    }

    /// Event is replaced by a new version.
    pub const fn update(old: EventState, new: EventState) -> Self {
        Self {
            before: Some(old),
            after: Some(new),
        }
    }

    /// Event is removed, releasing every seat.
    pub const fn delete(old: EventState) -> Self {
        Self {
            before: Some(old),
            after: None,
        }
    }

    /// `user` takes a seat. Fails when already seated.
    pub fn enroll(state: EventState, user: &UserId) -> LedgerResult<Self> {
        if state.attendees.contains(user) {
            return Err(LedgerError::AlreadyEnrolled(user.clone()));
        }
        let mut after = state.clone();
        after.attendees.push(user.clone());
        Ok(Self {
            before: Some(state),
            after: Some(after),
        })
    }

    /// `user` gives up a seat. Fails when not seated.
    pub fn withdraw(state: EventState, user: &UserId) -> LedgerResult<Self> {
        if !state.attendees.contains(user) {
            return Err(LedgerError::NotEnrolled(user.clone()));
        }
        let mut after = state.clone();
        after.attendees.retain(|id| id != user);
        Ok(Self {
            before: Some(state),
            after: Some(after),
        })
    }

    /// State before the transition.
    pub const fn before(&self) -> Option<&EventState> {
        self.before.as_ref()
    }

    /// State after the transition.
    pub const fn after(&self) -> Option<&EventState> {
        self.after.as_ref()
    }

    /// Adjustments implied by this transition.
    pub fn adjustments(&self) -> Vec<BalanceAdjustment> {
        reconcile(self.before.as_ref(), self.after.as_ref())
    }
}

/// Charges contained in `adjustments`.
pub fn charges(adjustments: &[BalanceAdjustment]) -> impl Iterator<Item = &BalanceAdjustment> {
    adjustments.iter().filter(|a| a.is_charge())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class<const N: usize>(ids: [&str; N]) -> EventState {
        EventState::new(EventCategory::Class, ids)
    }

    fn other<const N: usize>(ids: [&str; N]) -> EventState {
        EventState::new(EventCategory::Appointment, ids)
    }

    fn adj(id: &str, delta: i64) -> BalanceAdjustment {
        BalanceAdjustment {
            user_id: UserId::new(id),
            delta,
        }
    }

    #[test]
    fn class_to_other_refunds_everyone() {
        let deltas = reconcile(Some(&class(["a", "b"])), Some(&other(["a", "b"])));
        assert_eq!(deltas, vec![adj("a", 1), adj("b", 1)]);
    }

    #[test]
    fn other_to_class_charges_everyone() {
        let deltas = reconcile(Some(&other(["a"])), Some(&class(["b", "c"])));
        assert_eq!(deltas, vec![adj("b", -1), adj("c", -1)]);
    }

    #[test]
    fn class_to_class_diffs_attendees() {
        let deltas = reconcile(Some(&class(["a", "b"])), Some(&class(["b", "c"])));
        assert_eq!(deltas, vec![adj("a", 1), adj("c", -1)]);
    }

    #[test]
    fn other_to_other_is_free() {
        let deltas = reconcile(Some(&other(["a"])), Some(&other(["b", "c"])));
        assert!(deltas.is_empty());
    }

    #[test]
    fn reorder_is_free() {
        let deltas = reconcile(Some(&class(["a", "b"])), Some(&class(["b", "a"])));
        assert!(deltas.is_empty());
    }

    #[test]
    fn create_and_delete_mirror_each_other() {
        let state = class(["a", "b"]);
        let created = Transition::create(state.clone()).adjustments();
        let deleted = Transition::delete(state).adjustments();
        assert_eq!(created, vec![adj("a", -1), adj("b", -1)]);
        assert_eq!(deleted, vec![adj("a", 1), adj("b", 1)]);
    }

    #[test]
    fn enroll_charges_one_seat() {
        let t = Transition::enroll(class(["a"]), &UserId::new("b")).unwrap();
        assert_eq!(t.adjustments(), vec![adj("b", -1)]);
        assert_eq!(t.after().unwrap().attendees.len(), 2);
    }

    #[test]
    fn enroll_into_non_class_is_free() {
        let t = Transition::enroll(other([]), &UserId::new("b")).unwrap();
        assert!(t.adjustments().is_empty());
    }

    #[test]
    fn enroll_twice_is_rejected() {
        let err = Transition::enroll(class(["a"]), &UserId::new("a")).unwrap_err();
        assert_eq!(err, LedgerError::AlreadyEnrolled(UserId::new("a")));
    }

    #[test]
    fn withdraw_refunds_one_seat() {
        let t = Transition::withdraw(class(["a", "b"]), &UserId::new("a")).unwrap();
        assert_eq!(t.adjustments(), vec![adj("a", 1)]);
        assert_eq!(t.after().unwrap().attendees, vec![UserId::new("b")]);
    }

    #[test]
    fn withdraw_absent_is_rejected() {
        let err = Transition::withdraw(class(["a"]), &UserId::new("z")).unwrap_err();
        assert_eq!(err, LedgerError::NotEnrolled(UserId::new("z")));
    }

    #[test]
    fn net_delta_matches_seat_change() {
        let old = class(["a", "b", "c"]);
        let new = class(["c", "d"]);
        let net: i64 = reconcile(Some(&old), Some(&new)).iter().map(|a| a.delta).sum();
        assert_eq!(net, -(2 - 3));
    }
}
