//! Domain records: users, events, and the typed payloads that mutate them.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::LedgerError;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

string_id!(
    /// Identifier of a user record.
    UserId
);
string_id!(
    /// Identifier of an event record.
    EventId
);
string_id!(
    /// Identifier of the company owning an event.
    CompanyId
);

impl EventId {
    /// Fresh random identifier for a new event.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// End customer holding class credits.
    Client,
    /// Staff member running events.
    Professional,
    /// Company administrator.
    Admin,
}

/// Category of an event. Only classes draw credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Group class; one credit per attendee.
    Class,
    /// One-to-one appointment.
    Appointment,
    /// Blocked time off.
    Vacation,
}

impl EventCategory {
    /// Whether attendance in this category consumes credits.
    pub const fn draws_credits(self) -> bool {
        matches!(self, Self::Class)
    }
}

/// User record as seen by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Role used by the authorization gate.
    pub role: Role,
    /// Remaining prepaid class credits.
    pub class_credits: i64,
}

impl User {
    /// Build a user with a starting balance.
    pub fn new(id: impl Into<UserId>, role: Role, class_credits: i64) -> Self {
        Self {
            id: id.into(),
            role,
            class_credits,
        }
    }
}

/// Stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Category driving ledger effects.
    pub category: EventCategory,
    /// Enrolled users, unique, in enrollment order.
    pub attendees: Vec<UserId>,
    /// Professionals running the event.
    #[serde(default)]
    pub professionals: Vec<UserId>,
    /// Owning company, used by enrollment policies.
    pub company_id: CompanyId,
    /// Start time in milliseconds since epoch.
    pub starts_at_ms: u128,
    /// Duration in minutes.
    pub duration_mins: u32,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Write counter; bumped by the store on every replace.
    #[serde(default)]
    pub version: u64,
}

impl Event {
    /// Whether `user` is enrolled.
    pub fn has_attendee(&self, user: &UserId) -> bool {
        self.attendees.contains(user)
    }

    /// Minutes from `now_ms` until the event starts; negative once started.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn minutes_until_start(&self, now_ms: u128) -> i64 {
        let delta = self.starts_at_ms as i128 - now_ms as i128;
        (delta / 60_000) as i64
    }
}

/// Payload for creating an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Event category.
    pub category: EventCategory,
    /// Initial attendees.
    #[serde(default)]
    pub attendees: Vec<UserId>,
    /// Professionals running the event.
    #[serde(default)]
    pub professionals: Vec<UserId>,
    /// Owning company.
    pub company_id: CompanyId,
    /// Start time in milliseconds since epoch.
    pub starts_at_ms: u128,
    /// Duration in minutes.
    pub duration_mins: u32,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl EventDraft {
    /// Draft with no attendees.
    pub fn new(category: EventCategory, company_id: impl Into<CompanyId>, starts_at_ms: u128) -> Self {
        Self {
            category,
            attendees: Vec::new(),
            professionals: Vec::new(),
            company_id: company_id.into(),
            starts_at_ms,
            duration_mins: 60,
            notes: None,
        }
    }

    /// Replace the attendee list.
    #[must_use]
    pub fn with_attendees<I, U>(mut self, attendees: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserId>,
    {
        self.attendees = attendees.into_iter().map(Into::into).collect();
        self
    }

    /// Reject malformed drafts before they reach the engine.
    pub fn validate(&self) -> Result<(), LedgerError> {
        ensure_unique(&self.attendees)?;
        if self.duration_mins == 0 {
            return Err(LedgerError::InvalidRequest(
                "duration_mins must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Materialize the draft as a new event record.
    pub fn into_event(self, id: EventId) -> Event {
        Event {
            id,
            category: self.category,
            attendees: self.attendees,
            professionals: self.professionals,
            company_id: self.company_id,
            starts_at_ms: self.starts_at_ms,
            duration_mins: self.duration_mins,
            notes: self.notes,
            version: 0,
        }
    }
}

/// Partial update of an event. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    /// New category.
    #[serde(default)]
    pub category: Option<EventCategory>,
    /// Full replacement attendee list.
    #[serde(default)]
    pub attendees: Option<Vec<UserId>>,
    /// Full replacement professional list.
    #[serde(default)]
    pub professionals: Option<Vec<UserId>>,
    /// New start time.
    #[serde(default)]
    pub starts_at_ms: Option<u128>,
    /// New duration.
    #[serde(default)]
    pub duration_mins: Option<u32>,
    /// New notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl EventPatch {
    /// Patch that only changes the category.
    pub fn category(category: EventCategory) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    /// Patch that only replaces the attendee list.
    pub fn attendees<I, U>(attendees: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserId>,
    {
        Self {
            attendees: Some(attendees.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Reject malformed patches before they reach the engine.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if let Some(attendees) = &self.attendees {
            ensure_unique(attendees)?;
        }
        if self.duration_mins == Some(0) {
            return Err(LedgerError::InvalidRequest(
                "duration_mins must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Produce the patched copy of `event`. Identity and version are kept.
    pub fn apply_to(&self, event: &Event) -> Event {
        let mut next = event.clone();
        if let Some(category) = self.category {
            next.category = category;
        }
        if let Some(attendees) = &self.attendees {
            next.attendees.clone_from(attendees);
        }
        if let Some(professionals) = &self.professionals {
            next.professionals.clone_from(professionals);
        }
        if let Some(starts_at_ms) = self.starts_at_ms {
            next.starts_at_ms = starts_at_ms;
        }
        if let Some(duration_mins) = self.duration_mins {
            next.duration_mins = duration_mins;
        }
        if self.notes.is_some() {
            next.notes.clone_from(&self.notes);
        }
        next
    }
}

fn ensure_unique(attendees: &[UserId]) -> Result<(), LedgerError> {
    let mut seen = HashSet::with_capacity(attendees.len());
    for id in attendees {
        if !seen.insert(id) {
            return Err(LedgerError::InvalidRequest(format!(
                "attendee {id} listed more than once"
            )));
        }
    }
    Ok(())
}

/// Signed change to one user's credit balance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BalanceAdjustment {
    /// Affected user.
    pub user_id: UserId,
    /// Signed change; negative charges, positive refunds.
    pub delta: i64,
}

impl BalanceAdjustment {
    /// One-credit charge.
    pub fn charge(user_id: UserId) -> Self {
        Self { user_id, delta: -1 }
    }

    /// One-credit refund.
    pub fn refund(user_id: UserId) -> Self {
        Self { user_id, delta: 1 }
    }

    /// Whether this adjustment draws credits.
    pub const fn is_charge(&self) -> bool {
        self.delta < 0
    }
}

/// Operation carried out by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Event creation.
    Create,
    /// Event update.
    Update,
    /// Event deletion.
    Delete,
    /// Attendee enrollment.
    Enroll,
    /// Attendee withdrawal.
    Withdraw,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Enroll => "enroll",
            Self::Withdraw => "withdraw",
        };
        f.write_str(name)
    }
}

/// Result of a committed engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// Event the operation targeted.
    pub event_id: EventId,
    /// Operation performed.
    pub operation: Operation,
    /// Adjustments the store actually applied.
    pub applied_adjustments: Vec<BalanceAdjustment>,
    /// Stored event after the commit; `None` after a delete.
    pub event_after: Option<Event>,
}

impl OperationOutcome {
    /// Sum of all applied deltas.
    pub fn net_delta(&self) -> i64 {
        self.applied_adjustments.iter().map(|a| a.delta).sum()
    }
}
