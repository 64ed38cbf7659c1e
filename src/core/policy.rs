//! Enrollment policy hooks.
//!
//! Policies run after the event is loaded and before any credit check. They
//! see the stored event and the caller-independent target user; callers with
//! [`Capability::BypassEnrollmentPolicy`](crate::core::Capability) skip them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::model::{CompanyId, Event, EventCategory, UserId};
use crate::core::{LedgerError, LedgerResult};

/// Extension point for enrollment and withdrawal rules.
pub trait EnrollmentPolicy: Send + Sync {
    /// Decide whether `user` may join `event` at `now_ms`.
    fn check_enroll(&self, event: &Event, user: &UserId, now_ms: u128) -> LedgerResult<()>;
    /// Decide whether `user` may leave `event` at `now_ms`.
    fn check_withdraw(&self, event: &Event, user: &UserId, now_ms: u128) -> LedgerResult<()>;
}

/// Policy that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenPolicy;

impl EnrollmentPolicy for OpenPolicy {
    fn check_enroll(&self, _event: &Event, _user: &UserId, _now_ms: u128) -> LedgerResult<()> {
        Ok(())
    }

    fn check_withdraw(&self, _event: &Event, _user: &UserId, _now_ms: u128) -> LedgerResult<()> {
        Ok(())
    }
}

/// Scheduling rules configured per company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySettings {
    /// Seats per class.
    #[serde(default)]
    pub max_class_assistants: Option<usize>,
    /// An empty class closes for enrollment this many minutes before start.
    #[serde(default)]
    pub class_block_mins: Option<i64>,
    /// Withdrawal closes this many minutes before start.
    #[serde(default)]
    pub class_unenroll_mins: Option<i64>,
}

/// Company time-window and capacity rules.
#[derive(Debug, Clone, Default)]
pub struct CompanyPolicy {
    companies: HashMap<CompanyId, CompanySettings>,
}

impl CompanyPolicy {
    /// Build from per-company settings.
    pub const fn new(companies: HashMap<CompanyId, CompanySettings>) -> Self {
        Self { companies }
    }

    /// Register or replace the settings of one company.
    #[must_use]
    pub fn with_company(mut self, id: impl Into<CompanyId>, settings: CompanySettings) -> Self {
        self.companies.insert(id.into(), settings);
        self
    }

    fn settings(&self, event: &Event) -> Option<&CompanySettings> {
        self.companies.get(&event.company_id)
    }
}

impl EnrollmentPolicy for CompanyPolicy {
    fn check_enroll(&self, event: &Event, _user: &UserId, now_ms: u128) -> LedgerResult<()> {
        let Some(settings) = self.settings(event) else {
            return Ok(());
        };
        if event.category != EventCategory::Class {
            return Ok(());
        }
        if let Some(block) = settings.class_block_mins {
            if event.attendees.is_empty() && event.minutes_until_start(now_ms) < block {
                return Err(LedgerError::PolicyViolation("class blocked".into()));
            }
        }
        if let Some(max) = settings.max_class_assistants {
            if event.attendees.len() >= max {
                return Err(LedgerError::PolicyViolation("class full".into()));
            }
        }
        Ok(())
    }

    fn check_withdraw(&self, event: &Event, _user: &UserId, now_ms: u128) -> LedgerResult<()> {
        let Some(settings) = self.settings(event) else {
            return Ok(());
        };
        if let Some(window) = settings.class_unenroll_mins {
            if event.minutes_until_start(now_ms) < window {
                return Err(LedgerError::PolicyViolation("too late to unenroll".into()));
            }
        }
        Ok(())
    }
}
