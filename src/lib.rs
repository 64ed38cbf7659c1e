//! # Credit Ledger
//!
//! Keeps per-user class credit balances consistent with event attendance.
//!
//! Scheduled events carry a category and an attendee list. Attending a class
//! costs one credit; every other category is free. Whenever an event is
//! created, updated, deleted, or someone enrolls or withdraws, the engine
//! derives the balance adjustments from the before/after states and commits
//! the event write together with those adjustments.
//!
//! ## Core Problem Solved
//!
//! - **Conservation**: for any event, credits charged minus credits refunded
//!   equals the number of class attendees it currently holds.
//! - **No silent debt**: an ordinary operation never charges a user whose
//!   balance is already exhausted. Only professionals may force it.
//! - **Atomicity**: a rejected or failed operation changes nothing.
//! - **Races**: concurrent mutations that touch the same event or user are
//!   serialized, so two enrollments cannot both spend the last credit.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use credit_ledger::builders::build_engine;
//! use credit_ledger::config::EngineConfig;
//! use credit_ledger::core::{CallContext, EnrollmentRequest, EventCategory, EventDraft, Identity, Role, User};
//! use credit_ledger::infra::InMemoryStore;
//!
//! let store = Arc::new(InMemoryStore::with_users([User::new("c1", Role::Client, 3)]));
//! let built = build_engine(&EngineConfig::default(), store)?;
//!
//! let pro = CallContext::new(Identity::new("p1", Role::Professional));
//! let created = built
//!     .engine
//!     .create_event(&pro, EventDraft::new(EventCategory::Class, "acme", starts_at))
//!     .await?;
//!
//! let client = CallContext::new(Identity::new("c1", Role::Client));
//! built
//!     .engine
//!     .enroll(&client, &created.event_id, EnrollmentRequest::for_self())
//!     .await?;
//! ```
//!
//! ## Layout
//!
//! - `core`: model, authorization gate, reconciliation rules, locks, engine.
//! - `config`: engine configuration and company rules.
//! - `builders`: wiring from configuration.
//! - `infra`: in-memory store and identity resolver.
//! - `runtime`: request/response surface for transports.
//! - `util`: clock and tracing setup.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Ledger domain: model, authorization, reconciliation, and orchestration.
pub mod core;
/// Configuration models for the engine, company rules, and timeouts.
pub mod config;
/// Builders to construct the engine from configuration.
pub mod builders;
/// Infrastructure adapters for storage backends and identity resolution.
pub mod infra;
/// Operation surface for transports.
pub mod runtime;
/// Shared utilities.
pub mod util;
