//! Identity resolution and the role/capability authorization gate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::model::{Role, UserId};
use crate::core::{LedgerError, LedgerResult};

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User the credential belongs to.
    pub user_id: UserId,
    /// Role of that user.
    pub role: Role,
}

impl Identity {
    /// Build an identity.
    pub fn new(user_id: impl Into<UserId>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

/// Action class checked by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Create, update, or delete events.
    ManageEvent,
    /// Enroll a user without the credit sufficiency check.
    ForceOverride,
    /// Enroll or withdraw oneself.
    EnrollSelf,
    /// Enroll or withdraw somebody else.
    EnrollOther,
    /// Skip company time-window and capacity rules.
    BypassEnrollmentPolicy,
}

/// Outcome of a capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Capability granted.
    Authorized,
    /// Capability refused.
    Denied,
}

/// Role × capability table.
pub const fn allows(role: Role, capability: Capability) -> bool {
    match (role, capability) {
        (_, Capability::EnrollSelf)
        | (Role::Professional, _)
        | (
            Role::Admin,
            Capability::ManageEvent | Capability::EnrollOther | Capability::BypassEnrollmentPolicy,
        ) => true,
        (Role::Admin, Capability::ForceOverride)
        | (
            Role::Client,
            Capability::ManageEvent
            | Capability::ForceOverride
            | Capability::EnrollOther
            | Capability::BypassEnrollmentPolicy,
        ) => false,
    }
}

/// Evaluate a capability for an identity.
pub const fn decide(identity: &Identity, capability: Capability) -> Decision {
    if allows(identity.role, capability) {
        Decision::Authorized
    } else {
        Decision::Denied
    }
}

/// Gate an operation: `Unauthenticated` without identity, `Forbidden` when denied.
pub fn authorize(identity: Option<&Identity>, capability: Capability) -> LedgerResult<()> {
    let identity = identity.ok_or(LedgerError::Unauthenticated)?;
    match decide(identity, capability) {
        Decision::Authorized => Ok(()),
        Decision::Denied => {
            tracing::debug!(
                user = %identity.user_id,
                role = ?identity.role,
                ?capability,
                "capability denied"
            );
            Err(LedgerError::Forbidden(format!(
                "{:?} role lacks {capability:?}",
                identity.role
            )))
        }
    }
}

/// Capability needed to act on `target`.
pub fn enrollment_capability(identity: &Identity, target: &UserId) -> Capability {
    if &identity.user_id == target {
        Capability::EnrollSelf
    } else {
        Capability::EnrollOther
    }
}

/// Bearer credential presented by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Parse an `Authorization` header value, with or without the `Bearer` scheme.
    pub fn from_authorization_header(header: Option<&str>) -> LedgerResult<Self> {
        let raw = header.map(str::trim).unwrap_or_default();
        let token = match raw.split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
            _ if raw.eq_ignore_ascii_case("bearer") => "",
            _ => raw,
        };
        if token.is_empty() {
            return Err(LedgerError::Unauthenticated);
        }
        Ok(Self(token.to_owned()))
    }

    /// Raw token.
    pub fn token(&self) -> &str {
        &self.0
    }
}

/// Resolves credentials into identities.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve `credential`, failing with `Unauthenticated` when unknown.
    async fn resolve(&self, credential: &Credential) -> LedgerResult<Identity>;
}
