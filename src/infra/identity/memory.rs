//! Token-table identity resolver for tests and development.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::auth::{Credential, Identity, IdentityResolver};
use crate::core::{LedgerError, LedgerResult};

/// Resolves bearer tokens from a fixed table.
#[derive(Default)]
pub struct InMemoryIdentityResolver {
    tokens: RwLock<HashMap<String, Identity>>,
}

impl InMemoryIdentityResolver {
    /// Empty resolver; every token is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `token` to `identity`, replacing any previous mapping.
    pub fn register(&self, token: impl Into<String>, identity: Identity) {
        self.tokens.write().insert(token.into(), identity);
    }

    /// Forget `token`.
    pub fn revoke(&self, token: &str) -> Option<Identity> {
        self.tokens.write().remove(token)
    }
}

#[async_trait]
impl IdentityResolver for InMemoryIdentityResolver {
    async fn resolve(&self, credential: &Credential) -> LedgerResult<Identity> {
        self.tokens
            .read()
            .get(credential.token())
            .cloned()
            .ok_or(LedgerError::Unauthenticated)
    }
}
