//! Infrastructure adapters for storage backends and identity resolution.

pub mod identity;
pub mod store;
pub use identity::InMemoryIdentityResolver;
pub use store::InMemoryStore;
