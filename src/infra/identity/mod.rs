//! Identity resolvers.

pub mod memory;

pub use memory::InMemoryIdentityResolver;
