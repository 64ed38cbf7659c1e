//! Configuration models for the engine, company rules, and timeouts.

pub mod engine;

pub use engine::EngineConfig;
