//! Cadence adapters - Infrastructure implementations
//!
//! This crate contains concrete implementations of the ports defined in cadence-core.

pub mod sqlite;

pub use sqlite::SqliteFocusPlanRepository;
