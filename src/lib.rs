//! swingtrader — momentum candidate scanner and position-monitoring engine.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], orchestration in [`engine`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod engine;
pub mod cli;
