//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod scorer;
pub mod signal;
pub mod position;
pub mod risk;
pub mod error;
