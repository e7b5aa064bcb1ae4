//! Position persistence port trait.

use crate::domain::error::SwingtraderError;
use crate::domain::position::Position;

/// Durable keyed repository of positions, one record per symbol per trade.
/// The trait is synchronous; the monitor holds the store behind a mutex so
/// all writes are serialized by construction.
pub trait PositionStore: Send {
    /// The currently OPEN position for a symbol, if any.
    fn open_position(&self, symbol: &str) -> Option<Position>;

    fn open_positions(&self) -> Vec<Position>;

    /// All records including closed ones, for audit and reporting.
    fn all_positions(&self) -> Vec<Position>;

    /// Insert or replace a record and persist the whole store. A failure
    /// here means the mutation did not land; the caller must treat the tick
    /// as poisoned for new entries.
    fn commit(&mut self, position: Position) -> Result<(), SwingtraderError>;
}
