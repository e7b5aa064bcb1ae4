//! In-memory position store for tests and dry runs.

use std::collections::BTreeMap;

use crate::domain::error::SwingtraderError;
use crate::domain::position::Position;
use crate::ports::store_port::PositionStore;

#[derive(Default)]
pub struct MemoryPositionStore {
    positions: BTreeMap<String, Position>,
    closed: Vec<Position>,
    fail_commits: bool,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail, to exercise the persist-failure
    /// path in the monitor.
    pub fn set_fail_commits(&mut self, fail: bool) {
        self.fail_commits = fail;
    }
}

impl PositionStore for MemoryPositionStore {
    fn open_position(&self, symbol: &str) -> Option<Position> {
        self.positions
            .get(symbol)
            .filter(|p| p.is_open())
            .cloned()
    }

    fn open_positions(&self) -> Vec<Position> {
        self.positions
            .values()
            .filter(|p| p.is_open())
            .cloned()
            .collect()
    }

    fn all_positions(&self) -> Vec<Position> {
        self.positions
            .values()
            .chain(self.closed.iter())
            .cloned()
            .collect()
    }

    fn commit(&mut self, position: Position) -> Result<(), SwingtraderError> {
        if self.fail_commits {
            return Err(SwingtraderError::Persist {
                reason: "simulated persist failure".to_string(),
            });
        }
        let symbol = position.symbol.clone();
        if let Some(previous) = self.positions.insert(symbol, position) {
            if !previous.is_open()
                && self
                    .positions
                    .get(&previous.symbol)
                    .is_some_and(|p| p.is_open())
            {
                self.closed.push(previous);
            }
        }
        Ok(())
    }
}
