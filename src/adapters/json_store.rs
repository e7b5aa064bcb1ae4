//! JSON file position store.
//!
//! The whole store is one JSON document: a map of the latest record per
//! symbol plus an archive of records displaced by re-entry. Persistence is
//! write-new-then-rename so a crash mid-write leaves the previous snapshot
//! intact; losing a partial-exit flag or a stop price would mean duplicate
//! partial exits or missed stops on restart.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::error::SwingtraderError;
use crate::domain::position::Position;
use crate::ports::store_port::PositionStore;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    /// Latest record per symbol, OPEN or CLOSED.
    positions: BTreeMap<String, Position>,
    /// Closed records displaced by a later re-entry, kept for audit.
    #[serde(default)]
    closed: Vec<Position>,
}

pub struct JsonPositionStore {
    path: PathBuf,
    snapshot: Snapshot,
}

impl JsonPositionStore {
    /// Load the store from disk. A missing file is a fresh store. A file
    /// that fails to parse fails closed: the corrupt file is moved aside,
    /// a critical alert is logged, and the store starts empty rather than
    /// fabricating positions.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SwingtraderError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Ok(Self {
                path,
                snapshot: Snapshot::default(),
            });
        }

        let content = fs::read_to_string(&path)?;
        match serde_json::from_str::<Snapshot>(&content) {
            Ok(snapshot) => Ok(Self { path, snapshot }),
            Err(e) => {
                let aside = path.with_extension("json.corrupt");
                error!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "position store corrupt; starting empty"
                );
                fs::rename(&path, &aside)?;
                Ok(Self {
                    path,
                    snapshot: Snapshot::default(),
                })
            }
        }
    }

    fn persist(&self) -> Result<(), SwingtraderError> {
        let json = serde_json::to_string_pretty(&self.snapshot).map_err(|e| {
            SwingtraderError::Persist {
                reason: format!("serialize: {e}"),
            }
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| SwingtraderError::Persist {
            reason: format!("write {}: {e}", tmp.display()),
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| SwingtraderError::Persist {
            reason: format!("rename into {}: {e}", self.path.display()),
        })
    }
}

impl PositionStore for JsonPositionStore {
    fn open_position(&self, symbol: &str) -> Option<Position> {
        self.snapshot
            .positions
            .get(symbol)
            .filter(|p| p.is_open())
            .cloned()
    }

    fn open_positions(&self) -> Vec<Position> {
        self.snapshot
            .positions
            .values()
            .filter(|p| p.is_open())
            .cloned()
            .collect()
    }

    fn all_positions(&self) -> Vec<Position> {
        self.snapshot
            .positions
            .values()
            .chain(self.snapshot.closed.iter())
            .cloned()
            .collect()
    }

    fn commit(&mut self, position: Position) -> Result<(), SwingtraderError> {
        let symbol = position.symbol.clone();
        if let Some(previous) = self.snapshot.positions.insert(symbol, position) {
            // Re-entry displaces the prior closed record into the archive.
            if !previous.is_open()
                && self
                    .snapshot
                    .positions
                    .get(&previous.symbol)
                    .is_some_and(|p| p.is_open())
            {
                self.snapshot.closed.push(previous);
            }
        }
        self.persist()
    }
}
