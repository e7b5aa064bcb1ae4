//! CSV file bar-series adapter.
//!
//! One file per symbol (`<DIR>/<SYMBOL>.csv`, columns
//! date,open,high,low,close,volume). Used for paper trading and offline
//! validation; a live deployment substitutes a network-backed provider
//! behind the same port.
//!
//! Any per-symbol problem (missing file, malformed row) maps to
//! [`SwingtraderError::DataUnavailable`]: the monitor skips the symbol for
//! the tick and carries on with the batch.

use crate::domain::error::SwingtraderError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::BarProvider;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::warn;

pub struct CsvBarAdapter {
    base_path: PathBuf,
}

impl CsvBarAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    fn unavailable(symbol: &str) -> SwingtraderError {
        SwingtraderError::DataUnavailable {
            symbol: symbol.to_string(),
            bars: 0,
            minimum: 0,
        }
    }

    fn parse_row(record: &csv::StringRecord) -> Option<Bar> {
        let date = NaiveDate::parse_from_str(record.get(0)?, "%Y-%m-%d").ok()?;
        Some(Bar {
            date,
            open: record.get(1)?.parse().ok()?,
            high: record.get(2)?.parse().ok()?,
            low: record.get(3)?.parse().ok()?,
            close: record.get(4)?.parse().ok()?,
            volume: record.get(5)?.parse().ok()?,
        })
    }

    fn read_bars(&self, symbol: &str) -> Result<Vec<Bar>, SwingtraderError> {
        let path = self.csv_path(symbol);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            warn!(symbol, path = %path.display(), error = %e, "bar file unreadable");
            Self::unavailable(symbol)
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| {
                warn!(symbol, error = %e, "CSV parse error");
                Self::unavailable(symbol)
            })?;
            let bar = Self::parse_row(&record).ok_or_else(|| {
                warn!(symbol, row = ?record, "malformed bar row");
                Self::unavailable(symbol)
            })?;
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

#[async_trait]
impl BarProvider for CsvBarAdapter {
    async fn fetch_bars(
        &self,
        symbol: &str,
        lookback_bars: usize,
    ) -> Result<Vec<Bar>, SwingtraderError> {
        let mut bars = self.read_bars(symbol)?;
        if bars.len() > lookback_bars {
            bars.drain(..bars.len() - lookback_bars);
        }
        Ok(bars)
    }
}
