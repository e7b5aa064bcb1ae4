//! Domain error types and exit-code mapping.

/// Top-level error type for swingtrader.
///
/// Per-symbol failures (`DataUnavailable`, `StaleData`, `RiskViolation`,
/// `OrderPlacement`) are non-fatal: the monitor skips the symbol for the tick
/// and retries on the next one. Store-level failures (`StoreCorruption`,
/// `Persist`) halt new entries until resolved.
#[derive(Debug, thiserror::Error)]
pub enum SwingtraderError {
    #[error("no usable bar data for {symbol}: have {bars} bars, need {minimum}")]
    DataUnavailable {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("stale data for {symbol}: last bar {last_bar} is older than {max_age_days} days")]
    StaleData {
        symbol: String,
        last_bar: chrono::NaiveDate,
        max_age_days: i64,
    },

    #[error("risk violation for {symbol}: {reason}")]
    RiskViolation { symbol: String, reason: String },

    #[error("order placement failed for {symbol}: {reason}")]
    OrderPlacement { symbol: String, reason: String },

    #[error("position store corrupt at {path}: {reason}")]
    StoreCorruption { path: String, reason: String },

    #[error("failed to persist position store: {reason}")]
    Persist { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SwingtraderError {
    /// Whether the failure is scoped to a single symbol and the batch
    /// should carry on.
    pub fn is_symbol_scoped(&self) -> bool {
        matches!(
            self,
            SwingtraderError::DataUnavailable { .. }
                | SwingtraderError::StaleData { .. }
                | SwingtraderError::RiskViolation { .. }
                | SwingtraderError::OrderPlacement { .. }
        )
    }
}

impl From<&SwingtraderError> for std::process::ExitCode {
    fn from(err: &SwingtraderError) -> Self {
        let code: u8 = match err {
            SwingtraderError::Io(_) => 1,
            SwingtraderError::ConfigParse { .. }
            | SwingtraderError::ConfigMissing { .. }
            | SwingtraderError::ConfigInvalid { .. } => 2,
            SwingtraderError::StoreCorruption { .. } | SwingtraderError::Persist { .. } => 3,
            SwingtraderError::OrderPlacement { .. } => 4,
            SwingtraderError::DataUnavailable { .. }
            | SwingtraderError::StaleData { .. }
            | SwingtraderError::RiskViolation { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
