//! Typed settings assembled from the INI config.
//!
//! Every knob has a default matching the shipped strategy, so an empty file
//! is a valid config. Only the symbol universe is mandatory: monitoring
//! nothing is almost certainly a broken deployment, not an intent.

use std::path::PathBuf;

use crate::domain::error::SwingtraderError;
use crate::domain::position::PositionConfig;
use crate::domain::risk::RiskConfig;
use crate::domain::scorer::ScorerConfig;
use crate::domain::signal::SignalConfig;
use crate::ports::config_port::ConfigPort;

/// Loop cadence and per-tick resource limits.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub tick_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    /// Bound on concurrent bar fetches, for provider rate limits.
    pub max_concurrent_fetches: usize,
    pub lookback_bars: usize,
    /// Last bar older than this many days is treated as stale.
    pub max_stale_days: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            tick_interval_secs: 300,
            fetch_timeout_secs: 30,
            max_concurrent_fetches: 4,
            lookback_bars: 252,
            max_stale_days: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub symbols: Vec<String>,
    pub benchmark: String,
    pub monitor: MonitorConfig,
    pub scorer: ScorerConfig,
    pub signal: SignalConfig,
    pub position: PositionConfig,
    pub risk: RiskConfig,
    pub store_path: PathBuf,
    pub feed_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Settings {
    pub fn from_config(cfg: &dyn ConfigPort) -> Result<Self, SwingtraderError> {
        let symbols_raw =
            cfg.get_string("monitor", "symbols")
                .ok_or_else(|| SwingtraderError::ConfigMissing {
                    section: "monitor".to_string(),
                    key: "symbols".to_string(),
                })?;
        let symbols: Vec<String> = symbols_raw
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            return Err(SwingtraderError::ConfigInvalid {
                section: "monitor".to_string(),
                key: "symbols".to_string(),
                reason: "empty symbol list".to_string(),
            });
        }

        let monitor_defaults = MonitorConfig::default();
        let monitor = MonitorConfig {
            tick_interval_secs: cfg.get_int(
                "monitor",
                "tick_interval_secs",
                monitor_defaults.tick_interval_secs as i64,
            ) as u64,
            fetch_timeout_secs: cfg.get_int(
                "monitor",
                "fetch_timeout_secs",
                monitor_defaults.fetch_timeout_secs as i64,
            ) as u64,
            max_concurrent_fetches: cfg.get_int(
                "monitor",
                "max_concurrent_fetches",
                monitor_defaults.max_concurrent_fetches as i64,
            ) as usize,
            lookback_bars: cfg.get_int(
                "monitor",
                "lookback_bars",
                monitor_defaults.lookback_bars as i64,
            ) as usize,
            max_stale_days: cfg.get_int(
                "monitor",
                "max_stale_days",
                monitor_defaults.max_stale_days,
            ),
        };

        let scorer_defaults = ScorerConfig::default();
        let scorer = ScorerConfig {
            tier2_score: cfg.get_double("scorer", "tier2_score", scorer_defaults.tier2_score),
            tier3_score: cfg.get_double("scorer", "tier3_score", scorer_defaults.tier3_score),
            min_dollar_volume: cfg.get_double(
                "scorer",
                "min_dollar_volume",
                scorer_defaults.min_dollar_volume,
            ),
            min_price: cfg.get_double("scorer", "min_price", scorer_defaults.min_price),
            min_rs_percentile: cfg.get_double(
                "scorer",
                "min_rs_percentile",
                scorer_defaults.min_rs_percentile,
            ),
            min_rsi: cfg.get_double("scorer", "min_rsi", scorer_defaults.min_rsi),
            max_rsi: cfg.get_double("scorer", "max_rsi", scorer_defaults.max_rsi),
            ..scorer_defaults
        };

        let signal_defaults = SignalConfig::default();
        let signal = SignalConfig {
            participation_fraction: cfg.get_double(
                "signal",
                "participation_fraction",
                signal_defaults.participation_fraction,
            ),
            crash_ratio: cfg.get_double("signal", "crash_ratio", signal_defaults.crash_ratio),
            crash_roc_floor: cfg.get_double(
                "signal",
                "crash_roc_floor",
                signal_defaults.crash_roc_floor,
            ),
            ..signal_defaults
        };

        let position_defaults = PositionConfig::default();
        let position = PositionConfig {
            stop_fraction: cfg.get_double(
                "position",
                "stop_fraction",
                position_defaults.stop_fraction,
            ),
            partial_fraction: cfg.get_double(
                "position",
                "partial_fraction",
                position_defaults.partial_fraction,
            ),
            trail_stop_fraction: cfg.get_double(
                "position",
                "trail_stop_fraction",
                position_defaults.trail_stop_fraction,
            ),
            partial_r_multiple: cfg.get_double(
                "position",
                "partial_r_multiple",
                position_defaults.partial_r_multiple,
            ),
            use_trailing_stop: cfg.get_bool(
                "position",
                "use_trailing_stop",
                position_defaults.use_trailing_stop,
            ),
        };

        let risk_defaults = RiskConfig::default();
        let risk = RiskConfig {
            max_risk_fraction_per_trade: cfg.get_double(
                "risk",
                "max_risk_fraction_per_trade",
                risk_defaults.max_risk_fraction_per_trade,
            ),
            max_concurrent_positions: cfg.get_int(
                "risk",
                "max_concurrent_positions",
                risk_defaults.max_concurrent_positions as i64,
            ) as usize,
            ..risk_defaults
        };

        Ok(Settings {
            symbols,
            benchmark: cfg
                .get_string("monitor", "benchmark")
                .unwrap_or_else(|| "SPY".to_string()),
            monitor,
            scorer,
            signal,
            position,
            risk,
            store_path: cfg
                .get_string("store", "path")
                .unwrap_or_else(|| "positions.json".to_string())
                .into(),
            feed_path: cfg
                .get_string("feed", "path")
                .unwrap_or_else(|| "candidates.json".to_string())
                .into(),
            data_dir: cfg
                .get_string("data", "dir")
                .unwrap_or_else(|| "data".to_string())
                .into(),
        })
    }
}
