//! Bar classification: LONG_ENTRY / EXIT / WAIT.
//!
//! Pure function of the latest bar series; no memory across calls. Whether a
//! classification is *acted on* depends on the position store: an entry only
//! matters for a flat symbol, an exit only for an open one.

use crate::domain::indicator::{roc, rsi, sma};
use crate::domain::ohlcv::{self, Bar};
use crate::domain::scorer::{composite_momentum, ScorerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    LongEntry,
    Exit,
    Wait,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub rsi_len: usize,
    pub trend_sma_len: usize,
    /// Current volume must exceed this fraction of its average to confirm
    /// participation on an entry.
    pub participation_window: usize,
    pub participation_fraction: f64,
    /// Blow-off-top guard: short ROC more than `crash_ratio` times the
    /// medium ROC while also above `crash_roc_floor` percent.
    pub crash_ratio: f64,
    pub crash_roc_floor: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig {
            rsi_len: 14,
            trend_sma_len: 200,
            participation_window: 20,
            participation_fraction: 0.75,
            crash_ratio: 2.0,
            crash_roc_floor: 20.0,
        }
    }
}

/// Indicator snapshot used by the classification, exposed for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalAnalysis {
    pub close: f64,
    pub rsi: f64,
    pub composite_momentum: f64,
    pub trend_sma: f64,
    pub participation: bool,
    pub crash_risk: bool,
}

pub fn analyze(bars: &[Bar], cfg: &SignalConfig, scorer: &ScorerConfig) -> SignalAnalysis {
    let closes = ohlcv::closes(bars);
    let volumes = ohlcv::volumes(bars);
    let n = closes.len();

    let roc_short = roc(&closes, scorer.short_roc);
    let roc_med = roc(&closes, scorer.med_roc);
    let crash_risk = roc_short > cfg.crash_ratio * roc_med && roc_short > cfg.crash_roc_floor;

    let avg_volume = sma(&volumes, cfg.participation_window);
    let participation = volumes[n - 1] > cfg.participation_fraction * avg_volume;

    SignalAnalysis {
        close: closes[n - 1],
        rsi: rsi(&closes, cfg.rsi_len),
        composite_momentum: composite_momentum(&closes, scorer),
        trend_sma: sma(&closes, cfg.trend_sma_len),
        participation,
        crash_risk,
    }
}

/// Classify the latest bar.
///
/// Exit conditions are checked first: a bar that is both extended (crash
/// guard) and otherwise bullish must classify as Exit, not Wait.
pub fn classify(bars: &[Bar], cfg: &SignalConfig, scorer: &ScorerConfig) -> Signal {
    let a = analyze(bars, cfg, scorer);

    if a.rsi < 50.0 || a.composite_momentum < 0.0 || a.close < a.trend_sma || a.crash_risk {
        return Signal::Exit;
    }

    if a.rsi > 50.0 && a.composite_momentum > 0.0 && a.close > a.trend_sma && a.participation {
        return Signal::LongEntry;
    }

    Signal::Wait
}
