//! Candidate scoring: multi-horizon momentum, relative strength, tiering.

use serde::{Deserialize, Serialize};

use crate::domain::error::SwingtraderError;
use crate::domain::indicator::{roc, rsi, sma};
use crate::domain::ohlcv::{self, Bar};

/// Scoring parameters. Tier cut-offs and readiness floors are configuration
/// so they can be retuned from backtests without touching code.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorerConfig {
    pub short_roc: usize,
    pub med_roc: usize,
    pub long_roc: usize,
    /// Minimum bar count to score at all; shorter histories are skipped,
    /// never scored with defaults.
    pub min_bars: usize,
    /// Rolling window for the relative-strength percentile.
    pub rs_window: usize,
    pub volume_window: usize,
    pub structure_lookback: usize,
    pub momentum_cap: f64,
    pub rvol_cap: f64,
    pub tier2_score: f64,
    pub tier3_score: f64,
    pub min_dollar_volume: f64,
    pub min_price: f64,
    pub min_rs_percentile: f64,
    pub min_rsi: f64,
    /// Upper RSI bound for readiness; 100 disables it.
    pub max_rsi: f64,
    pub rsi_len: usize,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        ScorerConfig {
            short_roc: 21,
            med_roc: 63,
            long_roc: 126,
            min_bars: 126,
            rs_window: 126,
            volume_window: 50,
            structure_lookback: 10,
            momentum_cap: 25.0,
            rvol_cap: 3.0,
            tier2_score: 0.20,
            tier3_score: 0.35,
            min_dollar_volume: 25_000_000.0,
            min_price: 5.0,
            min_rs_percentile: 0.65,
            min_rsi: 50.0,
            max_rsi: 100.0,
            rsi_len: 14,
        }
    }
}

/// Coarse quality bucket. Tier 3 is best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
pub enum Tier {
    One,
    Two,
    Three,
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> u8 {
        match tier {
            Tier::One => 1,
            Tier::Two => 2,
            Tier::Three => 3,
        }
    }
}

impl From<u8> for Tier {
    fn from(n: u8) -> Tier {
        match n {
            3 => Tier::Three,
            2 => Tier::Two,
            _ => Tier::One,
        }
    }
}

/// A scored ticker. Derived every scan, never authoritative trading state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub symbol: String,
    pub composite_score: f64,
    pub relative_strength_percentile: f64,
    pub tier: Tier,
    pub relative_volume: f64,
    pub momentum_21: f64,
    pub momentum_63: f64,
    pub momentum_126: f64,
    pub price: f64,
    /// Readiness is orthogonal to the score: a well-scored candidate can
    /// still be rejected (e.g. illiquid).
    pub ready: bool,
}

/// Composite momentum: short-horizon noise down-weighted, long-horizon
/// trend dominant.
pub fn composite_momentum(closes: &[f64], cfg: &ScorerConfig) -> f64 {
    0.2 * roc(closes, cfg.short_roc) + 0.3 * roc(closes, cfg.med_roc) + 0.5 * roc(closes, cfg.long_roc)
}

/// Rolling relative-strength percentile: the fraction of the trailing
/// `rs_window` bars whose long-horizon excess return over the benchmark was
/// positive. Bars without a full lookback count as not positive, so short
/// histories are penalised deterministically rather than defaulted.
pub fn rs_percentile(closes: &[f64], benchmark: &[f64], cfg: &ScorerConfig) -> f64 {
    let window = cfg.rs_window;
    let lookback = cfg.long_roc;
    if window == 0 {
        return 0.0;
    }
    let n = closes.len();
    let m = benchmark.len();
    let mut positive = 0usize;
    for k in 0..window {
        // Align the two series on their most recent bar.
        if k + lookback >= n.min(m) {
            continue;
        }
        let ti = n - 1 - k;
        let bi = m - 1 - k;
        let t_base = closes[ti - lookback];
        let b_base = benchmark[bi - lookback];
        if t_base <= 0.0 || b_base <= 0.0 {
            continue;
        }
        let t_ret = (closes[ti] - t_base) / t_base;
        let b_ret = (benchmark[bi] - b_base) / b_base;
        if t_ret - b_ret > 0.0 {
            positive += 1;
        }
    }
    positive as f64 / window as f64
}

/// Higher-high / higher-low structure confirmation against the bar
/// `structure_lookback` bars prior.
pub fn structure_score(highs: &[f64], lows: &[f64], cfg: &ScorerConfig) -> f64 {
    let n = highs.len();
    let lb = cfg.structure_lookback;
    if lb == 0 || n < lb + 1 {
        return 0.5;
    }
    if highs[n - 1] > highs[n - 1 - lb] && lows[n - 1] > lows[n - 1 - lb] {
        1.0
    } else {
        0.5
    }
}

fn normalize(value: f64, cap: f64) -> f64 {
    (value / cap).clamp(0.0, 1.0)
}

/// Score one ticker against a benchmark.
///
/// Requires at least `min_bars` bars and a benchmark at least as long as the
/// ticker series; anything shorter is a
/// [`SwingtraderError::DataUnavailable`] skip for the caller. The final
/// weights sum to 0.8 on purpose: momentum dominates and the remaining 0.2
/// is unallocated headroom reserved for future signal additions.
pub fn score_candidate(
    symbol: &str,
    bars: &[Bar],
    benchmark: &[Bar],
    cfg: &ScorerConfig,
) -> Result<Candidate, SwingtraderError> {
    if bars.len() < cfg.min_bars || benchmark.len() < bars.len() {
        return Err(SwingtraderError::DataUnavailable {
            symbol: symbol.to_string(),
            bars: bars.len().min(benchmark.len()),
            minimum: cfg.min_bars,
        });
    }

    let closes = ohlcv::closes(bars);
    let highs = ohlcv::highs(bars);
    let lows = ohlcv::lows(bars);
    let volumes = ohlcv::volumes(bars);
    let bench_closes = ohlcv::closes(benchmark);

    let momentum_21 = roc(&closes, cfg.short_roc);
    let momentum_63 = roc(&closes, cfg.med_roc);
    let momentum_126 = roc(&closes, cfg.long_roc);
    let comp_mom = composite_momentum(&closes, cfg);

    let rs_pct = rs_percentile(&closes, &bench_closes, cfg);

    let avg_volume = sma(&volumes, cfg.volume_window);
    let relative_volume = volumes[volumes.len() - 1] / avg_volume.max(crate::domain::indicator::EPSILON);

    let structure = structure_score(&highs, &lows, cfg);

    let composite_score = 0.4 * normalize(comp_mom, cfg.momentum_cap)
        + 0.2 * normalize(relative_volume, cfg.rvol_cap) * 0.7
        + 0.2 * structure;

    let tier = classify_tier(composite_score, cfg);

    let price = closes[closes.len() - 1];
    let dollar_volume = price * avg_volume;
    let rsi_now = rsi(&closes, cfg.rsi_len);

    let ready = dollar_volume >= cfg.min_dollar_volume
        && price >= cfg.min_price
        && rs_pct >= cfg.min_rs_percentile
        && rsi_now >= cfg.min_rsi
        && rsi_now <= cfg.max_rsi
        && momentum_126 > 0.0;

    Ok(Candidate {
        symbol: symbol.to_string(),
        composite_score,
        relative_strength_percentile: rs_pct,
        tier,
        relative_volume,
        momentum_21,
        momentum_63,
        momentum_126,
        price,
        ready,
    })
}

/// Tier boundaries are inclusive: a score of exactly `tier3_score` is Tier 3.
pub fn classify_tier(score: f64, cfg: &ScorerConfig) -> Tier {
    if score >= cfg.tier3_score {
        Tier::Three
    } else if score >= cfg.tier2_score {
        Tier::Two
    } else {
        Tier::One
    }
}
