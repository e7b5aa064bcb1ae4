//! Drawdown-aware position sizing and entry gating.
//!
//! Every function here is pure: sizing depends only on the account figures
//! and prices passed in, so the same inputs always produce the same share
//! count. The monitor owns the peak-equity ratchet and feeds the result in.

use serde::{Deserialize, Serialize};

use crate::domain::error::SwingtraderError;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    /// Fraction of account value risked per trade (risk to the stop, not
    /// notional).
    pub max_risk_fraction_per_trade: f64,
    pub max_concurrent_positions: usize,
    /// Drawdown above which new entries are blocked entirely.
    pub circuit_breaker_drawdown: f64,
    /// Drawdown above which size is reduced (but not blocked).
    pub reduced_size_drawdown: f64,
    pub reduced_size_multiplier: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            max_risk_fraction_per_trade: 0.01,
            max_concurrent_positions: 5,
            circuit_breaker_drawdown: 0.20,
            reduced_size_drawdown: 0.15,
            reduced_size_multiplier: 0.75,
        }
    }
}

/// Account state as of the current tick. `peak_equity` only ratchets up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskState {
    pub account_value: f64,
    pub peak_equity: f64,
}

impl RiskState {
    pub fn new(account_value: f64) -> Self {
        RiskState {
            account_value,
            peak_equity: account_value,
        }
    }

    /// Update with a fresh account figure, ratcheting the peak.
    pub fn observe(&mut self, account_value: f64) {
        self.account_value = account_value;
        if account_value > self.peak_equity {
            self.peak_equity = account_value;
        }
    }

    /// Fractional decline from peak, floored at 0.
    pub fn drawdown(&self) -> f64 {
        if self.peak_equity <= 0.0 {
            return 0.0;
        }
        ((self.peak_equity - self.account_value) / self.peak_equity).max(0.0)
    }
}

/// Drawdown-banded size multiplier.
///
/// The 5-15% band deliberately stays at full size: the strongest recoveries
/// tend to start there, and cutting size in that band costs more in missed
/// recovery than it saves. Above 20% the circuit breaker blocks all new
/// entries; existing positions are never force-closed by drawdown.
pub fn size_multiplier(drawdown: f64, cfg: &RiskConfig) -> f64 {
    if drawdown > cfg.circuit_breaker_drawdown {
        0.0
    } else if drawdown > cfg.reduced_size_drawdown {
        cfg.reduced_size_multiplier
    } else {
        1.0
    }
}

/// Maximum shares for a candidate entry.
///
/// Risk budget is account value times the per-trade risk fraction, scaled by
/// the drawdown multiplier, divided by the per-share risk to the stop. A
/// non-blocked entry is floored at one share; a blocked one is zero.
pub fn max_shares(state: &RiskState, entry_price: f64, stop_price: f64, cfg: &RiskConfig) -> i64 {
    let multiplier = size_multiplier(state.drawdown(), cfg);
    if multiplier == 0.0 {
        return 0;
    }
    let risk_per_share = (entry_price - stop_price).abs();
    if risk_per_share <= 0.0 {
        return 0;
    }
    let budget = state.account_value * cfg.max_risk_fraction_per_trade * multiplier;
    ((budget / risk_per_share).floor() as i64).max(1)
}

/// Entry gate combining the concurrency cap and the circuit breaker.
/// Returns a [`SwingtraderError::RiskViolation`] for the structured skip log.
pub fn entry_rejection(
    symbol: &str,
    state: &RiskState,
    open_position_count: usize,
    cfg: &RiskConfig,
) -> Option<SwingtraderError> {
    let reason = if open_position_count >= cfg.max_concurrent_positions {
        format!(
            "concurrency cap reached ({open_position_count}/{})",
            cfg.max_concurrent_positions
        )
    } else {
        let dd = state.drawdown();
        if dd > cfg.circuit_breaker_drawdown {
            format!("circuit breaker: drawdown {:.1}%", dd * 100.0)
        } else {
            return None;
        }
    };
    Some(SwingtraderError::RiskViolation {
        symbol: symbol.to_string(),
        reason,
    })
}
