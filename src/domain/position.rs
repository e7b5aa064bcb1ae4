//! Position lifecycle: entry, 2R partial exit, trailing stop, full close.
//!
//! A position is the only mutable, persisted entity in the system. Exit
//! checks run in a fixed order so that a bar satisfying several conditions
//! at once resolves deterministically: stop-loss always wins, then the
//! partial target, then the trailing stop, then the signal exit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    TrailingStop,
    SignalExit,
    TakeProfit,
}

/// Lifecycle tuning. `use_trailing_stop` selects between the trailing-stop
/// regime (2R partial, then trail the remainder) and a plain fixed
/// take-profit at the 2R target.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionConfig {
    /// Initial stop distance below entry, as a fraction of entry price.
    pub stop_fraction: f64,
    /// Fraction of the *original* quantity sold at the partial target.
    pub partial_fraction: f64,
    /// Trailing stop distance below the high-water mark.
    pub trail_stop_fraction: f64,
    /// Partial target in multiples of the per-share risk.
    pub partial_r_multiple: f64,
    pub use_trailing_stop: bool,
}

impl Default for PositionConfig {
    fn default() -> Self {
        PositionConfig {
            stop_fraction: 0.05,
            partial_fraction: 0.25,
            trail_stop_fraction: 0.05,
            partial_r_multiple: 2.0,
            use_trailing_stop: true,
        }
    }
}

/// One long position. `quantity` is the original size; `quantity_remaining`
/// shrinks on a partial exit and drops to zero on close. A closed record is
/// terminal and kept for audit; re-entry creates a fresh record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub entry_price: f64,
    pub quantity: i64,
    pub quantity_remaining: i64,
    pub stop_price: f64,
    pub partial_target: f64,
    pub max_price_since_entry: f64,
    pub partial_exited: bool,
    pub partial_pnl: f64,
    pub partial_exit_price: Option<f64>,
    pub partial_exit_at: Option<DateTime<Utc>>,
    pub trail_stop_fraction: f64,
    pub status: PositionStatus,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub exit_price: Option<f64>,
    pub exit_reason: Option<ExitReason>,
    /// Aggregate across legs: partial proceeds plus the final leg.
    pub realized_pnl: Option<f64>,
}

/// What the current bar asks of an open position. Planning is pure; the
/// mutation is applied separately so an order can be placed (and can fail)
/// before anything is committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickAction {
    CloseFull { reason: ExitReason },
    PartialExit { shares: i64 },
    Hold,
}

impl Position {
    pub fn open(
        symbol: &str,
        entry_price: f64,
        quantity: i64,
        stop_price: f64,
        cfg: &PositionConfig,
        opened_at: DateTime<Utc>,
    ) -> Self {
        let risk_per_share = entry_price - stop_price;
        Position {
            symbol: symbol.to_string(),
            entry_price,
            quantity,
            quantity_remaining: quantity,
            stop_price,
            partial_target: entry_price + cfg.partial_r_multiple * risk_per_share,
            max_price_since_entry: entry_price,
            partial_exited: false,
            partial_pnl: 0.0,
            partial_exit_price: None,
            partial_exit_at: None,
            trail_stop_fraction: cfg.trail_stop_fraction,
            status: PositionStatus::Open,
            opened_at,
            closed_at: None,
            exit_price: None,
            exit_reason: None,
            realized_pnl: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    pub fn risk_per_share(&self) -> f64 {
        self.entry_price - self.stop_price
    }

    /// Trailing stop as of a price observation this tick. The high-water
    /// mark ratchets before the comparison, so a bar that sets a new high
    /// cannot stop itself out.
    pub fn trail_stop_at(&self, price: f64) -> f64 {
        self.max_price_since_entry.max(price) * (1.0 - self.trail_stop_fraction)
    }

    /// Shares to sell at the partial target: a fraction of the original
    /// quantity, clamped so the position keeps at least one share open.
    pub fn partial_shares(&self, cfg: &PositionConfig) -> i64 {
        let shares = (self.quantity as f64 * cfg.partial_fraction).floor() as i64;
        shares.min(self.quantity_remaining - 1).max(0)
    }

    /// Decide this tick's transition. Fixed evaluation order:
    /// stop-loss, partial target (or fixed take-profit), trailing stop,
    /// signal exit. A partial exit leaves the position open; the caller
    /// re-plans afterwards so the trailing/signal checks still run on the
    /// remainder within the same tick.
    pub fn plan_tick(&self, price: f64, exit_signal: bool, cfg: &PositionConfig) -> TickAction {
        if !self.is_open() {
            return TickAction::Hold;
        }

        // Capital preservation outranks everything else.
        if price <= self.stop_price {
            return TickAction::CloseFull {
                reason: ExitReason::StopLoss,
            };
        }

        if price >= self.partial_target {
            if !cfg.use_trailing_stop {
                return TickAction::CloseFull {
                    reason: ExitReason::TakeProfit,
                };
            }
            if !self.partial_exited {
                let shares = self.partial_shares(cfg);
                if shares > 0 {
                    return TickAction::PartialExit { shares };
                }
            }
        }

        if cfg.use_trailing_stop && price <= self.trail_stop_at(price) {
            return TickAction::CloseFull {
                reason: ExitReason::TrailingStop,
            };
        }

        if exit_signal {
            return TickAction::CloseFull {
                reason: ExitReason::SignalExit,
            };
        }

        TickAction::Hold
    }

    /// Ratchet the high-water mark. Monotonically non-decreasing while open.
    pub fn observe_price(&mut self, price: f64) {
        if self.is_open() && price > self.max_price_since_entry {
            self.max_price_since_entry = price;
        }
    }

    /// Book a partial exit. The flag flips exactly once; the position
    /// remains open on the remaining shares.
    pub fn apply_partial_exit(&mut self, price: f64, shares: i64, at: DateTime<Utc>) {
        debug_assert!(self.is_open());
        debug_assert!(!self.partial_exited);
        debug_assert!(shares > 0 && shares < self.quantity_remaining);

        self.partial_exited = true;
        self.quantity_remaining -= shares;
        self.partial_pnl = (price - self.entry_price) * shares as f64;
        self.partial_exit_price = Some(price);
        self.partial_exit_at = Some(at);
        self.observe_price(price);
    }

    /// Close the remaining quantity. Realized P&L aggregates the partial
    /// leg already booked with the final leg.
    pub fn apply_close(&mut self, price: f64, reason: ExitReason, at: DateTime<Utc>) {
        debug_assert!(self.is_open());

        let final_leg = (price - self.entry_price) * self.quantity_remaining as f64;
        self.realized_pnl = Some(self.partial_pnl + final_leg);
        self.observe_price(price);
        self.quantity_remaining = 0;
        self.exit_price = Some(price);
        self.exit_reason = Some(reason);
        self.closed_at = Some(at);
        self.status = PositionStatus::Closed;
    }

    /// Aggregate return on the original notional, in percent.
    pub fn realized_pnl_pct(&self) -> Option<f64> {
        let pnl = self.realized_pnl?;
        let notional = self.entry_price * self.quantity as f64;
        if notional <= 0.0 {
            return None;
        }
        Some(pnl / notional * 100.0)
    }
}
