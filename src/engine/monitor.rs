//! Monitor loop: the only component aware of every other one.
//!
//! Each tick refreshes the account, fetches bars for the whole universe,
//! evaluates exits for open positions, publishes the candidate feed, then
//! evaluates entries for flat symbols. Exits run before entries so a symbol
//! can never close and re-open within one tick. All store writes go through
//! one mutex; order placement happens before the store commit so a rejected
//! order leaves no phantom position behind.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::adapters::settings::Settings;
use crate::domain::error::SwingtraderError;
use crate::domain::ohlcv::Bar;
use crate::domain::position::{Position, TickAction};
use crate::domain::risk::{self, RiskState};
use crate::domain::signal::{self, Signal};
use crate::engine::scan;
use crate::ports::broker_port::{AccountProvider, OrderPlacer, OrderSide};
use crate::ports::data_port::BarProvider;
use crate::ports::store_port::PositionStore;

/// Per-tick outcome counters, for logging and tests.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub exits: usize,
    pub partial_exits: usize,
    pub entries: usize,
    pub skipped: usize,
    /// Set when a store persist failed mid-tick; entries were halted.
    pub entries_halted: bool,
}

pub struct Monitor {
    provider: Arc<dyn BarProvider>,
    broker: Arc<dyn OrderPlacer>,
    account: Arc<dyn AccountProvider>,
    store: Arc<Mutex<dyn PositionStore>>,
    settings: Settings,
    risk_state: RiskState,
}

impl Monitor {
    pub fn new(
        provider: Arc<dyn BarProvider>,
        broker: Arc<dyn OrderPlacer>,
        account: Arc<dyn AccountProvider>,
        store: Arc<Mutex<dyn PositionStore>>,
        settings: Settings,
    ) -> Self {
        Monitor {
            provider,
            broker,
            account,
            store,
            settings,
            risk_state: RiskState::new(0.0),
        }
    }

    pub fn risk_state(&self) -> &RiskState {
        &self.risk_state
    }

    /// Run on the configured cadence until a shutdown is signalled. The
    /// stop is cooperative: an in-flight tick finishes its current symbol
    /// and store write before the loop exits.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), SwingtraderError> {
        let mut interval = tokio::time::interval(Duration::from_secs(
            self.settings.monitor.tick_interval_secs.max(1),
        ));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let stop = shutdown.clone();
                    match self.tick_with(Some(&stop)).await {
                        Ok(report) => info!(
                            exits = report.exits,
                            partial_exits = report.partial_exits,
                            entries = report.entries,
                            skipped = report.skipped,
                            entries_halted = report.entries_halted,
                            "tick complete"
                        ),
                        Err(e) => error!(error = %e, "tick failed"),
                    }
                    if *shutdown.borrow() {
                        info!("shutdown requested; monitor stopping");
                        return Ok(());
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("shutdown requested; monitor stopping");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// One full evaluation pass.
    pub async fn tick(&mut self) -> Result<TickReport, SwingtraderError> {
        self.tick_with(None).await
    }

    async fn tick_with(
        &mut self,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> Result<TickReport, SwingtraderError> {
        let mut report = TickReport::default();
        let tick_ts = Utc::now();

        // Account refresh feeds the risk manager; without it, sizing is
        // unknowable, so entries are blocked while exits still run.
        let timeout = Duration::from_secs(self.settings.monitor.fetch_timeout_secs);
        let mut entries_allowed =
            match tokio::time::timeout(timeout, self.account.account_summary()).await {
                Ok(Ok(summary)) => {
                    self.risk_state.observe(summary.account_value);
                    true
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "account summary failed; entries blocked this tick");
                    false
                }
                Err(_) => {
                    warn!("account summary timed out; entries blocked this tick");
                    false
                }
            };

        let benchmark = match scan::fetch_benchmark(self.provider.as_ref(), &self.settings).await {
            Ok(bars) => Some(bars),
            Err(e) => {
                warn!(error = %e, "benchmark fetch failed; scoring disabled this tick");
                None
            }
        };

        // The fetch universe covers open positions even if they were
        // dropped from the configured symbol list.
        let open_symbols: HashSet<String> = {
            let guard = self.lock_store()?;
            guard.open_positions().into_iter().map(|p| p.symbol).collect()
        };
        let mut universe = self.settings.symbols.clone();
        for symbol in &open_symbols {
            if !universe.contains(symbol) {
                universe.push(symbol.clone());
            }
        }

        let bars_by_symbol =
            scan::fetch_all_bars(Arc::clone(&self.provider), &universe, &self.settings.monitor)
                .await;

        // Phase 1: exits, serially per symbol, before any entry is even
        // considered.
        let mut open_positions = {
            let guard = self.lock_store()?;
            guard.open_positions()
        };
        open_positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        let mut persist_failed = false;
        for position in open_positions {
            if stop_requested(shutdown) {
                info!("stop requested; abandoning remaining exits this tick");
                return Ok(report);
            }
            let symbol = position.symbol.clone();
            let Some(bars) = self.usable_bars(&bars_by_symbol, &symbol, &mut report) else {
                continue;
            };
            if let Err(e) = self.evaluate_exits(position, bars, &mut report).await {
                if e.is_symbol_scoped() {
                    warn!(symbol, tick = %tick_ts, error = %e, "exit evaluation skipped");
                    report.skipped += 1;
                } else {
                    error!(symbol, tick = %tick_ts, error = %e, "store failure during exit; halting entries");
                    persist_failed = true;
                }
            }
        }

        // Phase 2: score and publish the candidate feed.
        let candidates = benchmark
            .as_ref()
            .map(|bench| scan::rank_candidates(&bars_by_symbol, bench, &self.settings))
            .unwrap_or_default();
        if benchmark.is_some() {
            if let Err(e) = scan::write_feed(&self.settings.feed_path, &candidates) {
                warn!(error = %e, "candidate feed not published");
            }
        } else {
            entries_allowed = false;
        }

        // Phase 3: entries for flat, ready candidates, best score first.
        if persist_failed {
            report.entries_halted = true;
            error!("unpersisted mutation this tick; new entries halted");
            return Ok(report);
        }
        if !entries_allowed {
            return Ok(report);
        }

        let mut open_count = {
            let guard = self.lock_store()?;
            guard.open_positions().len()
        };

        for candidate in &candidates {
            if stop_requested(shutdown) {
                info!("stop requested; abandoning remaining entries this tick");
                return Ok(report);
            }
            let symbol = candidate.symbol.as_str();

            // A symbol with (or that just closed) a position never re-enters
            // within the same tick.
            if open_symbols.contains(symbol) {
                continue;
            }
            // Idempotency guard: re-check the store before opening.
            if self.lock_store()?.open_position(symbol).is_some() {
                continue;
            }
            if !candidate.ready {
                debug!(symbol, tick = %tick_ts, "candidate not ready; entry suppressed");
                continue;
            }

            let Some(bars) = self.usable_bars(&bars_by_symbol, symbol, &mut report) else {
                continue;
            };
            if signal::classify(bars, &self.settings.signal, &self.settings.scorer)
                != Signal::LongEntry
            {
                continue;
            }

            if let Some(e) =
                risk::entry_rejection(symbol, &self.risk_state, open_count, &self.settings.risk)
            {
                info!(symbol, tick = %tick_ts, error = %e, "entry suppressed by risk gate");
                report.skipped += 1;
                continue;
            }

            let price = candidate.price;
            let stop_price = price * (1.0 - self.settings.position.stop_fraction);
            let shares =
                risk::max_shares(&self.risk_state, price, stop_price, &self.settings.risk);
            if shares == 0 {
                info!(symbol, tick = %tick_ts, "entry suppressed: zero size");
                report.skipped += 1;
                continue;
            }

            match self
                .broker
                .place_order(symbol, OrderSide::Buy, shares, price)
                .await
            {
                Ok(ack) => {
                    let position = Position::open(
                        symbol,
                        price,
                        shares,
                        stop_price,
                        &self.settings.position,
                        tick_ts,
                    );
                    if let Err(e) = self.commit(position) {
                        error!(symbol, order_id = %ack.order_id, error = %e, "entry placed but not persisted; halting entries");
                        report.entries_halted = true;
                        return Ok(report);
                    }
                    info!(symbol, shares, price, stop_price, order_id = %ack.order_id, "position opened");
                    report.entries += 1;
                    open_count += 1;
                }
                Err(e) => {
                    // Rollback is simply never committing the record.
                    warn!(symbol, tick = %tick_ts, error = %e, "entry order failed; nothing committed");
                    report.skipped += 1;
                }
            }
        }

        Ok(report)
    }

    /// Exit evaluation for one open position. A partial exit re-plans so a
    /// trailing or signal exit can still close the remainder this tick.
    async fn evaluate_exits(
        &self,
        mut position: Position,
        bars: &[Bar],
        report: &mut TickReport,
    ) -> Result<(), SwingtraderError> {
        let price = bars[bars.len() - 1].close;
        let exit_signal =
            signal::classify(bars, &self.settings.signal, &self.settings.scorer) == Signal::Exit;
        let now = Utc::now();
        let symbol = position.symbol.clone();

        loop {
            match position.plan_tick(price, exit_signal, &self.settings.position) {
                TickAction::Hold => {
                    if price > position.max_price_since_entry {
                        position.observe_price(price);
                        self.commit(position)?;
                    }
                    return Ok(());
                }
                TickAction::PartialExit { shares } => {
                    let ack = self
                        .broker
                        .place_order(&symbol, OrderSide::Sell, shares, price)
                        .await?;
                    position.apply_partial_exit(price, shares, now);
                    self.commit(position.clone())?;
                    info!(
                        symbol,
                        shares,
                        price,
                        order_id = %ack.order_id,
                        partial_pnl = position.partial_pnl,
                        "partial exit at 2R target"
                    );
                    report.partial_exits += 1;
                    // Fall through: the trailing/signal checks still apply
                    // to the remainder.
                }
                TickAction::CloseFull { reason } => {
                    let ack = self
                        .broker
                        .place_order(&symbol, OrderSide::Sell, position.quantity_remaining, price)
                        .await?;
                    position.apply_close(price, reason, now);
                    self.commit(position.clone())?;
                    info!(
                        symbol,
                        price,
                        ?reason,
                        order_id = %ack.order_id,
                        realized_pnl = position.realized_pnl,
                        "position closed"
                    );
                    report.exits += 1;
                    return Ok(());
                }
            }
        }
    }

    /// Bars for a symbol if present and fresh, else a logged skip.
    fn usable_bars<'a>(
        &self,
        bars_by_symbol: &'a std::collections::HashMap<String, Vec<Bar>>,
        symbol: &str,
        report: &mut TickReport,
    ) -> Option<&'a [Bar]> {
        let today = Utc::now().date_naive();
        match fresh_bars(
            symbol,
            bars_by_symbol.get(symbol),
            self.settings.monitor.max_stale_days,
            today,
        ) {
            Ok(bars) => Some(bars),
            Err(e) => {
                warn!(symbol, error = %e, "symbol skipped this tick");
                report.skipped += 1;
                None
            }
        }
    }

    fn lock_store(&self) -> Result<std::sync::MutexGuard<'_, dyn PositionStore + 'static>, SwingtraderError> {
        self.store.lock().map_err(|_| SwingtraderError::Persist {
            reason: "position store lock poisoned".to_string(),
        })
    }

    fn commit(&self, position: Position) -> Result<(), SwingtraderError> {
        self.lock_store()?.commit(position)
    }
}

fn stop_requested(shutdown: Option<&watch::Receiver<bool>>) -> bool {
    shutdown.is_some_and(|rx| *rx.borrow())
}

/// Freshness gate for one symbol. Missing or empty data is
/// [`SwingtraderError::DataUnavailable`]; a last bar older than
/// `max_stale_days` is [`SwingtraderError::StaleData`]. Both are
/// symbol-scoped, so the tick skips the symbol and retries next time.
fn fresh_bars<'a>(
    symbol: &str,
    bars: Option<&'a Vec<Bar>>,
    max_stale_days: i64,
    today: NaiveDate,
) -> Result<&'a [Bar], SwingtraderError> {
    let bars = match bars {
        Some(bars) if !bars.is_empty() => bars,
        _ => {
            return Err(SwingtraderError::DataUnavailable {
                symbol: symbol.to_string(),
                bars: 0,
                minimum: 1,
            });
        }
    };
    let last = bars[bars.len() - 1].date;
    if (today - last).num_days() > max_stale_days {
        return Err(SwingtraderError::StaleData {
            symbol: symbol.to_string(),
            last_bar: last,
            max_age_days: max_stale_days,
        });
    }
    Ok(bars)
}
