#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use swingtrader::adapters::settings::{MonitorConfig, Settings};
use swingtrader::domain::error::SwingtraderError;
use swingtrader::domain::ohlcv::Bar;
use swingtrader::domain::position::PositionConfig;
use swingtrader::domain::risk::RiskConfig;
use swingtrader::domain::scorer::ScorerConfig;
use swingtrader::domain::signal::SignalConfig;
use swingtrader::ports::broker_port::{
    AccountProvider, AccountSummary, OrderAck, OrderPlacer, OrderSide,
};
use swingtrader::ports::data_port::BarProvider;

/// Bar provider backed by a mutable map, so tests can add symbols between
/// ticks. An optional delay simulates a slow upstream for timeout tests.
pub struct StaticBarProvider {
    bars: Arc<Mutex<HashMap<String, Vec<Bar>>>>,
    pub delay: Option<Duration>,
}

impl StaticBarProvider {
    pub fn new() -> Self {
        Self {
            bars: Arc::new(Mutex::new(HashMap::new())),
            delay: None,
        }
    }

    pub fn with_bars(self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.insert(symbol, bars);
        self
    }

    pub fn insert(&self, symbol: &str, bars: Vec<Bar>) {
        self.bars.lock().unwrap().insert(symbol.to_string(), bars);
    }
}

#[async_trait]
impl BarProvider for StaticBarProvider {
    async fn fetch_bars(
        &self,
        symbol: &str,
        _lookback_bars: usize,
    ) -> Result<Vec<Bar>, SwingtraderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.bars
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| SwingtraderError::DataUnavailable {
                symbol: symbol.to_string(),
                bars: 0,
                minimum: 126,
            })
    }
}

/// Broker that rejects every order.
pub struct FailingBroker;

#[async_trait]
impl OrderPlacer for FailingBroker {
    async fn place_order(
        &self,
        symbol: &str,
        _side: OrderSide,
        _quantity: i64,
        _price_hint: f64,
    ) -> Result<OrderAck, SwingtraderError> {
        Err(SwingtraderError::OrderPlacement {
            symbol: symbol.to_string(),
            reason: "rejected by test broker".to_string(),
        })
    }
}

/// Account provider that replays a fixed sequence of values, repeating the
/// last one. Lets a test walk the account into drawdown across ticks.
pub struct SequencedAccount {
    values: Vec<f64>,
    calls: AtomicUsize,
}

impl SequencedAccount {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AccountProvider for SequencedAccount {
    async fn account_summary(&self) -> Result<AccountSummary, SwingtraderError> {
        let i = self.calls.fetch_add(1, Ordering::Relaxed);
        let value = self.values[i.min(self.values.len() - 1)];
        Ok(AccountSummary {
            account_value: value,
            buying_power: value,
        })
    }
}

/// Bars for the given closes, dated so the last bar is today (fresh by any
/// staleness threshold).
pub fn bars_ending_today(closes: &[f64], volume: f64) -> Vec<Bar> {
    let today = Utc::now().date_naive();
    let n = closes.len();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            date: today - chrono::Days::new((n - 1 - i) as u64),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume,
        })
        .collect()
}

pub fn uptrend(n: usize, start: f64, step: f64) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

pub fn flat(n: usize, value: f64) -> Vec<f64> {
    vec![value; n]
}

pub fn test_settings(dir: &TempDir, symbols: &[&str]) -> Settings {
    Settings {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        benchmark: "SPY".to_string(),
        monitor: MonitorConfig {
            tick_interval_secs: 1,
            ..MonitorConfig::default()
        },
        scorer: ScorerConfig::default(),
        signal: SignalConfig::default(),
        position: PositionConfig::default(),
        risk: RiskConfig::default(),
        store_path: dir.path().join("positions.json"),
        feed_path: dir.path().join("candidates.json"),
        data_dir: dir.path().join("data"),
    }
}
