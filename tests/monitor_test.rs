//! Monitor loop integration tests: entries, exits, risk gating, and
//! failure isolation, all against in-memory adapters.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::*;
use swingtrader::adapters::memory_store::MemoryPositionStore;
use swingtrader::adapters::paper_broker::{FixedAccount, PaperBroker};
use swingtrader::domain::position::{ExitReason, Position, PositionConfig};
use swingtrader::engine::monitor::Monitor;
use swingtrader::ports::broker_port::OrderSide;
use swingtrader::ports::store_port::PositionStore;
use tempfile::TempDir;

fn seeded_store() -> (Arc<Mutex<MemoryPositionStore>>, Arc<Mutex<dyn PositionStore>>) {
    let store = Arc::new(Mutex::new(MemoryPositionStore::new()));
    let dyn_store: Arc<Mutex<dyn PositionStore>> = store.clone();
    (store, dyn_store)
}

mod entries {
    use super::*;

    #[tokio::test]
    async fn uptrend_opens_exactly_one_position() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(
            StaticBarProvider::new()
                .with_bars("UP", bars_ending_today(&uptrend(252, 100.0, 0.5), 1_000_000.0))
                .with_bars("SPY", bars_ending_today(&flat(252, 100.0), 1_000_000.0)),
        );
        let broker = Arc::new(PaperBroker::new());
        let (store, dyn_store) = seeded_store();

        let mut monitor = Monitor::new(
            provider,
            broker.clone(),
            Arc::new(FixedAccount::new(100_000.0)),
            dyn_store,
            test_settings(&dir, &["UP"]),
        );

        let report = monitor.tick().await.unwrap();
        assert_eq!(report.entries, 1);
        assert_eq!(report.exits, 0);

        let open = store.lock().unwrap().open_positions();
        assert_eq!(open.len(), 1);
        let pos = &open[0];
        assert_eq!(pos.symbol, "UP");
        assert!(pos.stop_price < pos.entry_price);
        assert!(pos.quantity > 0);

        let orders = broker.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, OrderSide::Buy);
        assert_eq!(orders[0].quantity, pos.quantity);

        // Re-running the same tick must not open a second position.
        let report = monitor.tick().await.unwrap();
        assert_eq!(report.entries, 0);
        assert_eq!(store.lock().unwrap().open_positions().len(), 1);
    }

    #[tokio::test]
    async fn no_entry_before_the_trend_crossing() {
        let dir = TempDir::new().unwrap();
        let closes = uptrend(252, 100.0, 0.5);
        let provider = Arc::new(
            StaticBarProvider::new()
                .with_bars("SPY", bars_ending_today(&flat(252, 100.0), 1_000_000.0)),
        );
        let (store, dyn_store) = seeded_store();

        let mut monitor = Monitor::new(
            provider.clone(),
            Arc::new(PaperBroker::new()),
            Arc::new(FixedAccount::new(100_000.0)),
            dyn_store,
            test_settings(&dir, &["UP"]),
        );

        // Replay the series one bar at a time, re-dated so the growing
        // prefix always ends today.
        let mut first_entry = None;
        for n in 40..=closes.len() {
            provider.insert("UP", bars_ending_today(&closes[..n], 1_000_000.0));
            let report = monitor.tick().await.unwrap();
            match first_entry {
                None if report.entries == 1 => first_entry = Some(n),
                None => {
                    assert_eq!(report.entries, 0);
                    assert!(
                        store.lock().unwrap().all_positions().is_empty(),
                        "position on the books at {n} bars, before the crossing"
                    );
                }
                Some(_) => assert_eq!(report.entries, 0, "second entry at {n} bars"),
            }
            assert!(store.lock().unwrap().open_positions().len() <= 1);
        }

        // The 200-bar trend average becomes beatable at bar 200; the
        // relative-strength window fills past the 0.65 readiness floor
        // eight bars later, and that is where the single entry lands.
        assert_eq!(first_entry, Some(208));
        assert_eq!(store.lock().unwrap().open_positions().len(), 1);
    }

    #[tokio::test]
    async fn concurrency_cap_limits_open_positions() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(
            StaticBarProvider::new()
                .with_bars("AAA", bars_ending_today(&uptrend(252, 100.0, 0.5), 1_000_000.0))
                .with_bars("BBB", bars_ending_today(&uptrend(252, 90.0, 0.45), 1_000_000.0))
                .with_bars("SPY", bars_ending_today(&flat(252, 100.0), 1_000_000.0)),
        );
        let (store, dyn_store) = seeded_store();
        let mut settings = test_settings(&dir, &["AAA", "BBB"]);
        settings.risk.max_concurrent_positions = 1;

        let mut monitor = Monitor::new(
            provider,
            Arc::new(PaperBroker::new()),
            Arc::new(FixedAccount::new(100_000.0)),
            dyn_store,
            settings,
        );

        let report = monitor.tick().await.unwrap();
        assert_eq!(report.entries, 1);
        assert_eq!(store.lock().unwrap().open_positions().len(), 1);
    }

    #[tokio::test]
    async fn rejected_order_commits_nothing() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(
            StaticBarProvider::new()
                .with_bars("UP", bars_ending_today(&uptrend(252, 100.0, 0.5), 1_000_000.0))
                .with_bars("SPY", bars_ending_today(&flat(252, 100.0), 1_000_000.0)),
        );
        let (store, dyn_store) = seeded_store();

        let mut monitor = Monitor::new(
            provider,
            Arc::new(FailingBroker),
            Arc::new(FixedAccount::new(100_000.0)),
            dyn_store,
            test_settings(&dir, &["UP"]),
        );

        let report = monitor.tick().await.unwrap();
        assert_eq!(report.entries, 0);
        assert!(report.skipped >= 1);
        assert!(store.lock().unwrap().all_positions().is_empty());
    }

    #[tokio::test]
    async fn persist_failure_halts_entries() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(
            StaticBarProvider::new()
                .with_bars("UP", bars_ending_today(&uptrend(252, 100.0, 0.5), 1_000_000.0))
                .with_bars("SPY", bars_ending_today(&flat(252, 100.0), 1_000_000.0)),
        );
        let (store, dyn_store) = seeded_store();
        store.lock().unwrap().set_fail_commits(true);

        let mut monitor = Monitor::new(
            provider,
            Arc::new(PaperBroker::new()),
            Arc::new(FixedAccount::new(100_000.0)),
            dyn_store,
            test_settings(&dir, &["UP"]),
        );

        let report = monitor.tick().await.unwrap();
        assert!(report.entries_halted);
        assert_eq!(report.entries, 0);
        assert!(store.lock().unwrap().all_positions().is_empty());
    }

    #[tokio::test]
    async fn drawdown_circuit_breaker_blocks_new_entries() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(
            StaticBarProvider::new()
                .with_bars("AAA", bars_ending_today(&uptrend(252, 100.0, 0.5), 1_000_000.0))
                .with_bars("SPY", bars_ending_today(&flat(252, 100.0), 1_000_000.0)),
        );
        let (store, dyn_store) = seeded_store();

        // First tick at peak equity, second tick 30% below it.
        let mut monitor = Monitor::new(
            provider.clone(),
            Arc::new(PaperBroker::new()),
            Arc::new(SequencedAccount::new(vec![100_000.0, 70_000.0])),
            dyn_store,
            test_settings(&dir, &["AAA", "BBB"]),
        );

        let report = monitor.tick().await.unwrap();
        assert_eq!(report.entries, 1);

        // BBB becomes available only now, with the account in drawdown.
        provider.insert("BBB", bars_ending_today(&uptrend(252, 90.0, 0.45), 1_000_000.0));
        let report = monitor.tick().await.unwrap();
        assert_eq!(report.entries, 0);
        assert!(monitor.risk_state().drawdown() > 0.20);
        // The existing position is never force-closed by drawdown.
        assert_eq!(store.lock().unwrap().open_positions().len(), 1);
    }

    #[tokio::test]
    async fn stale_data_suppresses_entry() {
        let dir = TempDir::new().unwrap();
        let mut stale_bars = bars_ending_today(&uptrend(252, 100.0, 0.5), 1_000_000.0);
        for bar in &mut stale_bars {
            bar.date = bar.date - chrono::Days::new(30);
        }
        let provider = Arc::new(
            StaticBarProvider::new()
                .with_bars("OLD", stale_bars)
                .with_bars("SPY", bars_ending_today(&flat(252, 100.0), 1_000_000.0)),
        );
        let (store, dyn_store) = seeded_store();

        let mut monitor = Monitor::new(
            provider,
            Arc::new(PaperBroker::new()),
            Arc::new(FixedAccount::new(100_000.0)),
            dyn_store,
            test_settings(&dir, &["OLD"]),
        );

        let report = monitor.tick().await.unwrap();
        assert_eq!(report.entries, 0);
        assert!(report.skipped >= 1);
        assert!(store.lock().unwrap().all_positions().is_empty());
    }
}

mod exits {
    use super::*;

    #[tokio::test]
    async fn stop_loss_closes_full_position() {
        let dir = TempDir::new().unwrap();
        // Downtrend ending below the 142.5 stop.
        let provider = Arc::new(
            StaticBarProvider::new()
                .with_bars("DN", bars_ending_today(&uptrend(252, 200.0, -0.24), 1_000_000.0))
                .with_bars("SPY", bars_ending_today(&flat(252, 100.0), 1_000_000.0)),
        );
        let broker = Arc::new(PaperBroker::new());
        let (store, dyn_store) = seeded_store();

        let position = Position::open(
            "DN",
            150.0,
            100,
            142.5,
            &PositionConfig::default(),
            chrono::Utc::now(),
        );
        store.lock().unwrap().commit(position).unwrap();

        let mut monitor = Monitor::new(
            provider,
            broker.clone(),
            Arc::new(FixedAccount::new(100_000.0)),
            dyn_store,
            test_settings(&dir, &["DN"]),
        );

        let report = monitor.tick().await.unwrap();
        assert_eq!(report.exits, 1);
        assert_eq!(report.entries, 0);

        let all = store.lock().unwrap().all_positions();
        assert_eq!(all.len(), 1);
        let closed = &all[0];
        assert!(!closed.is_open());
        assert_eq!(closed.exit_reason, Some(ExitReason::StopLoss));
        assert_eq!(closed.quantity_remaining, 0);
        assert!(closed.realized_pnl.unwrap() < 0.0);

        let orders = broker.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, OrderSide::Sell);
        assert_eq!(orders[0].quantity, 100);
    }

    #[tokio::test]
    async fn partial_exit_at_target_keeps_position_open() {
        let dir = TempDir::new().unwrap();
        // Uptrend ending at 107.5, above the 106 partial target.
        let provider = Arc::new(
            StaticBarProvider::new()
                .with_bars("PT", bars_ending_today(&uptrend(252, 44.75, 0.25), 1_000_000.0))
                .with_bars("SPY", bars_ending_today(&flat(252, 100.0), 1_000_000.0)),
        );
        let broker = Arc::new(PaperBroker::new());
        let (store, dyn_store) = seeded_store();

        let position = Position::open(
            "PT",
            100.0,
            100,
            97.0,
            &PositionConfig::default(),
            chrono::Utc::now(),
        );
        assert_eq!(position.partial_target, 106.0);
        store.lock().unwrap().commit(position).unwrap();

        let mut monitor = Monitor::new(
            provider,
            broker.clone(),
            Arc::new(FixedAccount::new(100_000.0)),
            dyn_store,
            test_settings(&dir, &["PT"]),
        );

        let report = monitor.tick().await.unwrap();
        assert_eq!(report.partial_exits, 1);
        assert_eq!(report.exits, 0);

        let open = store.lock().unwrap().open_positions();
        assert_eq!(open.len(), 1);
        let pos = &open[0];
        assert!(pos.partial_exited);
        assert_eq!(pos.quantity_remaining, 75);
        assert!(pos.partial_pnl > 0.0);

        let orders = broker.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].quantity, 25);
        assert_eq!(orders[0].side, OrderSide::Sell);
    }

    #[tokio::test]
    async fn rejected_exit_order_leaves_position_untouched() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(
            StaticBarProvider::new()
                .with_bars("DN", bars_ending_today(&uptrend(252, 200.0, -0.24), 1_000_000.0))
                .with_bars("SPY", bars_ending_today(&flat(252, 100.0), 1_000_000.0)),
        );
        let (store, dyn_store) = seeded_store();

        let position = Position::open(
            "DN",
            150.0,
            100,
            142.5,
            &PositionConfig::default(),
            chrono::Utc::now(),
        );
        store.lock().unwrap().commit(position.clone()).unwrap();

        let mut monitor = Monitor::new(
            provider,
            Arc::new(FailingBroker),
            Arc::new(FixedAccount::new(100_000.0)),
            dyn_store,
            test_settings(&dir, &["DN"]),
        );

        let report = monitor.tick().await.unwrap();
        assert_eq!(report.exits, 0);
        // Rollback: the record still shows an untouched open position.
        let open = store.lock().unwrap().open_positions();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0], position);
    }
}

mod resilience {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out_without_blocking_the_tick() {
        let dir = TempDir::new().unwrap();
        let mut provider = StaticBarProvider::new()
            .with_bars("UP", bars_ending_today(&uptrend(252, 100.0, 0.5), 1_000_000.0))
            .with_bars("SPY", bars_ending_today(&flat(252, 100.0), 1_000_000.0));
        provider.delay = Some(Duration::from_secs(120));
        let (store, dyn_store) = seeded_store();

        let mut monitor = Monitor::new(
            Arc::new(provider),
            Arc::new(PaperBroker::new()),
            Arc::new(FixedAccount::new(100_000.0)),
            dyn_store,
            test_settings(&dir, &["UP"]),
        );

        // Every fetch (benchmark included) times out; the tick still
        // completes with nothing traded.
        let report = monitor.tick().await.unwrap();
        assert_eq!(report.entries, 0);
        assert_eq!(report.exits, 0);
        assert!(store.lock().unwrap().all_positions().is_empty());
    }

    #[tokio::test]
    async fn candidate_feed_is_published_each_tick() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(
            StaticBarProvider::new()
                .with_bars("UP", bars_ending_today(&uptrend(252, 100.0, 0.5), 1_000_000.0))
                .with_bars("FLAT", bars_ending_today(&flat(252, 50.0), 1_000_000.0))
                .with_bars("SPY", bars_ending_today(&flat(252, 100.0), 1_000_000.0)),
        );
        let (_store, dyn_store) = seeded_store();
        let settings = test_settings(&dir, &["UP", "FLAT"]);
        let feed_path = settings.feed_path.clone();

        let mut monitor = Monitor::new(
            provider,
            Arc::new(PaperBroker::new()),
            Arc::new(FixedAccount::new(100_000.0)),
            dyn_store,
            settings,
        );
        monitor.tick().await.unwrap();

        let feed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&feed_path).unwrap()).unwrap();
        let entries = feed.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        // Ranked best first.
        assert_eq!(entries[0]["symbol"], "UP");
        assert!(
            entries[0]["compositeScore"].as_f64().unwrap()
                >= entries[1]["compositeScore"].as_f64().unwrap()
        );
    }
}
