//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use crate::adapters::csv_bar_adapter::CsvBarAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_store::JsonPositionStore;
use crate::adapters::paper_broker::{FixedAccount, PaperBroker};
use crate::adapters::settings::Settings;
use crate::domain::error::SwingtraderError;
use crate::engine::monitor::Monitor;
use crate::engine::scan;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::PositionStore;

#[derive(Parser, Debug)]
#[command(name = "swingtrader", about = "Momentum swing-trading monitor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the monitor loop (exits, scan, entries) on a fixed cadence
    Monitor {
        #[arg(short, long)]
        config: PathBuf,
        /// Run a single tick and exit
        #[arg(long)]
        once: bool,
    },
    /// Score the universe once and publish the candidate feed
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        /// Write the feed here instead of the configured path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the position store, open and closed
    Positions {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Monitor { config, once } => run_monitor(&config, once),
        Command::Scan { config, output } => run_scan(&config, output),
        Command::Positions { config } => run_positions(&config),
        Command::Validate { config } => run_validate(&config),
    }
}

fn load_settings(path: &PathBuf) -> Result<(FileConfigAdapter, Settings), ExitCode> {
    let adapter = FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    let settings = Settings::from_config(&adapter).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    Ok((adapter, settings))
}

fn build_runtime() -> Result<tokio::runtime::Runtime, ExitCode> {
    tokio::runtime::Runtime::new().map_err(|e| {
        let err = SwingtraderError::Io(e);
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_monitor(config_path: &PathBuf, once: bool) -> ExitCode {
    let (adapter, settings) = match load_settings(config_path) {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    let store = match JsonPositionStore::load(&settings.store_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };
    let store: Arc<Mutex<dyn PositionStore>> = Arc::new(Mutex::new(store));

    let provider = Arc::new(CsvBarAdapter::new(settings.data_dir.clone()));
    let broker = Arc::new(PaperBroker::new());
    let account_value = adapter.get_double("account", "value", 100_000.0);
    let account = Arc::new(FixedAccount::new(account_value));

    let mut monitor = Monitor::new(provider, broker, account, store, settings);

    let runtime = match build_runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };

    if once {
        return match runtime.block_on(monitor.tick()) {
            Ok(report) => {
                println!(
                    "tick complete: {} exits, {} partial exits, {} entries, {} skipped",
                    report.exits, report.partial_exits, report.entries, report.skipped
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::from(&e)
            }
        };
    }

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop_tx.send(true);
        }
    });

    match runtime.block_on(monitor.run(stop_rx)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_scan(config_path: &PathBuf, output: Option<PathBuf>) -> ExitCode {
    let (_, mut settings) = match load_settings(config_path) {
        Ok(pair) => pair,
        Err(code) => return code,
    };
    if let Some(path) = output {
        settings.feed_path = path;
    }
    let provider = Arc::new(CsvBarAdapter::new(settings.data_dir.clone()));

    let runtime = match build_runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };

    match runtime.block_on(scan::run_scan(provider, &settings)) {
        Ok(candidates) => {
            println!(
                "{:<8} {:>6} {:>8} {:>6} {:>7}",
                "SYMBOL", "TIER", "SCORE", "RS%", "READY"
            );
            for c in &candidates {
                println!(
                    "{:<8} {:>6} {:>8.3} {:>6.2} {:>7}",
                    c.symbol,
                    u8::from(c.tier),
                    c.composite_score,
                    c.relative_strength_percentile,
                    if c.ready { "yes" } else { "no" }
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_positions(config_path: &PathBuf) -> ExitCode {
    let (_, settings) = match load_settings(config_path) {
        Ok(pair) => pair,
        Err(code) => return code,
    };
    let store = match JsonPositionStore::load(&settings.store_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    let mut positions = store.all_positions();
    positions.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.opened_at.cmp(&b.opened_at)));
    if positions.is_empty() {
        println!("no positions");
        return ExitCode::SUCCESS;
    }

    println!(
        "{:<8} {:>7} {:>10} {:>10} {:>10} {:>12}",
        "SYMBOL", "STATUS", "ENTRY", "QTY", "REMAIN", "PNL"
    );
    for p in &positions {
        let status = if p.is_open() { "OPEN" } else { "CLOSED" };
        let pnl = p
            .realized_pnl
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} {:>7} {:>10.2} {:>10} {:>10} {:>12}",
            p.symbol, status, p.entry_price, p.quantity, p.quantity_remaining, pnl
        );
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    match load_settings(config_path) {
        Ok((_, settings)) => {
            println!(
                "config ok: {} symbols, benchmark {}, tick every {}s, max {} positions",
                settings.symbols.len(),
                settings.benchmark,
                settings.monitor.tick_interval_secs,
                settings.risk.max_concurrent_positions
            );
            ExitCode::SUCCESS
        }
        Err(code) => code,
    }
}
