//! Scan cycle: fetch, score, rank, publish the candidate feed.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::adapters::settings::{MonitorConfig, Settings};
use crate::domain::error::SwingtraderError;
use crate::domain::ohlcv::Bar;
use crate::domain::scorer::{score_candidate, Candidate, Tier};
use crate::ports::data_port::BarProvider;

/// Fetch bars for a batch of symbols, bounded by the concurrent-fetch limit
/// and a per-symbol timeout. Failures and timeouts are logged and dropped
/// from the result; the caller treats an absent symbol as a skip for the
/// tick.
pub async fn fetch_all_bars(
    provider: Arc<dyn BarProvider>,
    symbols: &[String],
    cfg: &MonitorConfig,
) -> HashMap<String, Vec<Bar>> {
    let semaphore = Arc::new(Semaphore::new(cfg.max_concurrent_fetches.max(1)));
    let timeout = Duration::from_secs(cfg.fetch_timeout_secs);
    let lookback = cfg.lookback_bars;

    let mut set = JoinSet::new();
    for symbol in symbols {
        let provider = Arc::clone(&provider);
        let semaphore = Arc::clone(&semaphore);
        let symbol = symbol.clone();
        set.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return None;
            };
            match tokio::time::timeout(timeout, provider.fetch_bars(&symbol, lookback)).await {
                Ok(Ok(bars)) => Some((symbol, bars)),
                Ok(Err(e)) => {
                    warn!(symbol, error = %e, "bar fetch failed; skipping for this tick");
                    None
                }
                Err(_) => {
                    warn!(
                        symbol,
                        timeout_secs = timeout.as_secs(),
                        "bar fetch timed out; skipping for this tick"
                    );
                    None
                }
            }
        });
    }

    let mut bars_by_symbol = HashMap::new();
    while let Some(joined) = set.join_next().await {
        if let Ok(Some((symbol, bars))) = joined {
            bars_by_symbol.insert(symbol, bars);
        }
    }
    bars_by_symbol
}

/// Fetch the benchmark series. Without it nothing can be ranked, so a
/// failure here aborts the scan rather than degrading it.
pub async fn fetch_benchmark(
    provider: &dyn BarProvider,
    settings: &Settings,
) -> Result<Vec<Bar>, SwingtraderError> {
    let timeout = Duration::from_secs(settings.monitor.fetch_timeout_secs);
    tokio::time::timeout(
        timeout,
        provider.fetch_bars(&settings.benchmark, settings.monitor.lookback_bars),
    )
    .await
    .map_err(|_| SwingtraderError::DataUnavailable {
        symbol: settings.benchmark.clone(),
        bars: 0,
        minimum: settings.scorer.min_bars,
    })?
}

/// Score every fetched symbol against the benchmark and rank by composite
/// score, best first. Unscorable symbols are logged and skipped.
pub fn rank_candidates(
    bars_by_symbol: &HashMap<String, Vec<Bar>>,
    benchmark: &[Bar],
    settings: &Settings,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for symbol in &settings.symbols {
        let Some(bars) = bars_by_symbol.get(symbol) else {
            continue;
        };
        match score_candidate(symbol, bars, benchmark, &settings.scorer) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => warn!(symbol, error = %e, "unscorable; skipping for this tick"),
        }
    }
    candidates.sort_by(|a, b| b.composite_score.total_cmp(&a.composite_score));
    candidates
}

/// Feed entry consumed by downstream reporting. Stable schema; dashboards
/// read it without coupling to internal types.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedEntry<'a> {
    symbol: &'a str,
    composite_score: f64,
    relative_strength_percentile: f64,
    tier: Tier,
}

/// Publish the ranked feed atomically (write-new-then-rename), so readers
/// never observe a half-written file.
pub fn write_feed(path: &Path, candidates: &[Candidate]) -> Result<(), SwingtraderError> {
    let entries: Vec<FeedEntry<'_>> = candidates
        .iter()
        .map(|c| FeedEntry {
            symbol: &c.symbol,
            composite_score: c.composite_score,
            relative_strength_percentile: c.relative_strength_percentile,
            tier: c.tier,
        })
        .collect();
    let json =
        serde_json::to_string_pretty(&entries).map_err(|e| SwingtraderError::Persist {
            reason: format!("serialize feed: {e}"),
        })?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| SwingtraderError::Persist {
        reason: format!("write {}: {e}", tmp.display()),
    })?;
    std::fs::rename(&tmp, path).map_err(|e| SwingtraderError::Persist {
        reason: format!("rename into {}: {e}", path.display()),
    })
}

/// One standalone scan cycle: fetch, rank, publish.
pub async fn run_scan(
    provider: Arc<dyn BarProvider>,
    settings: &Settings,
) -> Result<Vec<Candidate>, SwingtraderError> {
    let benchmark = fetch_benchmark(provider.as_ref(), settings).await?;
    let bars_by_symbol = fetch_all_bars(Arc::clone(&provider), &settings.symbols, &settings.monitor).await;
    let candidates = rank_candidates(&bars_by_symbol, &benchmark, settings);
    write_feed(&settings.feed_path, &candidates)?;
    info!(
        scored = candidates.len(),
        universe = settings.symbols.len(),
        feed = %settings.feed_path.display(),
        "scan complete"
    );
    Ok(candidates)
}
