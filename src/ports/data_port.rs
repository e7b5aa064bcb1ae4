//! Market-data port trait.

use crate::domain::error::SwingtraderError;
use crate::domain::ohlcv::Bar;
use async_trait::async_trait;

/// External bar-series provider. Implementations are network-bound; the
/// monitor wraps every call in a timeout and treats failures as per-symbol
/// skips, never batch aborts.
#[async_trait]
pub trait BarProvider: Send + Sync {
    /// Fetch up to `lookback_bars` daily bars for `symbol`, oldest first.
    /// Returning fewer bars than the scorer's minimum makes the symbol
    /// unscorable for the tick; that is the caller's check, not an error
    /// here.
    async fn fetch_bars(&self, symbol: &str, lookback_bars: usize)
        -> Result<Vec<Bar>, SwingtraderError>;
}
