//! Technical indicator functions.
//!
//! Every function evaluates the indicator at the *latest* bar of the series
//! and returns a scalar. Short histories degrade to a documented neutral
//! fallback instead of erroring, and every divisor is floored at [`EPSILON`]
//! so no input can produce NaN or infinity.

use crate::domain::ohlcv::Bar;

/// Floor applied to all denominators.
pub const EPSILON: f64 = 1e-9;

fn floored(x: f64) -> f64 {
    x.max(EPSILON)
}

/// Simple moving average of the last `len` values.
///
/// Fallback: fewer than `len` values returns the last value (degenerate mean
/// of what exists, anchored on the current price), not an error.
pub fn sma(series: &[f64], len: usize) -> f64 {
    let n = series.len();
    if n == 0 {
        return 0.0;
    }
    if len == 0 || n < len {
        return series[n - 1];
    }
    series[n - len..].iter().sum::<f64>() / len as f64
}

/// Rate of change over `len` bars, in percent.
///
/// Fallback: 0 when the lookback reaches past the start of the series.
pub fn roc(series: &[f64], len: usize) -> f64 {
    let n = series.len();
    if len == 0 || n < len + 1 {
        return 0.0;
    }
    let base = series[n - 1 - len];
    (series[n - 1] - base) / floored(base) * 100.0
}

/// Wilder-style RSI over the trailing `len` closes.
///
/// Average gain and average loss are taken over the trailing window; the
/// loss average is epsilon-floored. Fallback: 50 (neutral) on short
/// histories, which avoids spurious signals before enough bars exist.
pub fn rsi(series: &[f64], len: usize) -> f64 {
    let n = series.len();
    if len == 0 || n < len {
        return 50.0;
    }
    let window = &series[n - len..];
    let mut gains = 0.0;
    let mut losses = 0.0;
    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }
    let avg_gain = gains / len as f64;
    let avg_loss = losses / len as f64;
    let rs = avg_gain / floored(avg_loss);
    100.0 - (100.0 / (1.0 + rs))
}

/// Z-score of the latest value against the trailing `len` window.
///
/// Fallback: 0 on short histories or when the window stddev is below
/// [`EPSILON`] (flat series).
pub fn z_score(series: &[f64], len: usize) -> f64 {
    let n = series.len();
    if len == 0 || n < len {
        return 0.0;
    }
    let window = &series[n - len..];
    let mean = window.iter().sum::<f64>() / len as f64;
    let variance = window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / len as f64;
    let stddev = variance.sqrt();
    if stddev < EPSILON {
        return 0.0;
    }
    (series[n - 1] - mean) / stddev
}

/// Wilder average true range over the trailing `len` bars.
///
/// Fallback: 0 when fewer than `len + 1` bars exist (a true range needs a
/// previous close).
pub fn atr(bars: &[Bar], len: usize) -> f64 {
    let n = bars.len();
    if len == 0 || n < len + 1 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in n - len..n {
        sum += bars[i].true_range(bars[i - 1].close);
    }
    sum / len as f64
}
