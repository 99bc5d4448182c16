// =============================================================================
// Exponential Moving Average (EMA) — full-series refold
// =============================================================================
//
// Recency-weighted average with multiplier k = 2 / (period + 1):
//
//   ema_0 = values[0]
//   ema_t = value_t * k + ema_{t-1} * (1 - k)
//
// The fold is seeded with the FIRST element and runs over the entire series,
// not a trailing window. The seeding policy matters: an SMA-seeded or
// incremental EMA diverges numerically from this refold on the same data, and
// MACD reuses the same fold so the two stay bit-compatible.

/// Default look-back period for the dashboard EMA.
pub const EMA_PERIOD: usize = 20;

/// EMA value series, one element per input, seeded from `values[0]`.
///
/// Empty input yields an empty vec.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() || period == 0 {
        return Vec::new();
    }

    let k = 2.0 / (period + 1) as f64;
    let mut ema = values[0];
    let mut out = Vec::with_capacity(values.len());
    out.push(ema);

    for &value in &values[1..] {
        ema = value * k + ema * (1.0 - k);
        out.push(ema);
    }

    out
}

/// Final EMA over the whole series.
///
/// With fewer than `period` closes the smoothing has nothing meaningful to
/// average, so the last close is returned as-is (0.0 when the series is
/// empty).
pub fn calculate_ema(closes: &[f64], period: usize) -> f64 {
    if closes.is_empty() {
        return 0.0;
    }
    if closes.len() < period {
        return closes[closes.len() - 1];
    }
    ema_series(closes, period).last().copied().unwrap_or(0.0)
}

// =============================================================================
// Tests
// =============================================================================
