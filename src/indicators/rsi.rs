// =============================================================================
// Relative Strength Index (RSI) — simple window average
// =============================================================================
//
// Momentum oscillator in [0, 100]. Over the last `period` closes, positive
// deltas accumulate as gains and absolute negative deltas as losses, both
// averaged over the plain window (no Wilder smoothing):
//
//   RS  = avg_gain / avg_loss
//   RSI = 100 - 100 / (1 + RS)
//
// Edge cases:
//   - fewer than `period + 1` closes  => 50 (neutral, charts must not crash
//     before enough history exists)
//   - no movement at all              => 50
//   - only gains (avg_loss == 0)      => 100

/// Neutral value returned when there is not enough history.
pub const RSI_NEUTRAL: f64 = 50.0;

/// Default look-back period.
pub const RSI_PERIOD: usize = 14;

/// Compute the RSI of the most recent `period` deltas of `closes`.
///
/// Needs `period + 1` closes (a delta consumes two); anything shorter
/// returns [`RSI_NEUTRAL`].
pub fn calculate_rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return RSI_NEUTRAL;
    }

    let start = closes.len() - period;
    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in start..closes.len() {
        let delta = closes[i] - closes[i - 1];
        if delta >= 0.0 {
            gains += delta;
        } else {
            losses += delta.abs();
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        // A perfectly flat window has no strength in either direction.
        if avg_gain == 0.0 {
            return RSI_NEUTRAL;
        }
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

// =============================================================================
// Tests
// =============================================================================
