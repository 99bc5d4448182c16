// =============================================================================
// Stochastic Oscillator (%K / %D)
// =============================================================================
//
// %K locates the current close inside the high/low range of the last
// `period` candles:
//
//   %K = (close - lowest_low) / (highest_high - lowest_low) * 100
//
// A perfectly flat window would divide by zero; that case is guarded and
// returns the neutral 50 instead of propagating a non-finite value.
//
// %D is the reference dashboard's simplified proxy `%K * 0.9`, NOT a true
// 3-period moving average of %K. Kept as-is for parity with the reference
// feed; a real SMA smoothing would be a separate, deliberate change.

use serde::{Deserialize, Serialize};

use crate::market_data::Candle;

/// Default look-back period.
pub const STOCHASTIC_PERIOD: usize = 14;

/// Neutral %K for short or flat windows.
pub const STOCHASTIC_NEUTRAL: f64 = 50.0;

/// Smoothing factor of the %D proxy.
const D_PROXY_FACTOR: f64 = 0.9;

/// %K / %D pair (latest values).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
}

impl Default for Stochastic {
    fn default() -> Self {
        Self {
            k: STOCHASTIC_NEUTRAL,
            d: STOCHASTIC_NEUTRAL,
        }
    }
}

/// Compute %K/%D over the last `period` candles.
///
/// Fewer than `period` candles returns the neutral `{50, 50}` pair.
pub fn calculate_stochastic(candles: &[Candle], period: usize) -> Stochastic {
    if period == 0 || candles.len() < period {
        return Stochastic::default();
    }

    let window = &candles[candles.len() - period..];
    let current_close = window[window.len() - 1].close;
    let low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);

    let k = if high == low {
        STOCHASTIC_NEUTRAL
    } else {
        (current_close - low) / (high - low) * 100.0
    };

    Stochastic {
        k,
        d: k * D_PROXY_FACTOR,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(low: f64, high: f64, close: f64) -> Candle {
        Candle {
            time: "10:00".into(),
            open: close,
            high,
            low,
            close,
            volume: 1,
        }
    }

    #[test]
    fn insufficient_data_is_neutral() {
        let candles: Vec<Candle> = (0..13).map(|i| candle(1.0, 2.0, 1.0 + i as f64 * 0.01)).collect();
        let st = calculate_stochastic(&candles, STOCHASTIC_PERIOD);
        assert_eq!(st.k, 50.0);
        assert_eq!(st.d, 50.0);
    }

    #[test]
    fn close_at_window_high_reads_100() {
        let mut candles: Vec<Candle> = (0..19)
            .map(|i| {
                let px = 1.0 + i as f64 * 0.0001;
                candle(px, px, px)
            })
            .collect();
        candles.push(candle(1.002, 1.002, 1.002));
        let st = calculate_stochastic(&candles, STOCHASTIC_PERIOD);
        assert!((st.k - 100.0).abs() < 1e-10);
        assert!((st.d - 90.0).abs() < 1e-10);
    }

    #[test]
    fn close_at_window_low_reads_0() {
        let mut candles: Vec<Candle> = (0..19)
            .map(|i| {
                let px = 2.0 - i as f64 * 0.001;
                candle(px, px, px)
            })
            .collect();
        candles.push(candle(1.9, 1.9, 1.9));
        let st = calculate_stochastic(&candles, STOCHASTIC_PERIOD);
        assert!(st.k.abs() < 1e-10);
    }

    #[test]
    fn midrange_close_reads_midway() {
        let mut candles = vec![candle(1.0, 2.0, 1.5); 14];
        candles[13] = candle(1.0, 2.0, 1.5);
        let st = calculate_stochastic(&candles, STOCHASTIC_PERIOD);
        assert!((st.k - 50.0).abs() < 1e-10);
        assert!((st.d - 45.0).abs() < 1e-10);
    }

    #[test]
    fn flat_window_is_guarded_not_nan() {
        let candles = vec![candle(1.1, 1.1, 1.1); 26];
        let st = calculate_stochastic(&candles, STOCHASTIC_PERIOD);
        assert!(st.k.is_finite());
        assert!(st.d.is_finite());
        assert_eq!(st.k, STOCHASTIC_NEUTRAL);
    }

    #[test]
    fn only_the_trailing_window_counts() {
        // An old extreme outside the window must not stretch the range.
        let mut candles = vec![candle(0.5, 10.0, 5.0)];
        candles.extend(std::iter::repeat(candle(1.0, 2.0, 2.0)).take(14));
        let st = calculate_stochastic(&candles, STOCHASTIC_PERIOD);
        assert!((st.k - 100.0).abs() < 1e-10);
    }
}
