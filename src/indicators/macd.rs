// =============================================================================
// Moving Average Convergence/Divergence (MACD) — 12/26/9
// =============================================================================
//
// macd_line[i] = ema12[i] - ema26[i] over the full series, with both EMA
// arrays seeded from the first close (see ema.rs — the seeding policy is what
// keeps repeated recomputation bit-identical). The signal line is the
// 9-period EMA of the macd line; the histogram is their final difference.

use serde::{Deserialize, Serialize};

use super::ema::ema_series;

/// Fast EMA period.
pub const MACD_FAST: usize = 12;
/// Slow EMA period.
pub const MACD_SLOW: usize = 26;
/// Signal-line EMA period.
pub const MACD_SIGNAL: usize = 9;

/// MACD line / signal line / histogram triple (latest values).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute MACD over the whole close series.
///
/// Fewer than [`MACD_SLOW`] closes returns the all-zero triple.
pub fn calculate_macd(closes: &[f64]) -> Macd {
    if closes.len() < MACD_SLOW {
        return Macd::default();
    }

    let fast = ema_series(closes, MACD_FAST);
    let slow = ema_series(closes, MACD_SLOW);

    let macd_line: Vec<f64> = fast.iter().zip(slow.iter()).map(|(f, s)| f - s).collect();
    let signal_line = ema_series(&macd_line, MACD_SIGNAL);

    let macd = *macd_line.last().expect("non-empty by the length guard");
    let signal = *signal_line.last().expect("same length as macd_line");

    Macd {
        macd,
        signal,
        histogram: macd - signal,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_returns_zeroes() {
        let closes: Vec<f64> = (1..=25).map(|x| x as f64).collect();
        assert_eq!(calculate_macd(&closes), Macd::default());
    }

    #[test]
    fn flat_series_is_all_zero() {
        // Identical closes: both EMAs equal the price, macd line is zero
        // everywhere, so signal and histogram are too.
        let closes = vec![1.1; 26];
        let macd = calculate_macd(&closes);
        assert_eq!(macd.macd, 0.0);
        assert_eq!(macd.signal, 0.0);
        assert_eq!(macd.histogram, 0.0);
    }

    #[test]
    fn rising_series_has_positive_histogram() {
        // Steady climb: the fast EMA leads the slow one and the signal lags
        // the macd line, so the histogram ends positive.
        let closes: Vec<f64> = (0..30).map(|i| 1.0 + i as f64 * 0.0001).collect();
        let macd = calculate_macd(&closes);
        assert!(macd.macd > 0.0);
        assert!(macd.histogram > 0.0);
    }

    #[test]
    fn falling_series_has_negative_histogram() {
        let closes: Vec<f64> = (0..30).map(|i| 2.0 - i as f64 * 0.0001).collect();
        let macd = calculate_macd(&closes);
        assert!(macd.macd < 0.0);
        assert!(macd.histogram < 0.0);
    }

    #[test]
    fn recomputation_is_bit_identical() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect();
        let a = calculate_macd(&closes);
        let b = calculate_macd(&closes);
        assert_eq!(a.macd.to_bits(), b.macd.to_bits());
        assert_eq!(a.signal.to_bits(), b.signal.to_bits());
        assert_eq!(a.histogram.to_bits(), b.histogram.to_bits());
    }

    #[test]
    fn histogram_is_macd_minus_signal() {
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + (i as f64 * 0.5).cos()).collect();
        let macd = calculate_macd(&closes);
        assert!((macd.histogram - (macd.macd - macd.signal)).abs() < 1e-15);
    }
}
