// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Mean ± k·σ envelope over the last `period` closes. σ is the population
// standard deviation (divide by `period`, not `period - 1`).

use serde::{Deserialize, Serialize};

/// Default look-back period.
pub const BOLLINGER_PERIOD: usize = 20;

/// Default band width in standard deviations.
pub const BOLLINGER_STD_MULT: f64 = 2.0;

/// Upper/middle/lower band triple.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Compute the bands over the last `period` closes.
///
/// Fewer than `period` closes returns the all-zero triple — the dashboard
/// hides the bands until the window fills.
pub fn calculate_bollinger(closes: &[f64], period: usize, std_mult: f64) -> BollingerBands {
    if period == 0 || closes.len() < period {
        return BollingerBands::default();
    }

    let window = &closes[closes.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
    let std_dev = variance.sqrt();

    BollingerBands {
        upper: mean + std_dev * std_mult,
        middle: mean,
        lower: mean - std_dev * std_mult,
    }
}

// =============================================================================
// Tests
// =============================================================================
