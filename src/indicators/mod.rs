// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free functions over an oldest-first candle slice. Every
// indicator is recomputed from scratch on each call (the retention cap bounds
// the cost) and degrades to a documented neutral default on short history —
// the feed must keep producing numbers from the very first tick.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod stochastic;

use serde::{Deserialize, Serialize};

use crate::market_data::Candle;

pub use bollinger::BollingerBands;
pub use macd::Macd;
pub use stochastic::Stochastic;

/// All dashboard indicators derived from one candle series at one instant.
///
/// Immutable once produced; each tick replaces the previous snapshot rather
/// than mutating it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub ema: f64,
    pub bollinger: BollingerBands,
    pub macd: Macd,
    pub stochastic: Stochastic,
}

/// Run every indicator independently and assemble the snapshot. There is no
/// cross-indicator coupling; each one sees the same input slice.
pub fn compute_indicators(candles: &[Candle]) -> IndicatorSnapshot {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    IndicatorSnapshot {
        rsi: rsi::calculate_rsi(&closes, rsi::RSI_PERIOD),
        ema: ema::calculate_ema(&closes, ema::EMA_PERIOD),
        bollinger: bollinger::calculate_bollinger(
            &closes,
            bollinger::BOLLINGER_PERIOD,
            bollinger::BOLLINGER_STD_MULT,
        ),
        macd: macd::calculate_macd(&closes),
        stochastic: stochastic::calculate_stochastic(candles, stochastic::STOCHASTIC_PERIOD),
    }
}

// =============================================================================
// Tests — end-to-end snapshot scenarios
// =============================================================================
