// =============================================================================
// Rule Bot — toy strategy evaluation over the latest indicator snapshot
// =============================================================================
//
// A handful of comparison rules, not a trading system: no risk engine, no
// position management, no order routing. Signals that fire are filled with a
// coin-flip probability and booked as instantly-closed trades with cosmetic
// P&L, which keeps the dashboard's trade log moving.

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::indicators::IndicatorSnapshot;
use crate::runtime_config::RuntimeConfig;
use crate::types::{StrategyKind, Trade, TradeSide, TradeStatus};

// ── Rule thresholds ──────────────────────────────────────────────────────────

/// RSI bounds for the aggressive scalping rules.
const SCALP_OVERSOLD: f64 = 25.0;
const SCALP_OVERBOUGHT: f64 = 75.0;

/// RSI bounds for the standard trend rules.
const TREND_OVERSOLD: f64 = 30.0;
const TREND_OVERBOUGHT: f64 = 70.0;

/// A fired signal fills when the uniform draw exceeds this.
const FILL_ABOVE: f64 = 0.5;

/// What the rules concluded for this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotSignal {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl BotSignal {
    /// Trade direction for this signal, if it trades at all.
    pub fn side(self) -> Option<TradeSide> {
        match self {
            Self::StrongBuy | Self::Buy => Some(TradeSide::Buy),
            Self::Hold => None,
            Self::Sell | Self::StrongSell => Some(TradeSide::Sell),
        }
    }
}

/// Evaluate the configured strategy against the latest snapshot and price.
///
/// Scalping looks for RSI extremes confirmed by a Bollinger band breach;
/// every other strategy is a plain RSI threshold rule.
pub fn evaluate(strategy: StrategyKind, snapshot: &IndicatorSnapshot, last_price: f64) -> BotSignal {
    match strategy {
        StrategyKind::Scalping => {
            if snapshot.rsi < SCALP_OVERSOLD && last_price < snapshot.bollinger.lower {
                BotSignal::StrongBuy
            } else if snapshot.rsi > SCALP_OVERBOUGHT && last_price > snapshot.bollinger.upper {
                BotSignal::StrongSell
            } else {
                BotSignal::Hold
            }
        }
        StrategyKind::RsiMacd | StrategyKind::MaCross | StrategyKind::AiAdaptive => {
            if snapshot.rsi < TREND_OVERSOLD {
                BotSignal::Buy
            } else if snapshot.rsi > TREND_OVERBOUGHT {
                BotSignal::Sell
            } else {
                BotSignal::Hold
            }
        }
    }
}

/// Turn a fired signal into a simulated fill, given two uniform draws in
/// [0, 1): one decides whether the order fills, the other sets the toy P&L
/// (a few pips either way, slightly profit-biased).
///
/// Split out from [`execute`] so tests can feed exact draws.
pub fn fill_trade(
    signal: BotSignal,
    config: &RuntimeConfig,
    last_price: f64,
    fill_draw: f64,
    profit_draw: f64,
) -> Option<Trade> {
    let side = signal.side()?;
    if fill_draw <= FILL_ABOVE {
        return None;
    }

    let profit_pips = (profit_draw - 0.45) * 10.0;
    let profit = profit_pips * config.lot_size * 10.0;

    Some(Trade {
        id: Uuid::new_v4().to_string(),
        symbol: config.symbol.clone(),
        side,
        entry_price: last_price,
        lot_size: config.lot_size,
        profit,
        status: TradeStatus::Closed,
        timestamp: Utc::now().timestamp_millis(),
    })
}

/// Evaluate and (maybe) fill in one step, drawing from the thread RNG.
pub fn execute(config: &RuntimeConfig, snapshot: &IndicatorSnapshot, last_price: f64) -> Option<Trade> {
    let signal = evaluate(config.strategy, snapshot, last_price);
    let mut rng = rand::rng();
    let fill_draw = rng.random::<f64>();
    let profit_draw = rng.random::<f64>();
    fill_trade(signal, config, last_price, fill_draw, profit_draw)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::BollingerBands;

    fn snapshot(rsi: f64, lower: f64, upper: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi,
            bollinger: BollingerBands {
                upper,
                middle: (upper + lower) / 2.0,
                lower,
            },
            ..Default::default()
        }
    }

    #[test]
    fn scalping_needs_band_breach_and_rsi_extreme() {
        let snap = snapshot(20.0, 1.08, 1.09);

        // RSI oversold AND below the lower band: strong buy.
        assert_eq!(
            evaluate(StrategyKind::Scalping, &snap, 1.07),
            BotSignal::StrongBuy
        );
        // RSI oversold but price inside the bands: hold.
        assert_eq!(
            evaluate(StrategyKind::Scalping, &snap, 1.085),
            BotSignal::Hold
        );
    }

    #[test]
    fn scalping_strong_sell_above_upper_band() {
        let snap = snapshot(80.0, 1.08, 1.09);
        assert_eq!(
            evaluate(StrategyKind::Scalping, &snap, 1.095),
            BotSignal::StrongSell
        );
    }

    #[test]
    fn trend_strategies_use_plain_rsi_thresholds() {
        for strategy in [
            StrategyKind::RsiMacd,
            StrategyKind::MaCross,
            StrategyKind::AiAdaptive,
        ] {
            assert_eq!(
                evaluate(strategy, &snapshot(25.0, 1.0, 2.0), 1.5),
                BotSignal::Buy
            );
            assert_eq!(
                evaluate(strategy, &snapshot(75.0, 1.0, 2.0), 1.5),
                BotSignal::Sell
            );
            assert_eq!(
                evaluate(strategy, &snapshot(50.0, 1.0, 2.0), 1.5),
                BotSignal::Hold
            );
        }
    }

    #[test]
    fn hold_never_trades() {
        let config = RuntimeConfig::default();
        assert!(fill_trade(BotSignal::Hold, &config, 1.0, 0.99, 0.99).is_none());
    }

    #[test]
    fn fill_is_a_coin_flip() {
        let config = RuntimeConfig::default();
        assert!(fill_trade(BotSignal::Buy, &config, 1.0, 0.4, 0.5).is_none());
        assert!(fill_trade(BotSignal::Buy, &config, 1.0, 0.6, 0.5).is_some());
    }

    #[test]
    fn trade_carries_config_and_price() {
        let mut config = RuntimeConfig::default();
        config.symbol = "BTCUSD".into();
        config.lot_size = 0.2;

        let trade = fill_trade(BotSignal::StrongSell, &config, 64_250.0, 0.9, 0.45).unwrap();
        assert_eq!(trade.symbol, "BTCUSD");
        assert_eq!(trade.side, TradeSide::Sell);
        assert_eq!(trade.entry_price, 64_250.0);
        assert_eq!(trade.lot_size, 0.2);
        assert_eq!(trade.status, TradeStatus::Closed);
        assert!(!trade.id.is_empty());
    }

    #[test]
    fn profit_formula_is_pips_times_lot() {
        let config = RuntimeConfig::default(); // lot 0.1

        // Draw exactly at the bias point: zero P&L.
        let flat = fill_trade(BotSignal::Buy, &config, 1.0, 0.9, 0.45).unwrap();
        assert!(flat.profit.abs() < 1e-12);

        // Max draw: (1.0 - 0.45) * 10 pips * 0.1 lot * 10 = 5.5.
        let win = fill_trade(BotSignal::Buy, &config, 1.0, 0.9, 1.0).unwrap();
        assert!((win.profit - 5.5).abs() < 1e-12);

        // Min draw: (0.0 - 0.45) * 10 * 0.1 * 10 = -4.5.
        let loss = fill_trade(BotSignal::Buy, &config, 1.0, 0.9, 0.0).unwrap();
        assert!((loss.profit + 4.5).abs() < 1e-12);
    }
}
