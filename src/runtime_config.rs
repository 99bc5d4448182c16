// =============================================================================
// Runtime Configuration — Hot-reloadable engine settings with atomic save
// =============================================================================
//
// Every tunable the dashboard can touch lives here: instrument, bot settings,
// and the simulation cadence. Persistence uses a tmp + rename pattern so a
// crash mid-write cannot corrupt the file, and every field carries a serde
// default so older config files keep loading after new fields appear.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::{RiskLevel, StrategyKind};

/// Instruments the simulator knows a realistic base price for. Anything else
/// falls back to [`FALLBACK_BASE_PRICE`].
pub const SUPPORTED_SYMBOLS: &[(&str, f64)] = &[
    ("EURUSD", 1.0850),
    ("GBPUSD", 1.2650),
    ("USDJPY", 150.20),
    ("XAUUSD", 2350.50),
    ("BTCUSD", 64_000.00),
    ("ETHUSD", 3400.00),
    ("AUDUSD", 0.6550),
    ("USDCAD", 1.3550),
];

/// Base price for symbols missing from the table.
pub const FALLBACK_BASE_PRICE: f64 = 1.0000;

/// Bootstrap start price for `symbol`, so the chart looks right when the
/// instrument switches.
pub fn base_price(symbol: &str) -> f64 {
    SUPPORTED_SYMBOLS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, px)| *px)
        .unwrap_or(FALLBACK_BASE_PRICE)
}

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbol() -> String {
    "EURUSD".to_string()
}

fn default_lot_size() -> f64 {
    0.1
}

fn default_stop_loss_pips() -> f64 {
    50.0
}

fn default_take_profit_pips() -> f64 {
    100.0
}

fn default_tick_interval_ms() -> u64 {
    500
}

fn default_history_candles() -> usize {
    300
}

fn default_bucket_duration_ms() -> i64 {
    60_000
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the QuantFlow engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Instrument ----------------------------------------------------------
    /// Instrument the simulator is currently producing.
    #[serde(default = "default_symbol")]
    pub symbol: String,

    // --- Bot settings --------------------------------------------------------
    /// Lot size used by simulated fills.
    #[serde(default = "default_lot_size")]
    pub lot_size: f64,

    /// Nominal stop loss in pips (display/prompt only — the toy fill model
    /// closes trades instantly).
    #[serde(default = "default_stop_loss_pips")]
    pub stop_loss_pips: f64,

    /// Nominal take profit in pips (display/prompt only).
    #[serde(default = "default_take_profit_pips")]
    pub take_profit_pips: f64,

    /// Rule set the bot evaluates.
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Risk appetite shown on the dashboard and passed to the AI advisor.
    #[serde(default)]
    pub risk_level: RiskLevel,

    /// Whether the bot evaluates signals at all. Forced off at startup;
    /// the dashboard arms it explicitly.
    #[serde(default)]
    pub bot_active: bool,

    // --- Simulation cadence --------------------------------------------------
    /// Wall-clock period of the live tick loop.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Candle count generated at bootstrap / instrument switch.
    #[serde(default = "default_history_candles")]
    pub history_candles: usize,

    /// Nominal duration of one history bucket.
    #[serde(default = "default_bucket_duration_ms")]
    pub bucket_duration_ms: i64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            lot_size: default_lot_size(),
            stop_loss_pips: default_stop_loss_pips(),
            take_profit_pips: default_take_profit_pips(),
            strategy: StrategyKind::default(),
            risk_level: RiskLevel::default(),
            bot_active: false,
            tick_interval_ms: default_tick_interval_ms(),
            history_candles: default_history_candles(),
            bucket_duration_ms: default_bucket_duration_ms(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbol = %config.symbol,
            strategy = %config.strategy,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise runtime config")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.symbol, "EURUSD");
        assert_eq!(cfg.lot_size, 0.1);
        assert_eq!(cfg.stop_loss_pips, 50.0);
        assert_eq!(cfg.take_profit_pips, 100.0);
        assert_eq!(cfg.strategy, StrategyKind::Scalping);
        assert_eq!(cfg.risk_level, RiskLevel::High);
        assert!(!cfg.bot_active);
        assert_eq!(cfg.tick_interval_ms, 500);
        assert_eq!(cfg.history_candles, 300);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.symbol, "EURUSD");
        assert!(!cfg.bot_active);
        assert_eq!(cfg.tick_interval_ms, 500);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "symbol": "BTCUSD", "strategy": "RSI_MACD" }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.symbol, "BTCUSD");
        assert_eq!(cfg.strategy, StrategyKind::RsiMacd);
        assert_eq!(cfg.lot_size, 0.1);
        assert_eq!(cfg.history_candles, 300);
    }

    #[test]
    fn roundtrip_serialisation() {
        let mut cfg = RuntimeConfig::default();
        cfg.symbol = "XAUUSD".into();
        cfg.bot_active = true;
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: RuntimeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.symbol, cfg2.symbol);
        assert_eq!(cfg.bot_active, cfg2.bot_active);
        assert_eq!(cfg.strategy, cfg2.strategy);
    }

    #[test]
    fn base_price_table_lookup() {
        assert_eq!(base_price("EURUSD"), 1.0850);
        assert_eq!(base_price("BTCUSD"), 64_000.00);
        assert_eq!(base_price("NOPE"), FALLBACK_BASE_PRICE);
    }
}
