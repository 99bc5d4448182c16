// =============================================================================
// Shared types used across the QuantFlow engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Direction of a simulated trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle state of a simulated trade. The toy fill model closes trades
/// immediately, but the dashboard contract keeps both states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Closed,
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Rule set the bot applies when evaluating the latest indicator snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    Scalping,
    RsiMacd,
    MaCross,
    AiAdaptive,
}

impl Default for StrategyKind {
    fn default() -> Self {
        Self::Scalping
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalping => write!(f, "SCALPING"),
            Self::RsiMacd => write!(f, "RSI_MACD"),
            Self::MaCross => write!(f, "MA_CROSS"),
            Self::AiAdaptive => write!(f, "AI_ADAPTIVE"),
        }
    }
}

/// Coarse risk appetite knob shown on the dashboard and fed into AI prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl Default for RiskLevel {
    fn default() -> Self {
        Self::High
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// One simulated fill produced by the rule bot. Purely cosmetic P&L — there
/// is no broker, no position management, no persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub side: TradeSide,
    pub entry_price: f64,
    pub lot_size: f64,
    pub profit: f64,
    pub status: TradeStatus,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
}
