// =============================================================================
// Central Application State — QuantFlow Engine
// =============================================================================
//
// The single source of truth for the engine. The tick loop is the only writer
// of market data; the dashboard API and WebSocket feed read serialisable
// snapshots produced at the end of each tick.
//
// Thread safety:
//   - Atomic counters for lock-free version tracking.
//   - parking_lot locks for mutable shared collections.
//   - The simulator + series live behind one Mutex so a tick is atomic from
//     the readers' point of view.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::advisor::AdvisorClient;
use crate::indicators::{compute_indicators, IndicatorSnapshot};
use crate::market_data::{Candle, CandleSeries, MarketSimulator};
use crate::runtime_config::{base_price, RuntimeConfig};
use crate::types::Trade;

/// Maximum number of recent trades retained for the dashboard log.
const MAX_RECENT_TRADES: usize = 100;
/// Maximum number of recent errors retained.
const MAX_RECENT_ERRORS: usize = 50;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// MarketEngine — the simulator plus the state it advances
// =============================================================================

/// The simulator together with the series and price it evolves. Held behind
/// one lock so every tick is all-or-nothing to readers.
pub struct MarketEngine {
    pub simulator: MarketSimulator,
    pub series: CandleSeries,
    pub last_price: f64,
}

// =============================================================================
// AppState
// =============================================================================

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Monotonically increasing version counter, incremented on every
    /// meaningful mutation. The WebSocket feed uses it to detect changes.
    pub state_version: AtomicU64,

    /// WebSocket message sequence number (incremented per message sent).
    pub ws_sequence_number: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: RwLock<RuntimeConfig>,

    // ── Market data ─────────────────────────────────────────────────────
    market: Mutex<MarketEngine>,
    indicators: RwLock<IndicatorSnapshot>,

    // ── Trade log ───────────────────────────────────────────────────────
    pub trades: RwLock<Vec<Trade>>,

    // ── Error log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── AI advisor ──────────────────────────────────────────────────────
    pub advisor: AdvisorClient,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct the engine state and bootstrap the candle history for the
    /// configured instrument. The returned value is wrapped in `Arc`
    /// immediately by the caller.
    pub fn new(config: RuntimeConfig) -> Self {
        let mut simulator = MarketSimulator::with_thread_noise();
        let series = simulator.generate_history(
            base_price(&config.symbol),
            config.history_candles,
            config.bucket_duration_ms,
        );
        let last_price = series.last_close().unwrap_or(base_price(&config.symbol));
        let indicators = compute_indicators(series.candles());

        Self {
            state_version: AtomicU64::new(1),
            ws_sequence_number: AtomicU64::new(0),
            runtime_config: RwLock::new(config),
            market: Mutex::new(MarketEngine {
                simulator,
                series,
                last_price,
            }),
            indicators: RwLock::new(indicators),
            trades: RwLock::new(Vec::new()),
            recent_errors: RwLock::new(Vec::new()),
            advisor: AdvisorClient::from_env(),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version management ──────────────────────────────────────────────

    /// Atomically increment the state version. Call after every meaningful
    /// mutation so WebSocket clients learn fresh data is available.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Market access ───────────────────────────────────────────────────

    /// Run one simulation tick: advance the walk, fold the price into the
    /// series, recompute the indicator snapshot, and publish a new version.
    pub fn tick(&self) {
        let snapshot = {
            let mut market = self.market.lock();
            let MarketEngine {
                simulator,
                series,
                last_price,
            } = &mut *market;

            *last_price = simulator.advance(*last_price, series);
            compute_indicators(series.candles())
        };

        *self.indicators.write() = snapshot;
        self.increment_version();
    }

    /// Throw away the current series and bootstrap a fresh history for the
    /// configured instrument (called on symbol change).
    pub fn reset_market(&self) {
        let (symbol, count, bucket_ms) = {
            let config = self.runtime_config.read();
            (
                config.symbol.clone(),
                config.history_candles,
                config.bucket_duration_ms,
            )
        };

        let snapshot = {
            let mut market = self.market.lock();
            let MarketEngine {
                simulator,
                series,
                last_price,
            } = &mut *market;

            *series = simulator.generate_history(base_price(&symbol), count, bucket_ms);
            *last_price = series.last_close().unwrap_or(base_price(&symbol));
            compute_indicators(series.candles())
        };

        *self.indicators.write() = snapshot;
        self.increment_version();
    }

    /// Latest tick price.
    pub fn last_price(&self) -> f64 {
        self.market.lock().last_price
    }

    /// Cloned copy of the full candle history (read-only to callers).
    pub fn candles(&self) -> Vec<Candle> {
        self.market.lock().series.candles().to_vec()
    }

    /// Latest indicator snapshot.
    pub fn indicator_snapshot(&self) -> IndicatorSnapshot {
        *self.indicators.read()
    }

    // ── Trade log ───────────────────────────────────────────────────────

    /// Record a simulated fill, newest first, capped at
    /// [`MAX_RECENT_TRADES`].
    pub fn push_trade(&self, trade: Trade) {
        let mut trades = self.trades.write();
        trades.insert(0, trade);
        trades.truncate(MAX_RECENT_TRADES);
        drop(trades);

        self.increment_version();
    }

    // ── Error logging ───────────────────────────────────────────────────

    /// Record an error message. The ring is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted.
    pub fn push_error(&self, msg: String) {
        let record = ErrorRecord {
            message: msg,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
        drop(errors);

        self.increment_version();
    }

    // ── Snapshot builder ────────────────────────────────────────────────

    /// Build a complete, serialisable snapshot of the engine state — the
    /// payload of `GET /api/v1/state` and the WebSocket push feed.
    pub fn build_snapshot(&self) -> StateSnapshot {
        let config = self.runtime_config.read().clone();
        let (candles, last_price) = {
            let market = self.market.lock();
            (market.series.candles().to_vec(), market.last_price)
        };

        StateSnapshot {
            state_version: self.current_state_version(),
            server_time: Utc::now().timestamp_millis(),
            uptime_s: self.start_time.elapsed().as_secs(),
            symbol: config.symbol.clone(),
            last_price,
            bot_active: config.bot_active,
            candles,
            indicators: *self.indicators.read(),
            trades: self.trades.read().clone(),
            recent_errors: self.recent_errors.read().clone(),
            config,
        }
    }
}

// =============================================================================
// Serialisable snapshot
// =============================================================================

/// Full engine state snapshot sent to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_s: u64,
    pub symbol: String,
    pub last_price: f64,
    pub bot_active: bool,
    pub candles: Vec<Candle>,
    pub indicators: IndicatorSnapshot,
    pub trades: Vec<Trade>,
    pub recent_errors: Vec<ErrorRecord>,
    pub config: RuntimeConfig,
}

// =============================================================================
// Tests
// =============================================================================
