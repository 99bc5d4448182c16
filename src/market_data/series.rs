// =============================================================================
// Candle & CandleSeries — bounded OHLCV history
// =============================================================================
//
// A CandleSeries is an append-only, chronologically ordered run of candles
// with a fixed retention cap: pushing past the cap evicts the oldest candle.
// The last candle is the open bucket and may be extended in place by the
// simulator; everything else is immutable history.
//
// Invariant for every candle: low <= min(open, close) <= max(open, close) <= high.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Maximum number of candles retained before the oldest is evicted.
pub const DEFAULT_CAPACITY: usize = 500;

/// One time-bucketed OHLCV price sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    /// Display-formatted HH:MM bucket label. Used only for bucket-rollover
    /// detection and chart axes — never parsed back into a numeric time.
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Tick count within the bucket.
    pub volume: u64,
}

impl Candle {
    /// A fresh single-tick candle where all four prices collapse to `price`.
    pub fn single_tick(time: String, price: f64) -> Self {
        Self {
            time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 1,
        }
    }

    /// True when the OHLC ordering invariant holds.
    pub fn is_well_formed(&self) -> bool {
        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        self.low <= body_low && body_high <= self.high
    }
}

/// Format a wall-clock instant as the HH:MM bucket label used by candles.
pub fn bucket_label(at: DateTime<Local>) -> String {
    at.format("%H:%M").to_string()
}

/// Chronologically ordered candle history with drop-oldest-on-overflow
/// semantics. There is exactly one writer (the simulator); everyone else
/// reads slices or cloned snapshots.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    candles: Vec<Candle>,
    capacity: usize,
}

impl Default for CandleSeries {
    fn default() -> Self {
        Self::new()
    }
}

impl CandleSeries {
    /// Series with the standard retention cap.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Series with a custom retention cap (tests use small caps).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            candles: Vec::with_capacity(capacity.min(DEFAULT_CAPACITY) + 1),
            capacity: capacity.max(1),
        }
    }

    /// Append a candle, evicting the oldest if the cap is exceeded.
    pub fn push(&mut self, candle: Candle) {
        self.candles.push(candle);
        while self.candles.len() > self.capacity {
            self.candles.remove(0);
        }
    }

    /// Extend the open (last) candle with a new tick price: close moves,
    /// high/low widen, volume counts the tick. No-op on an empty series.
    pub fn extend_last(&mut self, price: f64) {
        if let Some(last) = self.candles.last_mut() {
            last.close = price;
            last.high = last.high.max(price);
            last.low = last.low.min(price);
            last.volume += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Oldest-first view of the full history.
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }

    /// Close prices, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
