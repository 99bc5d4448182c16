// =============================================================================
// Synthetic Market Simulator — mean-reverting random walk with volatility
// clustering
// =============================================================================
//
// Produces the bootstrap candle history and the live tick feed that drive the
// whole dashboard. Two persistent scalars survive across ticks:
//
//   trend       — signed drift bias, decays geometrically and absorbs small
//                 normal shocks, so directional moves persist for a while.
//   volatility  — positive diffusion scale, decays toward a floor and absorbs
//                 small uniform shocks; a rare spike doubles it for one tick
//                 (news event) and the doubling washes out through the decay.
//
// Both reset whenever a new bootstrap is requested (instrument switch).
//
// Randomness is injected through the NoiseSource trait so tests can script
// exact draw sequences and assert exact prices.

use chrono::{Duration, Local};
use rand::Rng;

use super::series::{bucket_label, Candle, CandleSeries};

// ── Tuning constants ─────────────────────────────────────────────────────────

/// Geometric decay of the bootstrap-local trend per candle.
const BOOT_TREND_DECAY: f64 = 0.9;
/// Scale of the normal shock folded into the bootstrap trend.
const BOOT_TREND_SHOCK: f64 = 0.002;
/// Diffusion scale of the bootstrap random walk.
const BOOT_DIFFUSION: f64 = 0.0005;

/// Geometric decay of the persistent live trend per tick.
const LIVE_TREND_DECAY: f64 = 0.98;
/// Scale of the normal shock folded into the live trend.
const LIVE_TREND_SHOCK: f64 = 0.00002;

/// Geometric decay of the persistent volatility per tick.
const VOL_DECAY: f64 = 0.99;
/// Scale of the uniform shock folded into the volatility.
const VOL_SHOCK: f64 = 0.00001;
/// Volatility never decays below this floor.
const VOL_FLOOR: f64 = 0.00005;
/// A uniform draw above this doubles volatility for the tick (news spike).
const VOL_SPIKE_ABOVE: f64 = 0.98;

/// A uniform draw above this closes the open candle early, keeping the chart
/// lively even within a single wall-clock minute.
const EARLY_CLOSE_ABOVE: f64 = 0.9;

/// Prices are clamped here so a long unattended run can never drive the walk
/// non-positive and poison the ratio-based indicator math downstream.
pub const PRICE_FLOOR: f64 = 1e-9;

// =============================================================================
// NoiseSource — injected randomness
// =============================================================================

/// Source of pseudo-random draws for the simulator.
///
/// `uniform` returns a draw in [0, 1). `normal` has a default Box–Muller
/// implementation over two uniform draws (zero draws rejected to keep the
/// logarithm in range); deterministic test doubles may override either.
pub trait NoiseSource {
    fn uniform(&mut self) -> f64;

    /// Standard-normal draw (mean 0, variance 1).
    fn normal(&mut self) -> f64 {
        let mut u = 0.0;
        while u == 0.0 {
            u = self.uniform();
        }
        let mut v = 0.0;
        while v == 0.0 {
            v = self.uniform();
        }
        (-2.0 * u.ln()).sqrt() * (std::f64::consts::TAU * v).cos()
    }
}

/// Production noise source backed by the thread-local RNG. No seeding
/// contract: reproducibility across runs is explicitly not offered.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadNoise;

impl NoiseSource for ThreadNoise {
    fn uniform(&mut self) -> f64 {
        rand::rng().random::<f64>()
    }
}

// =============================================================================
// MarketSimulator
// =============================================================================

/// Owns the persistent trend/volatility state of the synthetic walk.
///
/// The simulator is stateless with respect to the candle series — the caller
/// holds the series and the latest price across calls — but stateful with
/// respect to its own drift and diffusion memory.
pub struct MarketSimulator {
    trend: f64,
    volatility: f64,
    noise: Box<dyn NoiseSource + Send>,
}

impl MarketSimulator {
    pub fn new(noise: Box<dyn NoiseSource + Send>) -> Self {
        Self {
            trend: 0.0,
            volatility: VOL_FLOOR,
            noise,
        }
    }

    /// Simulator drawing from the thread-local RNG.
    pub fn with_thread_noise() -> Self {
        Self::new(Box::new(ThreadNoise))
    }

    /// Current drift bias (diagnostics only).
    pub fn trend(&self) -> f64 {
        self.trend
    }

    /// Current diffusion scale (diagnostics only).
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    // ── Bootstrap ───────────────────────────────────────────────────────────

    /// Generate `count` candles of plausible history ending at the present,
    /// oldest first, one bucket every `bucket_duration_ms`. The first
    /// candle opens at `start_price` (clamped positive); each candle opens
    /// at the previous close.
    ///
    /// Also resets the persistent live-tick state, so a bootstrap doubles as
    /// the instrument-switch reset.
    pub fn generate_history(
        &mut self,
        start_price: f64,
        count: usize,
        bucket_duration_ms: i64,
    ) -> CandleSeries {
        self.trend = 0.0;
        self.volatility = VOL_FLOOR;

        let mut series = CandleSeries::new();
        if count == 0 {
            return series;
        }

        let mut price = start_price.max(PRICE_FLOOR);
        let mut local_trend = 0.0;
        let mut at = Local::now() - Duration::milliseconds(bucket_duration_ms * count as i64);

        for _ in 0..count {
            local_trend = local_trend * BOOT_TREND_DECAY + self.noise.normal() * BOOT_TREND_SHOCK;

            let change = price * (local_trend + self.noise.normal() * BOOT_DIFFUSION);
            let open = price;
            let close = (price + change).max(PRICE_FLOOR);

            // Wicks extend the body by a random fraction of the move, which
            // keeps low <= min(open, close) <= max(open, close) <= high by
            // construction.
            let wick = change.abs() * 0.5;
            let high = open.max(close) + self.noise.uniform() * wick;
            let low = (open.min(close) - self.noise.uniform() * wick).max(PRICE_FLOOR);

            let volume = (self.noise.uniform() * 500.0) as u64 + 50;

            series.push(Candle {
                time: bucket_label(at),
                open,
                high,
                low,
                close,
                volume,
            });

            price = close;
            at += Duration::milliseconds(bucket_duration_ms);
        }

        series
    }

    // ── Live tick ───────────────────────────────────────────────────────────

    /// Advance the walk by one tick: evolve trend and volatility, derive the
    /// next price from `prev_price`, and fold it into `series` — either
    /// extending the open candle or opening a fresh single-tick bucket.
    ///
    /// A new bucket opens when the wall-clock HH:MM label has rolled over
    /// OR a random early-close trigger fires; both signals are live at once.
    /// Returns the new price; the series' retention cap evicts the oldest
    /// candle when exceeded.
    pub fn advance(&mut self, prev_price: f64, series: &mut CandleSeries) -> f64 {
        self.trend = self.trend * LIVE_TREND_DECAY + self.noise.normal() * LIVE_TREND_SHOCK;

        self.volatility =
            (self.volatility * VOL_DECAY + self.noise.uniform() * VOL_SHOCK).max(VOL_FLOOR);
        if self.noise.uniform() > VOL_SPIKE_ABOVE {
            self.volatility *= 2.0;
        }

        let diffusion = self.volatility * self.noise.normal();
        let new_price = (prev_price + prev_price * (self.trend + diffusion)).max(PRICE_FLOOR);

        let label = bucket_label(Local::now());
        let early_close = self.noise.uniform() > EARLY_CLOSE_ABOVE;
        let rolled_over = series.last().map(|c| c.time != label).unwrap_or(true);

        if early_close || rolled_over {
            series.push(Candle::single_tick(label, new_price));
        } else {
            series.extend_last(new_price);
        }

        new_price
    }
}

impl std::fmt::Debug for MarketSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketSimulator")
            .field("trend", &self.trend)
            .field("volatility", &self.volatility)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Deterministic noise: scripted queues with neutral fallbacks
    /// (uniform 0.5, normal 0.0) once a queue runs dry.
    struct ScriptedNoise {
        uniforms: VecDeque<f64>,
        normals: VecDeque<f64>,
    }

    impl ScriptedNoise {
        fn new(uniforms: &[f64], normals: &[f64]) -> Self {
            Self {
                uniforms: uniforms.iter().copied().collect(),
                normals: normals.iter().copied().collect(),
            }
        }

        fn neutral() -> Self {
            Self::new(&[], &[])
        }
    }

    impl NoiseSource for ScriptedNoise {
        fn uniform(&mut self) -> f64 {
            self.uniforms.pop_front().unwrap_or(0.5)
        }

        fn normal(&mut self) -> f64 {
            self.normals.pop_front().unwrap_or(0.0)
        }
    }

    fn scripted(uniforms: &[f64], normals: &[f64]) -> MarketSimulator {
        MarketSimulator::new(Box::new(ScriptedNoise::new(uniforms, normals)))
    }

    // ── NoiseSource defaults ───────────────────────────────────────────────

    /// Minimal source that only supplies uniforms, to exercise the default
    /// Box–Muller `normal`.
    struct UniformOnly(VecDeque<f64>);

    impl NoiseSource for UniformOnly {
        fn uniform(&mut self) -> f64 {
            self.0.pop_front().expect("script exhausted")
        }
    }

    #[test]
    fn box_muller_matches_closed_form() {
        let mut src = UniformOnly([0.5, 0.25].into_iter().collect());
        let n = src.normal();
        let expected = (-2.0 * 0.5_f64.ln()).sqrt() * (std::f64::consts::TAU * 0.25).cos();
        assert!((n - expected).abs() < 1e-12);
    }

    #[test]
    fn box_muller_rejects_zero_uniforms() {
        // Leading zeros must be skipped, not fed into ln().
        let mut src = UniformOnly([0.0, 0.0, 0.5, 0.0, 0.25].into_iter().collect());
        let n = src.normal();
        assert!(n.is_finite());
    }

    #[test]
    fn thread_noise_looks_standard_normal() {
        let mut src = ThreadNoise;
        let draws: Vec<f64> = (0..10_000).map(|_| src.normal()).collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        let var = draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / draws.len() as f64;
        assert!(mean.abs() < 0.1, "mean {mean} too far from 0");
        assert!((var - 1.0).abs() < 0.15, "variance {var} too far from 1");
    }

    // ── Bootstrap ──────────────────────────────────────────────────────────

    #[test]
    fn history_has_exact_count_and_anchored_open() {
        let mut sim = MarketSimulator::with_thread_noise();
        let series = sim.generate_history(1.0850, 300, 60_000);
        assert_eq!(series.len(), 300);
        assert_eq!(series.candles()[0].open, 1.0850);
    }

    #[test]
    fn history_candles_are_well_formed_and_chained() {
        let mut sim = MarketSimulator::with_thread_noise();
        let series = sim.generate_history(64_000.0, 200, 60_000);
        let candles = series.candles();
        for c in candles {
            assert!(c.is_well_formed(), "bad candle {c:?}");
            assert!(c.low > 0.0);
            assert!((50..=549).contains(&c.volume), "volume {} out of range", c.volume);
        }
        for pair in candles.windows(2) {
            assert_eq!(pair[1].open, pair[0].close, "candles must chain");
        }
    }

    #[test]
    fn history_with_zero_count_is_empty() {
        let mut sim = MarketSimulator::with_thread_noise();
        assert!(sim.generate_history(1.0, 0, 60_000).is_empty());
    }

    #[test]
    fn history_clamps_non_positive_start_price() {
        let mut sim = MarketSimulator::with_thread_noise();
        let series = sim.generate_history(-5.0, 10, 60_000);
        assert_eq!(series.len(), 10);
        assert!(series.candles()[0].open > 0.0);
        for c in series.candles() {
            assert!(c.low > 0.0);
        }
    }

    #[test]
    fn bootstrap_resets_live_state() {
        let mut sim = scripted(&[], &[1000.0]);
        let mut series = CandleSeries::new();
        series.push(Candle::single_tick("00:00".into(), 1.0));
        sim.advance(1.0, &mut series);
        assert!(sim.trend() != 0.0);

        sim.generate_history(1.0, 5, 60_000);
        assert_eq!(sim.trend(), 0.0);
        assert_eq!(sim.volatility(), VOL_FLOOR);
    }

    // ── Live tick ──────────────────────────────────────────────────────────

    #[test]
    fn neutral_tick_extends_open_candle_and_holds_price() {
        // Neutral draws: zero trend shock, zero diffusion, no early close.
        let mut sim = MarketSimulator::new(Box::new(ScriptedNoise::neutral()));
        let mut series = CandleSeries::new();
        series.push(Candle::single_tick(bucket_label(Local::now()), 1.2650));

        let px = sim.advance(1.2650, &mut series);

        assert_eq!(px, 1.2650);
        assert_eq!(series.len(), 1);
        assert_eq!(series.last().unwrap().volume, 2);
    }

    #[test]
    fn early_close_trigger_opens_single_tick_candle() {
        // Draw order per tick: vol shock, spike check, early-close check.
        let mut sim = scripted(&[0.5, 0.5, 0.95], &[0.0, 0.0]);
        let mut series = CandleSeries::new();
        series.push(Candle::single_tick(bucket_label(Local::now()), 150.20));

        let px = sim.advance(150.20, &mut series);

        assert_eq!(series.len(), 2);
        let last = series.last().unwrap();
        assert_eq!(last.open, px);
        assert_eq!(last.close, px);
        assert_eq!(last.volume, 1);
    }

    #[test]
    fn label_rollover_opens_new_candle_without_early_close() {
        let mut sim = MarketSimulator::new(Box::new(ScriptedNoise::neutral()));
        let mut series = CandleSeries::new();
        // A label that can never match the current wall clock.
        series.push(Candle::single_tick("??:??".into(), 1.0));

        sim.advance(1.0, &mut series);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn advance_grows_series_by_at_most_one_and_respects_cap() {
        let mut series = CandleSeries::with_capacity(2);
        series.push(Candle::single_tick("??:??".into(), 1.0));
        series.push(Candle::single_tick("??:??".into(), 1.0));

        let mut sim = scripted(&[0.5, 0.5, 0.95], &[0.0, 0.0]);
        let before = series.len();
        sim.advance(1.0, &mut series);

        assert_eq!(series.len(), before); // grew by one, evicted one
    }

    #[test]
    fn volatility_spike_doubles_for_the_tick() {
        // Second uniform above the spike threshold.
        let mut sim = scripted(&[0.5, 0.99, 0.5], &[0.0, 0.0]);
        let mut series = CandleSeries::new();
        series.push(Candle::single_tick(bucket_label(Local::now()), 1.0));

        sim.advance(1.0, &mut series);

        let base = VOL_FLOOR * VOL_DECAY + 0.5 * VOL_SHOCK;
        assert!((sim.volatility() - base.max(VOL_FLOOR) * 2.0).abs() < 1e-15);
    }

    #[test]
    fn runaway_negative_shock_clamps_at_price_floor() {
        // A trend shock violent enough to push the relative change below -1.
        let mut sim = scripted(&[], &[-100_000_000.0, 0.0]);
        let mut series = CandleSeries::new();
        series.push(Candle::single_tick("??:??".into(), 1.0));

        let px = sim.advance(1.0, &mut series);
        assert_eq!(px, PRICE_FLOOR);
        assert!(px > 0.0);
    }

    #[test]
    fn trend_persistence_decays_geometrically() {
        let mut sim = scripted(&[], &[1.0, 0.0, 0.0, 0.0]);
        let mut series = CandleSeries::new();
        series.push(Candle::single_tick("??:??".into(), 1.0));

        sim.advance(1.0, &mut series);
        let after_shock = sim.trend();
        assert!((after_shock - LIVE_TREND_SHOCK).abs() < 1e-15);

        sim.advance(1.0, &mut series);
        assert!((sim.trend() - after_shock * LIVE_TREND_DECAY).abs() < 1e-15);
    }
}
