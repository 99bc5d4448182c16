pub mod series;
pub mod simulator;

// Re-export the working set (e.g. `use crate::market_data::Candle`).
pub use series::{bucket_label, Candle, CandleSeries};
pub use simulator::{MarketSimulator, NoiseSource, ThreadNoise};
