//! Incremental technical indicators.
//!
//! Each indicator is a small stateless transform (`next(prev, price) -> value`);
//! the per-instrument state they fold into lives in [`tracker`].

pub mod band;
pub mod ema;
pub mod oscillator;
pub mod tracker;

pub use self::band::Envelope;
pub use self::ema::Ema;
pub use self::oscillator::{MomentumOscillator, OSCILLATOR_MAX, OSCILLATOR_MIN, OSCILLATOR_NEUTRAL};
pub use self::tracker::{IndicatorParams, IndicatorState, IndicatorTracker, TrackerConfig};
