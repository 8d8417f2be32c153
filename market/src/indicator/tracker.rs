//! Per-instrument rolling indicator state.
//!
//! The tracker is the sole writer of [`IndicatorState`]. Callers only ever
//! receive copies; the internal record is never handed out.

use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Ema, Envelope, MomentumOscillator, OSCILLATOR_NEUTRAL};
use crate::error::MarketError;
use crate::types::Instrument;

/// Numeric constants fixed for the life of the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Fast average smoothing factor. Must exceed `alpha_slow`.
    pub alpha_fast: f64,
    pub alpha_slow: f64,

    /// Band half-width as a fraction of price (0.01 = 1% each side).
    pub band_width_pct: f64,

    /// Half-width of the band an instrument starts with on its first tick.
    pub seed_band_half_width: f64,

    /// Oscillator nudge per tick.
    pub oscillator_step: f64,

    /// Uniform jitter bound added to each oscillator nudge.
    pub oscillator_jitter: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            alpha_fast: 0.1,
            alpha_slow: 0.05,
            band_width_pct: 0.01,
            seed_band_half_width: 5.0,
            oscillator_step: 2.0,
            oscillator_jitter: 2.0,
        }
    }
}

/// Presentation-facing indicator settings. Updatable at runtime; changes
/// apply to subsequent ticks only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub fast_period: u32,
    pub slow_period: u32,
    pub oscillator_period: u32,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            fast_period: 9,
            slow_period: 21,
            oscillator_period: 14,
        }
    }
}

impl IndicatorParams {
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.fast_period == 0 || self.oscillator_period == 0 {
            return Err(MarketError::InvalidParams(
                "periods must be greater than zero".into(),
            ));
        }
        if self.fast_period >= self.slow_period {
            return Err(MarketError::InvalidParams(format!(
                "fast period {} must be shorter than slow period {}",
                self.fast_period, self.slow_period
            )));
        }
        Ok(())
    }
}

/// Snapshot of one instrument's indicators after an update.
///
/// Invariants after every update:
/// - `prev_ema_fast`/`prev_ema_slow` hold the averages from the previous update
/// - `band_lower <= ema_slow <= band_upper`
/// - `oscillator` is within `[OSCILLATOR_MIN, OSCILLATOR_MAX]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorState {
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub prev_ema_fast: f64,
    pub prev_ema_slow: f64,
    pub oscillator: f64,
    pub band_upper: f64,
    pub band_lower: f64,
}

impl IndicatorState {
    /// State an instrument starts from on its very first tick.
    pub fn seeded(price: f64, band_half_width: f64) -> Self {
        Self {
            ema_fast: price,
            ema_slow: price,
            prev_ema_fast: price,
            prev_ema_slow: price,
            oscillator: OSCILLATOR_NEUTRAL,
            band_upper: price + band_half_width,
            band_lower: price - band_half_width,
        }
    }
}

#[derive(Debug, Clone)]
struct InstrumentRecord {
    state: IndicatorState,
    last_price: f64,
}

pub struct IndicatorTracker {
    cfg: TrackerConfig,
    params: IndicatorParams,
    fast: Ema,
    slow: Ema,
    oscillator: MomentumOscillator,
    band: Envelope,
    /// `None` until the instrument's first tick.
    records: HashMap<Instrument, Option<InstrumentRecord>>,
    rng: StdRng,
}

impl IndicatorTracker {
    /// Creates a tracker for a fixed instrument set.
    ///
    /// `seed` makes oscillator jitter reproducible; `None` seeds from the OS.
    pub fn new(
        instruments: impl IntoIterator<Item = Instrument>,
        cfg: TrackerConfig,
        params: IndicatorParams,
        seed: Option<u64>,
    ) -> Result<Self, MarketError> {
        if cfg.alpha_fast <= cfg.alpha_slow {
            return Err(MarketError::InvalidParams(format!(
                "alpha_fast {} must exceed alpha_slow {}",
                cfg.alpha_fast, cfg.alpha_slow
            )));
        }
        params.validate()?;

        let records: HashMap<_, _> = instruments.into_iter().map(|i| (i, None)).collect();
        if records.is_empty() {
            return Err(MarketError::EmptyInstrumentSet);
        }

        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };

        info!(
            instruments = records.len(),
            alpha_fast = cfg.alpha_fast,
            alpha_slow = cfg.alpha_slow,
            "indicator tracker created"
        );

        Ok(Self {
            fast: Ema::new(cfg.alpha_fast)?,
            slow: Ema::new(cfg.alpha_slow)?,
            oscillator: MomentumOscillator::new(cfg.oscillator_step, cfg.oscillator_jitter)?,
            band: Envelope::new(cfg.band_width_pct)?,
            cfg,
            params,
            records,
            rng,
        })
    }

    /// Folds one price into the instrument's state and returns the new snapshot.
    pub fn update(
        &mut self,
        instrument: &Instrument,
        price: f64,
    ) -> Result<IndicatorState, MarketError> {
        if !(price > 0.0 && price.is_finite()) {
            return Err(MarketError::NonPositivePrice {
                instrument: instrument.clone(),
                price,
            });
        }

        let slot = self
            .records
            .get_mut(instrument)
            .ok_or_else(|| MarketError::UntrackedInstrument(instrument.clone()))?;

        let Some(record) = slot else {
            let state = IndicatorState::seeded(price, self.cfg.seed_band_half_width);
            *slot = Some(InstrumentRecord {
                state,
                last_price: price,
            });
            debug!(%instrument, price, "indicator state seeded");
            return Ok(state);
        };

        let prev = record.state;
        let ema_fast = self.fast.next(prev.ema_fast, price);
        let ema_slow = self.slow.next(prev.ema_slow, price);
        let oscillator =
            self.oscillator
                .next(prev.oscillator, price > record.last_price, &mut self.rng);
        let (band_upper, band_lower) = self.band.around(ema_slow, price);

        record.state = IndicatorState {
            ema_fast,
            ema_slow,
            prev_ema_fast: prev.ema_fast,
            prev_ema_slow: prev.ema_slow,
            oscillator,
            band_upper,
            band_lower,
        };
        record.last_price = price;

        Ok(record.state)
    }

    pub fn state(&self, instrument: &str) -> Option<IndicatorState> {
        self.records
            .get(instrument)
            .and_then(|r| r.as_ref())
            .map(|r| r.state)
    }

    pub fn is_tracked(&self, instrument: &str) -> bool {
        self.records.contains_key(instrument)
    }

    pub fn instruments(&self) -> impl Iterator<Item = &Instrument> {
        self.records.keys()
    }

    pub fn params(&self) -> IndicatorParams {
        self.params
    }

    /// Replaces the indicator settings for ticks processed from now on.
    pub fn set_params(&mut self, params: IndicatorParams) -> Result<(), MarketError> {
        params.validate()?;
        info!(
            fast = params.fast_period,
            slow = params.slow_period,
            oscillator = params.oscillator_period,
            "indicator params updated"
        );
        self.params = params;
        Ok(())
    }
}
