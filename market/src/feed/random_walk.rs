//! Simulated feed: every instrument follows an independent multiplicative
//! random walk, sampled on a fixed cadence.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::time::Clock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::info;

use super::TickSource;
use crate::error::MarketError;
use crate::types::{Instrument, Tick, TickBatch};

#[derive(Debug, Clone, PartialEq)]
pub struct RandomWalkConfig {
    pub cadence: Duration,
    /// Maximum relative move per tick (0.0008 = ±0.08%).
    pub volatility: f64,
    /// Start prices are drawn uniformly from `[start_min, start_max)`.
    pub start_min: f64,
    pub start_max: f64,
    pub seed: Option<u64>,
}

impl Default for RandomWalkConfig {
    fn default() -> Self {
        Self {
            cadence: Duration::from_secs(1),
            volatility: 0.0008,
            start_min: 100.0,
            start_max: 1_100.0,
            seed: None,
        }
    }
}

pub struct RandomWalkSource {
    cfg: RandomWalkConfig,
    prices: Vec<(Instrument, f64)>,
    rng: StdRng,
    clock: Arc<dyn Clock>,
    // Created on first poll so construction does not need a runtime.
    ticker: Option<Interval>,
}

impl RandomWalkSource {
    pub fn new(
        instruments: impl IntoIterator<Item = Instrument>,
        cfg: RandomWalkConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, MarketError> {
        if !(cfg.start_min > 0.0 && cfg.start_min < cfg.start_max) {
            return Err(MarketError::InvalidParams(format!(
                "start price range [{}, {}) must be positive and non-empty",
                cfg.start_min, cfg.start_max
            )));
        }
        if !(0.0..1.0).contains(&cfg.volatility) {
            return Err(MarketError::InvalidParams(format!(
                "volatility must be in [0, 1), got {}",
                cfg.volatility
            )));
        }

        let mut rng = match cfg.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };

        let prices: Vec<_> = instruments
            .into_iter()
            .map(|i| {
                let start = rng.random_range(cfg.start_min..cfg.start_max);
                (i, start)
            })
            .collect();
        if prices.is_empty() {
            return Err(MarketError::EmptyInstrumentSet);
        }

        Ok(Self {
            cfg,
            prices,
            rng,
            clock,
            ticker: None,
        })
    }

    /// Advances every walk by one step and returns the resulting batch.
    pub fn step(&mut self, ts_ms: u64) -> TickBatch {
        let vol = self.cfg.volatility;
        let ticks = self
            .prices
            .iter_mut()
            .map(|(instrument, price)| {
                let change = if vol > 0.0 {
                    self.rng.random_range(-vol..=vol)
                } else {
                    0.0
                };
                *price *= 1.0 + change;
                Tick {
                    instrument: instrument.clone(),
                    price: round4(*price),
                    ts_ms,
                }
            })
            .collect();
        TickBatch { ts_ms, ticks }
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[async_trait]
impl TickSource for RandomWalkSource {
    async fn next_batch(&mut self) -> Option<TickBatch> {
        let cadence = self.cfg.cadence;
        let ticker = self.ticker.get_or_insert_with(|| {
            info!(
                instruments = self.prices.len(),
                every_ms = cadence.as_millis() as u64,
                "random walk source started"
            );
            let mut t = interval(cadence);
            t.set_missed_tick_behavior(MissedTickBehavior::Skip);
            t
        });
        ticker.tick().await;

        let ts_ms = self.clock.now_ms();
        Some(self.step(ts_ms))
    }
}
