use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::indicator::{IndicatorParams, IndicatorState};

/// Instruments tracked by default.
pub const DEFAULT_INSTRUMENTS: [&str; 10] = [
    "Volatility 75 Index (OTC)",
    "Volatility 100 Index (OTC)",
    "Volatility 10 Index (OTC)",
    "Boom 1000 Index",
    "Crash 1000 Index",
    "EUR/USD (OTC)",
    "GBP/JPY (OTC)",
    "USD/INR (OTC)",
    "AUD/CAD (OTC)",
    "Crypto IDX",
];

/// Opaque identifier of a tradeable symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Instrument(String);

impl Instrument {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Instrument {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Instrument {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Instrument {
    fn from(s: String) -> Self {
        Self(s)
    }
}

pub fn default_instruments() -> Vec<Instrument> {
    DEFAULT_INSTRUMENTS.iter().map(|s| Instrument::from(*s)).collect()
}

/// One timestamped price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub instrument: Instrument,
    pub price: f64,
    pub ts_ms: u64,
}

/// Everything the tick source delivered for one cadence period.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TickBatch {
    pub ts_ms: u64,
    pub ticks: Vec<Tick>,
}

impl TickBatch {
    pub fn new(ts_ms: u64, ticks: Vec<Tick>) -> Self {
        Self { ts_ms, ticks }
    }

    /// Builds a batch where every tick shares the batch timestamp.
    pub fn from_prices<I, S>(ts_ms: u64, prices: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<Instrument>,
    {
        let ticks = prices
            .into_iter()
            .map(|(instrument, price)| Tick {
                instrument: instrument.into(),
                price,
                ts_ms,
            })
            .collect();
        Self { ts_ms, ticks }
    }
}

/// A tick after the indicator tracker has folded it in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedTick {
    pub instrument: Instrument,
    pub price: f64,
    /// Relative move since the previous tick, in percent.
    pub change_pct: f64,
    pub ts_ms: u64,
    pub indicators: IndicatorState,
    /// Parameter set in force when this tick was processed.
    pub params: IndicatorParams,
}

/// One processed batch, as broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MarketSnapshot {
    pub ts_ms: u64,
    pub ticks: Vec<EnrichedTick>,
}

impl MarketSnapshot {
    pub fn get(&self, instrument: &str) -> Option<&EnrichedTick> {
        self.ticks.iter().find(|t| t.instrument.as_str() == instrument)
    }
}
