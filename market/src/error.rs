use thiserror::Error;

use crate::types::Instrument;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("tick for untracked instrument {0}")]
    UntrackedInstrument(Instrument),

    #[error("instrument {0} appears more than once in the same batch")]
    DuplicateInstrument(Instrument),

    #[error("non-positive price {price} for {instrument}")]
    NonPositivePrice { instrument: Instrument, price: f64 },

    #[error("stale batch: ts_ms={ts_ms} is not after last applied ts_ms={last_ts_ms}")]
    StaleBatch { ts_ms: u64, last_ts_ms: u64 },

    #[error("invalid indicator parameters: {0}")]
    InvalidParams(String),

    #[error("no instruments to track")]
    EmptyInstrumentSet,
}
