pub mod error;
pub mod feed;
pub mod indicator;
pub mod manager;
pub mod types;

pub use error::MarketError;
pub use manager::{IngestReport, MarketManager};
pub use types::{EnrichedTick, Instrument, MarketSnapshot, Tick, TickBatch};
