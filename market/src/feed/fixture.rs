use std::collections::VecDeque;

use async_trait::async_trait;

use super::TickSource;
use crate::types::{Instrument, TickBatch};

/// Replays a fixed list of batches immediately, in order.
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    batches: VecDeque<TickBatch>,
}

impl FixtureSource {
    pub fn new(batches: impl IntoIterator<Item = TickBatch>) -> Self {
        Self {
            batches: batches.into_iter().collect(),
        }
    }

    /// One batch per price for a single instrument, `step_ms` apart.
    pub fn from_series(instrument: &str, prices: &[f64], start_ms: u64, step_ms: u64) -> Self {
        let instrument = Instrument::from(instrument);
        Self::new(prices.iter().enumerate().map(|(i, p)| {
            TickBatch::from_prices(
                start_ms + i as u64 * step_ms,
                [(instrument.clone(), *p)],
            )
        }))
    }

    pub fn remaining(&self) -> usize {
        self.batches.len()
    }
}

#[async_trait]
impl TickSource for FixtureSource {
    async fn next_batch(&mut self) -> Option<TickBatch> {
        self.batches.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_then_ends() {
        let mut src = FixtureSource::from_series("X", &[1.0, 2.0], 1_000, 500);
        assert_eq!(src.remaining(), 2);

        let a = src.next_batch().await.unwrap();
        let b = src.next_batch().await.unwrap();
        assert_eq!((a.ts_ms, a.ticks[0].price), (1_000, 1.0));
        assert_eq!((b.ts_ms, b.ticks[0].price), (1_500, 2.0));
        assert!(src.next_batch().await.is_none());
    }
}
