//! Tick sources.
//!
//! The engine only depends on [`TickSource`]; where prices physically come
//! from (a live feed, a simulation, a recorded fixture) is the source's
//! business.

pub mod fixture;
pub mod random_walk;

use async_trait::async_trait;

use crate::types::TickBatch;

pub use self::fixture::FixtureSource;
pub use self::random_walk::{RandomWalkConfig, RandomWalkSource};

#[async_trait]
pub trait TickSource: Send {
    /// Waits for the next complete snapshot of all tracked instruments.
    ///
    /// Returns `None` once the source is exhausted. Implementations must be
    /// cancel-safe: dropping the future before it resolves loses no batch.
    async fn next_batch(&mut self) -> Option<TickBatch>;
}
