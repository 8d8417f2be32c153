use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct EngineCounters {
    pub batches: Arc<AtomicU64>,
    pub stale_batches: Arc<AtomicU64>,
    pub rejected_ticks: Arc<AtomicU64>,

    pub candidates: Arc<AtomicU64>,
    pub created: Arc<AtomicU64>,
    pub resolved: Arc<AtomicU64>,

    // admission rejections
    pub skip_cooldown: Arc<AtomicU64>,
    pub skip_locked: Arc<AtomicU64>,
    pub skip_inactive: Arc<AtomicU64>,

    pub annotations_queued: Arc<AtomicU64>,
    pub annotations_dropped: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub batches: u64,
    pub stale_batches: u64,
    pub rejected_ticks: u64,
    pub candidates: u64,
    pub created: u64,
    pub resolved: u64,
    pub skip_cooldown: u64,
    pub skip_locked: u64,
    pub skip_inactive: u64,
    pub annotations_queued: u64,
    pub annotations_dropped: u64,
}

impl EngineCounters {
    pub(crate) fn bump(c: &AtomicU64) {
        c.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let get = |c: &Arc<AtomicU64>| c.load(Ordering::Relaxed);
        CounterSnapshot {
            batches: get(&self.batches),
            stale_batches: get(&self.stale_batches),
            rejected_ticks: get(&self.rejected_ticks),
            candidates: get(&self.candidates),
            created: get(&self.created),
            resolved: get(&self.resolved),
            skip_cooldown: get(&self.skip_cooldown),
            skip_locked: get(&self.skip_locked),
            skip_inactive: get(&self.skip_inactive),
            annotations_queued: get(&self.annotations_queued),
            annotations_dropped: get(&self.annotations_dropped),
        }
    }
}
