//! Delay queue of pending resolutions keyed by `resolve_at_ms`.
//!
//! Polled by the same context that advances ticks, so resolution order is
//! deterministic under a controlled clock. Ties on `resolve_at_ms` pop in
//! scheduling order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::model::SignalId;

#[derive(Debug, Default)]
pub struct ResolutionQueue {
    heap: BinaryHeap<Reverse<(u64, u64, SignalId)>>,
    seq: u64,
}

impl ResolutionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, resolve_at_ms: u64, id: SignalId) {
        self.heap.push(Reverse((resolve_at_ms, self.seq, id)));
        self.seq += 1;
    }

    /// Earliest scheduled resolution time, if any.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse((at, _, _))| *at)
    }

    /// Pops the earliest entry if it is due at `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(u64, SignalId)> {
        match self.heap.peek() {
            Some(Reverse((at, _, _))) if *at <= now_ms => {
                self.heap.pop().map(|Reverse((at, _, id))| (at, id))
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
