//! MarketManager
//!
//! Owns live market state for the tracked instrument set.
//! Responsibilities:
//!   • Apply each tick batch to the indicator tracker, strictly in arrival order
//!   • Keep the latest price per instrument (read by signal resolution)
//!   • Enrich ticks with indicator snapshots and change percentage
//!   • Fan processed snapshots out to subscribers without blocking ingestion
//!
//! All mutation goes through one lock, so updates for an instrument are never
//! applied concurrently or out of order.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tracing::{debug, error, info, instrument, warn};

use crate::error::MarketError;
use crate::indicator::{IndicatorParams, IndicatorState, IndicatorTracker};
use crate::types::{EnrichedTick, Instrument, MarketSnapshot, TickBatch};

/// Result of ingesting one batch.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub snapshot: MarketSnapshot,
    /// Ticks that were dropped, with the defect each one exhibited.
    pub rejected: Vec<MarketError>,
}

struct MarketState {
    tracker: IndicatorTracker,
    prices: HashMap<Instrument, f64>,
    last_batch_ms: Option<u64>,
}

pub struct MarketManager {
    state: Mutex<MarketState>,
    subscribers: Mutex<Vec<Sender<MarketSnapshot>>>,
}

impl MarketManager {
    pub fn new(tracker: IndicatorTracker) -> Self {
        Self {
            state: Mutex::new(MarketState {
                tracker,
                prices: HashMap::new(),
                last_batch_ms: None,
            }),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Applies a batch: at most one update per instrument, in batch order.
    ///
    /// A batch that is not newer than the last applied one is refused as a
    /// whole; gaps are fine (instruments missing from a batch simply get no
    /// update this period).
    #[instrument(skip(self, batch), fields(ts_ms = batch.ts_ms, ticks = batch.ticks.len()))]
    pub fn ingest(&self, batch: TickBatch) -> Result<IngestReport, MarketError> {
        let mut report = IngestReport {
            snapshot: MarketSnapshot {
                ts_ms: batch.ts_ms,
                ticks: Vec::with_capacity(batch.ticks.len()),
            },
            rejected: Vec::new(),
        };

        {
            let mut st = self.state.lock();

            if let Some(last_ts_ms) = st.last_batch_ms {
                if batch.ts_ms <= last_ts_ms {
                    warn!(last_ts_ms, "stale tick batch dropped");
                    return Err(MarketError::StaleBatch {
                        ts_ms: batch.ts_ms,
                        last_ts_ms,
                    });
                }
            }
            st.last_batch_ms = Some(batch.ts_ms);

            let params = st.tracker.params();
            let mut seen = HashSet::with_capacity(batch.ticks.len());

            for tick in batch.ticks {
                if !seen.insert(tick.instrument.clone()) {
                    error!(instrument = %tick.instrument, "duplicate tick in batch");
                    report
                        .rejected
                        .push(MarketError::DuplicateInstrument(tick.instrument));
                    continue;
                }

                let indicators = match st.tracker.update(&tick.instrument, tick.price) {
                    Ok(s) => s,
                    Err(e) => {
                        error!(instrument = %tick.instrument, error = %e, "tick rejected");
                        debug_assert!(
                            !matches!(e, MarketError::UntrackedInstrument(_)),
                            "{e}"
                        );
                        report.rejected.push(e);
                        continue;
                    }
                };

                let change_pct = st
                    .prices
                    .insert(tick.instrument.clone(), tick.price)
                    .map(|prev| (tick.price - prev) / prev * 100.0)
                    .unwrap_or(0.0);

                report.snapshot.ticks.push(EnrichedTick {
                    instrument: tick.instrument,
                    price: tick.price,
                    change_pct,
                    ts_ms: tick.ts_ms,
                    indicators,
                    params,
                });
            }
        }

        debug!(
            applied = report.snapshot.ticks.len(),
            rejected = report.rejected.len(),
            "tick batch applied"
        );

        self.broadcast(&report.snapshot);
        Ok(report)
    }

    /// Registers a bounded subscriber. A subscriber that falls behind loses
    /// snapshots; it never slows ingestion.
    pub fn subscribe(&self, capacity: usize) -> Receiver<MarketSnapshot> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.subscribers.lock().push(tx);
        info!("market snapshot subscriber added");
        rx
    }

    fn broadcast(&self, snapshot: &MarketSnapshot) {
        let mut subs = self.subscribers.lock();
        subs.retain(|tx| match tx.try_send(snapshot.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("subscriber channel full; snapshot dropped");
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!("subscriber gone; removing");
                false
            }
        });
    }

    /// Latest accepted price for an instrument.
    pub fn current_price(&self, instrument: &str) -> Option<f64> {
        self.state.lock().prices.get(instrument).copied()
    }

    pub fn indicator_state(&self, instrument: &str) -> Option<IndicatorState> {
        self.state.lock().tracker.state(instrument)
    }

    pub fn is_tracked(&self, instrument: &str) -> bool {
        self.state.lock().tracker.is_tracked(instrument)
    }

    pub fn instruments(&self) -> Vec<Instrument> {
        let st = self.state.lock();
        let mut out: Vec<_> = st.tracker.instruments().cloned().collect();
        out.sort();
        out
    }

    pub fn params(&self) -> IndicatorParams {
        self.state.lock().tracker.params()
    }

    /// Updates indicator settings for subsequent batches; already computed
    /// state is left as is.
    pub fn set_params(&self, params: IndicatorParams) -> Result<(), MarketError> {
        self.state.lock().tracker.set_params(params)
    }
}
