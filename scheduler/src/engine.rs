//! The signal engine.
//!
//! For each tick batch it:
//!   1. Applies the batch to `MarketManager` (indicators, latest prices).
//!   2. Refreshes the session flag and the trading day.
//!   3. Resolves every signal whose resolution time has passed.
//!   4. While the session is active, evaluates rules per instrument and asks
//!      the lifecycle manager to admit each trigger.
//!   5. Hands resolved signals to the annotation executor without waiting.
//!
//! Between batches, `run` also wakes at the next resolution time so signals
//! resolve on schedule rather than on the next tick.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, field, info, instrument, warn};

use super::counters::{CounterSnapshot, EngineCounters};
use super::rules::{RuleThresholds, evaluate};
use super::types::{AnnotationRequest, AnnotationSender};
use common::logger::{TraceId, child_span, root_span};
use common::time::{Clock, local_date};
use market::feed::TickSource;
use market::indicator::IndicatorParams;
use market::{MarketError, MarketManager, TickBatch};
use signals::{
    Admission, AggregateStats, Rejection, SessionSchedule, SessionStats, SessionSummary,
    SessionTransition, Signal, SignalLifecycleManager,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    pub thresholds: RuleThresholds,
    pub schedule: SessionSchedule,
}

/// What one batch did.
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    pub created: Vec<Signal>,
    pub resolved: Vec<Signal>,
    pub rejected_candidates: usize,
    pub rejected_ticks: usize,
}

/// Read-only view for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct EngineView {
    pub session_active: bool,
    pub aggregate: AggregateStats,
    pub session: SessionStats,
    pub open: Vec<Signal>,
    pub resolved: Vec<Signal>,
    pub counters: CounterSnapshot,
}

pub struct SignalEngine {
    cfg: EngineConfig,
    market: Arc<MarketManager>,
    lifecycle: Arc<SignalLifecycleManager>,
    clock: Arc<dyn Clock>,
    annotate_tx: Option<AnnotationSender>,
    counters: EngineCounters,
    session_override: Mutex<Option<bool>>,
    day: Mutex<Option<NaiveDate>>,
}

impl SignalEngine {
    pub fn new(
        cfg: EngineConfig,
        market: Arc<MarketManager>,
        lifecycle: Arc<SignalLifecycleManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cfg,
            market,
            lifecycle,
            clock,
            annotate_tx: None,
            counters: EngineCounters::default(),
            session_override: Mutex::new(None),
            day: Mutex::new(None),
        }
    }

    /// Route resolved signals to an annotation executor.
    pub fn with_annotations(mut self, tx: AnnotationSender) -> Self {
        self.annotate_tx = Some(tx);
        self
    }

    pub fn market(&self) -> &Arc<MarketManager> {
        &self.market
    }

    pub fn lifecycle(&self) -> &Arc<SignalLifecycleManager> {
        &self.lifecycle
    }

    pub fn counters(&self) -> &EngineCounters {
        &self.counters
    }

    /// Process one batch at the clock's current time.
    ///
    /// A stale batch is refused without touching any state.
    #[instrument(
        skip(self, batch),
        target = "engine",
        fields(ts_ms = batch.ts_ms, created = field::Empty, resolved = field::Empty)
    )]
    pub fn on_tick(&self, batch: TickBatch) -> Result<TickOutcome, MarketError> {
        EngineCounters::bump(&self.counters.batches);

        let report = match self.market.ingest(batch) {
            Ok(r) => r,
            Err(e) => {
                EngineCounters::bump(&self.counters.stale_batches);
                return Err(e);
            }
        };
        self.counters
            .rejected_ticks
            .fetch_add(report.rejected.len() as u64, Ordering::Relaxed);

        let now_ms = self.clock.now_ms();
        let active = self.refresh_session(now_ms);

        let mut outcome = TickOutcome {
            rejected_ticks: report.rejected.len(),
            resolved: self.resolve_due(now_ms),
            ..Default::default()
        };

        for tick in &report.snapshot.ticks {
            let Some(trigger) = evaluate(tick, &self.cfg.thresholds) else {
                continue;
            };
            EngineCounters::bump(&self.counters.candidates);

            if !active {
                EngineCounters::bump(&self.counters.skip_inactive);
                debug!(instrument = %tick.instrument, rule = %trigger.rule, "outside session; candidate ignored");
                continue;
            }

            let rule = trigger.rule;
            let req = trigger.into_request(tick.instrument.clone(), tick.price);

            match self.lifecycle.try_create(req, now_ms) {
                Admission::Created(sig) => {
                    EngineCounters::bump(&self.counters.created);
                    info!(signal_id = %sig.id, instrument = %sig.instrument, %rule, "trigger admitted");
                    outcome.created.push(sig);
                }
                Admission::Rejected(r) => {
                    outcome.rejected_candidates += 1;
                    match r {
                        Rejection::CooldownActive { .. } => {
                            EngineCounters::bump(&self.counters.skip_cooldown)
                        }
                        Rejection::InstrumentLocked { .. } => {
                            EngineCounters::bump(&self.counters.skip_locked)
                        }
                    }
                }
            }
        }

        let span = tracing::Span::current();
        span.record("created", outcome.created.len());
        span.record("resolved", outcome.resolved.len());

        Ok(outcome)
    }

    /// Resolve everything due at `now_ms` and queue annotations for it.
    pub fn resolve_due(&self, now_ms: u64) -> Vec<Signal> {
        let _span = child_span("resolve").entered();
        self.roll_day(now_ms);

        let market = &self.market;
        let resolved = self
            .lifecycle
            .resolve_due(now_ms, |instrument| market.current_price(instrument));

        for sig in &resolved {
            EngineCounters::bump(&self.counters.resolved);
            self.dispatch_annotation(sig);
        }
        resolved
    }

    fn dispatch_annotation(&self, sig: &Signal) {
        let Some(tx) = &self.annotate_tx else {
            return;
        };
        let Some(req) = AnnotationRequest::from_resolved(sig) else {
            return;
        };

        match tx.try_send(req) {
            Ok(()) => EngineCounters::bump(&self.counters.annotations_queued),
            Err(TrySendError::Full(req)) => {
                EngineCounters::bump(&self.counters.annotations_dropped);
                warn!(
                    component = "engine",
                    event = "annotation_dropped",
                    signal_id = %req.signal_id,
                    "annotation queue full; keeping technical rationale"
                );
            }
            Err(TrySendError::Closed(req)) => {
                EngineCounters::bump(&self.counters.annotations_dropped);
                warn!(
                    component = "engine",
                    event = "annotation_closed",
                    signal_id = %req.signal_id,
                    "annotation executor gone; keeping technical rationale"
                );
            }
        }
    }

    /// Recompute the session flag and push it to the lifecycle manager.
    /// Returns whether the session is active.
    pub fn refresh_session(&self, now_ms: u64) -> bool {
        let forced = *self.session_override.lock();
        let active = forced.unwrap_or_else(|| self.cfg.schedule.is_active_at(now_ms));

        if let SessionTransition::Closed(Some(s)) = self.lifecycle.set_session_active(active) {
            info!(
                component = "engine",
                event = "session_summary",
                wins = s.wins,
                losses = s.losses,
                total = s.total,
                "session ended"
            );
        }
        active
    }

    /// Force the session on or off; `None` returns to the schedule.
    pub fn set_session_override(&self, active: Option<bool>) {
        *self.session_override.lock() = active;
        self.refresh_session(self.clock.now_ms());
    }

    fn roll_day(&self, now_ms: u64) {
        let today = local_date(now_ms);
        let mut day = self.day.lock();
        match *day {
            Some(d) if d == today => {}
            Some(_) => {
                self.lifecycle.reset_today();
                *day = Some(today);
            }
            None => *day = Some(today),
        }
    }

    /// Applies to ticks ingested from now on.
    pub fn set_indicator_params(&self, params: IndicatorParams) -> Result<(), MarketError> {
        self.market.set_params(params)
    }

    pub fn take_summary(&self) -> Option<SessionSummary> {
        self.lifecycle.take_summary()
    }

    pub fn view(&self) -> EngineView {
        EngineView {
            session_active: self.lifecycle.is_session_active(),
            aggregate: self.lifecycle.aggregate_stats(),
            session: self.lifecycle.session_stats(),
            open: self.lifecycle.open_signals(),
            resolved: self.lifecycle.resolved_signals(),
            counters: self.counters.snapshot(),
        }
    }

    /// Drive the engine from `source` until it is exhausted or `max_batches`
    /// have been processed.
    pub async fn run<S>(&self, mut source: S, max_batches: Option<u64>)
    where
        S: TickSource,
    {
        let mut processed = 0u64;
        info!(component = "engine", event = "startup", "signal engine started");

        loop {
            if max_batches.is_some_and(|max| processed >= max) {
                break;
            }

            let wake = self.next_resolution_wait();

            tokio::select! {
                biased;

                batch = source.next_batch() => {
                    let Some(batch) = batch else {
                        info!(component = "engine", event = "source_exhausted", "tick source exhausted");
                        break;
                    };
                    processed += 1;
                    let span = root_span("tick", &TraceId::new());
                    if let Err(e) = span.in_scope(|| self.on_tick(batch)) {
                        warn!(component = "engine", error = %e, "tick batch skipped");
                    }
                }
                _ = sleep_or_park(wake) => {
                    self.resolve_due(self.clock.now_ms());
                }
            }
        }

        info!(component = "engine", event = "shutdown", processed, "signal engine stopped");
    }

    fn next_resolution_wait(&self) -> Option<Duration> {
        self.lifecycle
            .next_due_ms()
            .map(|due| Duration::from_millis(due.saturating_sub(self.clock.now_ms())))
    }
}

async fn sleep_or_park(wait: Option<Duration>) {
    match wait {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending::<()>().await,
    }
}
