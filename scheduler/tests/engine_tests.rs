use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing_test::traced_test;

use common::time::{Clock, ManualClock};
use market::feed::TickSource;
use market::indicator::{IndicatorParams, IndicatorTracker, TrackerConfig};
use market::types::{Instrument, TickBatch};
use market::{MarketError, MarketManager};
use scheduler::{EngineConfig, SignalEngine, TickOutcome};
use signals::{Direction, LifecycleConfig, Outcome, SessionSchedule, SignalLifecycleManager};

const START_MS: u64 = 1_700_000_000_000;

/// Ten falling ticks followed by a jump: the fast average crosses above the
/// slow one on the last tick with the oscillator at 32.
const DIP_THEN_JUMP: [f64; 12] = [
    100.0, 99.0, 98.0, 97.0, 96.0, 95.0, 94.0, 93.0, 92.0, 91.0, 90.0, 135.0,
];

fn market(instruments: &[&str]) -> Arc<MarketManager> {
    let cfg = TrackerConfig {
        oscillator_jitter: 0.0,
        ..Default::default()
    };
    let tracker = IndicatorTracker::new(
        instruments.iter().map(|s| Instrument::from(*s)),
        cfg,
        IndicatorParams::default(),
        Some(7),
    )
    .unwrap();
    Arc::new(MarketManager::new(tracker))
}

fn engine_with(
    instruments: &[&str],
    lifecycle: LifecycleConfig,
    clock: Arc<dyn Clock>,
) -> SignalEngine {
    let cfg = EngineConfig {
        schedule: SessionSchedule::always(),
        ..Default::default()
    };
    SignalEngine::new(
        cfg,
        market(instruments),
        Arc::new(SignalLifecycleManager::new(lifecycle).unwrap()),
        clock,
    )
}

fn feed(
    engine: &SignalEngine,
    clock: &ManualClock,
    instruments: &[&str],
    prices: &[f64],
) -> Vec<TickOutcome> {
    prices
        .iter()
        .map(|p| {
            let now = clock.advance(1_000);
            let batch = TickBatch::from_prices(now, instruments.iter().map(|i| (*i, *p)));
            engine.on_tick(batch).unwrap()
        })
        .collect()
}

fn tick_at(engine: &SignalEngine, clock: &ManualClock, ms: u64, prices: &[(&str, f64)]) -> TickOutcome {
    clock.set(ms);
    engine
        .on_tick(TickBatch::from_prices(ms, prices.iter().copied()))
        .unwrap()
}

#[test]
fn cross_creates_up_signal_that_resolves_to_win() {
    let clock = ManualClock::new(START_MS);
    let engine = engine_with(&["X"], LifecycleConfig::default(), Arc::new(clock.clone()));

    let outcomes = feed(&engine, &clock, &["X"], &DIP_THEN_JUMP);
    let created: Vec<_> = outcomes.iter().flat_map(|o| o.created.clone()).collect();
    assert_eq!(created.len(), 1);

    let sig = &created[0];
    assert_eq!(sig.direction, Direction::Up);
    assert_eq!(sig.entry_price, 135.0);
    assert_eq!(sig.created_at_ms, START_MS + 12_000);
    assert!(sig.rationale.starts_with("EMA 9 crossed above EMA 21"));
    assert!(engine.lifecycle().is_locked("X"));

    let early = tick_at(&engine, &clock, sig.resolve_at_ms - 1, &[("X", 140.0)]);
    assert!(early.resolved.is_empty());

    let done = tick_at(&engine, &clock, sig.resolve_at_ms, &[("X", 141.0)]);
    assert_eq!(done.resolved.len(), 1);
    assert_eq!(done.resolved[0].outcome, Outcome::Win);
    assert_eq!(done.resolved[0].close_price, Some(141.0));

    let view = engine.view();
    assert_eq!(view.aggregate.today_wins, 1);
    assert_eq!(view.aggregate.total_signals, 1);
    assert_eq!(view.session.wins, 1);
    assert!(view.open.is_empty());
    assert!(!engine.lifecycle().is_locked("X"));
}

#[test]
fn two_triggers_in_one_tick_create_one_signal() {
    let clock = ManualClock::new(START_MS);
    let engine = engine_with(&["A", "B"], LifecycleConfig::default(), Arc::new(clock.clone()));

    let outcomes = feed(&engine, &clock, &["A", "B"], &DIP_THEN_JUMP);
    let last = outcomes.last().unwrap();

    assert_eq!(last.created.len(), 1);
    assert_eq!(last.rejected_candidates, 1);
    assert_eq!(engine.counters().snapshot().skip_cooldown, 1);
    assert_eq!(engine.view().open.len(), 1);
}

#[test]
fn triggers_inside_cooldown_create_nothing() {
    let clock = ManualClock::new(START_MS);
    let engine = engine_with(&["A", "B", "C"], LifecycleConfig::default(), Arc::new(clock.clone()));

    // C fires first and starts the cooldown
    let c = feed(&engine, &clock, &["C"], &DIP_THEN_JUMP);
    assert_eq!(c.last().unwrap().created.len(), 1);

    // A and B fire together twelve seconds later
    let ab = feed(&engine, &clock, &["A", "B"], &DIP_THEN_JUMP);
    let last = ab.last().unwrap();

    assert!(ab.iter().all(|o| o.created.is_empty()));
    assert_eq!(last.rejected_candidates, 2);
    assert_eq!(engine.counters().snapshot().skip_cooldown, 2);
    assert_eq!(engine.view().aggregate.total_signals, 1);
}

#[test]
fn no_candidates_admitted_outside_session() {
    let clock = ManualClock::new(START_MS);
    let engine = engine_with(&["X"], LifecycleConfig::default(), Arc::new(clock.clone()));
    engine.set_session_override(Some(false));

    let outcomes = feed(&engine, &clock, &["X"], &DIP_THEN_JUMP);

    assert!(outcomes.iter().all(|o| o.created.is_empty()));
    let counters = engine.counters().snapshot();
    assert_eq!(counters.candidates, 1);
    assert_eq!(counters.skip_inactive, 1);
    assert!(!engine.view().session_active);
}

#[test]
fn leaving_session_hands_out_summary_once() {
    let clock = ManualClock::new(START_MS);
    let engine = engine_with(&["X"], LifecycleConfig::default(), Arc::new(clock.clone()));

    feed(&engine, &clock, &["X"], &DIP_THEN_JUMP);
    engine.set_session_override(Some(false));

    let summary = engine.take_summary().unwrap();
    assert_eq!(summary.total, 1);
    assert!(engine.take_summary().is_none());

    engine.set_session_override(None);
    assert!(engine.view().session_active);
    assert_eq!(engine.view().session.total, 0);
}

#[test]
fn stale_batch_is_refused() {
    let clock = ManualClock::new(START_MS);
    let engine = engine_with(&["X"], LifecycleConfig::default(), Arc::new(clock.clone()));

    engine
        .on_tick(TickBatch::from_prices(START_MS, [("X", 1.0)]))
        .unwrap();
    let err = engine
        .on_tick(TickBatch::from_prices(START_MS, [("X", 2.0)]))
        .unwrap_err();

    assert!(matches!(err, MarketError::StaleBatch { .. }));
    assert_eq!(engine.counters().snapshot().stale_batches, 1);
    assert_eq!(engine.market().current_price("X"), Some(1.0));
}

#[test]
fn updated_periods_show_in_later_rationale() {
    let clock = ManualClock::new(START_MS);
    let engine = engine_with(&["X"], LifecycleConfig::default(), Arc::new(clock.clone()));

    feed(&engine, &clock, &["X"], &DIP_THEN_JUMP[..11]);
    engine
        .set_indicator_params(IndicatorParams {
            fast_period: 5,
            slow_period: 30,
            oscillator_period: 14,
        })
        .unwrap();
    let out = feed(&engine, &clock, &["X"], &[135.0]);

    assert!(out[0].created[0].rationale.starts_with("EMA 5 crossed above EMA 30"));
}

#[test]
fn day_rollover_clears_daily_counters() {
    let clock = ManualClock::new(START_MS);
    let engine = engine_with(&["X"], LifecycleConfig::default(), Arc::new(clock.clone()));

    feed(&engine, &clock, &["X"], &DIP_THEN_JUMP);
    let due = engine.lifecycle().next_due_ms().unwrap();
    tick_at(&engine, &clock, due, &[("X", 150.0)]);
    assert_eq!(engine.view().aggregate.today_wins, 1);

    tick_at(&engine, &clock, due + 2 * 86_400_000, &[("X", 150.0)]);
    let agg = engine.view().aggregate;
    assert_eq!((agg.today_wins, agg.today_losses, agg.total_signals), (0, 0, 1));
}

#[test]
fn resolution_queues_annotation_job() {
    let clock = ManualClock::new(START_MS);
    let (tx, mut rx) = mpsc::channel(4);
    let engine = engine_with(&["X"], LifecycleConfig::default(), Arc::new(clock.clone()))
        .with_annotations(tx);

    feed(&engine, &clock, &["X"], &DIP_THEN_JUMP);
    let due = engine.lifecycle().next_due_ms().unwrap();
    tick_at(&engine, &clock, due, &[("X", 120.0)]);

    let job = rx.try_recv().unwrap();
    assert_eq!(job.instrument.as_str(), "X");
    assert_eq!(job.direction, Direction::Up);
    assert_eq!(job.entry_price, 135.0);
    assert_eq!(job.close_price, 120.0);
    assert!(job.rationale.contains("crossed above"));
}

#[test]
#[traced_test]
fn full_annotation_queue_never_blocks_resolution() {
    let clock = ManualClock::new(START_MS);
    let (tx, _rx) = mpsc::channel(1);
    let lifecycle = LifecycleConfig {
        cooldown_ms: 0,
        ..Default::default()
    };
    let engine = engine_with(&["A", "B"], lifecycle, Arc::new(clock.clone())).with_annotations(tx);

    let outcomes = feed(&engine, &clock, &["A", "B"], &DIP_THEN_JUMP);
    assert_eq!(outcomes.last().unwrap().created.len(), 2);

    let due = engine.lifecycle().next_due_ms().unwrap();
    let done = tick_at(&engine, &clock, due, &[("A", 140.0), ("B", 130.0)]);

    assert_eq!(done.resolved.len(), 2);
    let counters = engine.counters().snapshot();
    assert_eq!(counters.annotations_queued, 1);
    assert_eq!(counters.annotations_dropped, 1);
    assert!(logs_contain("annotation queue full"));
}

/// Clock that follows tokio's (pausable) time.
struct TokioClock {
    base_ms: u64,
    start: tokio::time::Instant,
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        self.base_ms + self.start.elapsed().as_millis() as u64
    }
}

/// Emits one batch per second from a fixed price series, then goes quiet
/// without ending.
struct SeriesThenIdle {
    prices: Vec<f64>,
    clock: Arc<TokioClock>,
}

#[async_trait]
impl TickSource for SeriesThenIdle {
    async fn next_batch(&mut self) -> Option<TickBatch> {
        tokio::time::sleep(Duration::from_secs(1)).await;
        if self.prices.is_empty() {
            return std::future::pending().await;
        }
        let p = self.prices.remove(0);
        Some(TickBatch::from_prices(self.clock.now_ms(), [("X", p)]))
    }
}

#[tokio::test(start_paused = true)]
async fn run_resolves_on_schedule_between_ticks() {
    let clock = Arc::new(TokioClock {
        base_ms: START_MS,
        start: tokio::time::Instant::now(),
    });
    let engine = engine_with(&["X"], LifecycleConfig::default(), clock.clone());
    let source = SeriesThenIdle {
        prices: DIP_THEN_JUMP.to_vec(),
        clock,
    };

    let res = tokio::time::timeout(Duration::from_secs(120), engine.run(source, None)).await;
    assert!(res.is_err(), "idle source keeps the engine running");

    let resolved = engine.lifecycle().resolved_signals();
    assert_eq!(resolved.len(), 1);
    let sig = &resolved[0];
    assert_eq!(sig.resolved_at_ms, Some(sig.resolve_at_ms));
    // no tick since entry, price unchanged
    assert_eq!(sig.close_price, Some(135.0));
    assert_eq!(sig.outcome, Outcome::Loss);
}

#[tokio::test]
async fn run_stops_after_max_batches() {
    let clock = ManualClock::new(START_MS);
    let engine = engine_with(&["X"], LifecycleConfig::default(), Arc::new(clock.clone()));

    let batches: Vec<_> = (1..=5)
        .map(|i| TickBatch::from_prices(START_MS + i * 1_000, [("X", 100.0 + i as f64)]))
        .collect();
    let source = market::feed::FixtureSource::new(batches);

    engine.run(source, Some(3)).await;

    assert_eq!(engine.counters().snapshot().batches, 3);
    assert_eq!(engine.market().current_price("X"), Some(103.0));
}
