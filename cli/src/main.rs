mod cli;
mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use cli::Cli;
use common::logger::init_tracing;
use common::time::{Clock, SystemClock};
use config::AppConfig;
use executor::{AnnotationExecutor, GenerativeAnnotator};
use market::feed::RandomWalkSource;
use market::indicator::IndicatorTracker;
use market::{MarketManager, MarketSnapshot};
use scheduler::{AnnotationRequest, AnnotationSender, EngineConfig, EngineCounters, SignalEngine};
use signals::{SessionSchedule, SignalLifecycleManager};

/// Spawns the annotation executor when an API key is configured and returns
/// the engine -> executor sender.
fn start_annotation_executor(
    cfg: &AppConfig,
    lifecycle: Arc<SignalLifecycleManager>,
) -> Option<(AnnotationSender, JoinHandle<()>)> {
    if cfg.gemini_api_key.is_none() {
        info!("GEMINI_API_KEY not set; signals keep their technical rationale");
        return None;
    }

    let annotator = match GenerativeAnnotator::new(cfg.gemini_config()) {
        Ok(a) => Arc::new(a),
        Err(e) => {
            warn!(error = %e, "annotation disabled");
            return None;
        }
    };

    let (tx, rx) = mpsc::channel::<AnnotationRequest>(cfg.annotation_queue_capacity);
    let exec = Arc::new(AnnotationExecutor::new(
        annotator,
        lifecycle,
        cfg.executor_config(),
    ));

    Some((tx, tokio::spawn(exec.run(rx))))
}

/// Logs a status line every `every` batches and surfaces the session summary
/// when one is raised.
fn start_status_reporter(
    mut rx: mpsc::Receiver<MarketSnapshot>,
    lifecycle: Arc<SignalLifecycleManager>,
    counters: EngineCounters,
    every: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut seen = 0u64;

        while let Some(snapshot) = rx.recv().await {
            seen += 1;

            if let Some(s) = lifecycle.take_summary() {
                info!(
                    wins = s.wins,
                    losses = s.losses,
                    total = s.total,
                    win_rate_pct = s.win_rate_pct,
                    "session summary"
                );
                println!(
                    "Session ended: {} signals, {} wins, {} losses ({:.1}% win rate)",
                    s.total, s.wins, s.losses, s.win_rate_pct
                );
            }

            if every == 0 || seen % every != 0 {
                continue;
            }

            let agg = lifecycle.aggregate_stats();
            let session = lifecycle.session_stats();
            let c = counters.snapshot();
            info!(
                ts_ms = snapshot.ts_ms,
                session_active = lifecycle.is_session_active(),
                open = lifecycle.open_signals().len(),
                today_wins = agg.today_wins,
                today_losses = agg.today_losses,
                total_signals = agg.total_signals,
                today_win_rate_pct = agg.today_win_rate_pct(),
                rolling_average = agg.rolling_average,
                session_wins = session.wins,
                session_losses = session.losses,
                session_total = session.total,
                candidates = c.candidates,
                skip_cooldown = c.skip_cooldown,
                skip_locked = c.skip_locked,
                "status"
            );
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = AppConfig::from_env()?;
    cli.apply(&mut cfg);

    init_tracing(cfg.json_logs);
    info!(instruments = cfg.instruments.len(), "Starting signalpulse...");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let tracker = IndicatorTracker::new(
        cfg.instruments.clone(),
        cfg.tracker_config(),
        cfg.params,
        cli.seed,
    )?;
    let market = Arc::new(MarketManager::new(tracker));

    let lifecycle = Arc::new(SignalLifecycleManager::new(cfg.lifecycle_config())?);
    lifecycle.set_rolling_average(cfg.rolling_average);

    let schedule = if cli.always_on {
        SessionSchedule::always()
    } else {
        cfg.schedule()?
    };
    let mut engine = SignalEngine::new(
        EngineConfig {
            schedule,
            ..Default::default()
        },
        Arc::clone(&market),
        Arc::clone(&lifecycle),
        Arc::clone(&clock),
    );

    let executor_task = match start_annotation_executor(&cfg, Arc::clone(&lifecycle)) {
        Some((tx, handle)) => {
            engine = engine.with_annotations(tx);
            Some(handle)
        }
        None => None,
    };

    let status_task = start_status_reporter(
        market.subscribe(16),
        Arc::clone(&lifecycle),
        engine.counters().clone(),
        cfg.status_every_ticks,
    );

    let source = RandomWalkSource::new(
        cfg.instruments.clone(),
        cfg.random_walk_config(cli.seed),
        Arc::clone(&clock),
    )?;

    tokio::select! {
        _ = engine.run(source, cli.max_ticks) => {}
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("Shutdown signal received");
        }
    }

    println!("{}", serde_json::to_string_pretty(&engine.view())?);

    // closes the annotation channel
    drop(engine);
    status_task.abort();

    if let Some(handle) = executor_task {
        let grace = cfg.annotation_timeout + Duration::from_millis(500);
        if tokio::time::timeout(grace, handle).await.is_err() {
            warn!("annotation executor did not drain in time");
        }
    }

    Ok(())
}
