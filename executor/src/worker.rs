//! Annotation executor.
//!
//! Receives jobs for resolved signals and replaces each signal's rationale
//! with the annotator's text. Runs beside the engine, never in its path:
//! outcome and close price are settled before a job is queued, and this
//! worker can only touch the rationale.
//!
//! Every call is capped by `timeout`. On failure or timeout the technical
//! rationale stays in place and a warning is logged.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, warn};

use crate::annotator::Annotator;
use crate::error::AnnotateError;
use common::logger::{TraceId, annotate_span, root_span, warn_if_slow};
use scheduler::{AnnotationReceiver, AnnotationRequest};
use signals::SignalLifecycleManager;

const SLOW_ANNOTATION: Duration = Duration::from_millis(1_500);

#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    pub timeout: Duration,
    /// Upper bound on concurrent annotation calls.
    pub max_in_flight: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(3_000),
            max_in_flight: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationResult {
    Applied,
    /// Rationale left as the technical text.
    KeptTechnical { reason: String },
}

pub struct AnnotationExecutor<A: Annotator> {
    annotator: Arc<A>,
    lifecycle: Arc<SignalLifecycleManager>,
    cfg: ExecutorConfig,
}

impl<A: Annotator> AnnotationExecutor<A> {
    pub fn new(
        annotator: Arc<A>,
        lifecycle: Arc<SignalLifecycleManager>,
        cfg: ExecutorConfig,
    ) -> Self {
        Self {
            annotator,
            lifecycle,
            cfg: ExecutorConfig {
                max_in_flight: cfg.max_in_flight.max(1),
                ..cfg
            },
        }
    }

    /// Annotate one signal. Never fails; the result says what happened.
    pub async fn annotate_one(&self, req: AnnotationRequest) -> AnnotationResult {
        let span = root_span("annotation", &TraceId::new());

        async {
            annotate_span(req.instrument.as_str(), Some(&req.signal_id));

            let call = warn_if_slow("annotate", SLOW_ANNOTATION, self.annotator.annotate(&req));
            let text = match tokio::time::timeout(self.cfg.timeout, call).await {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => return Self::keep_technical(e),
                Err(_) => {
                    return Self::keep_technical(AnnotateError::Timeout(
                        self.cfg.timeout.as_millis() as u64,
                    ));
                }
            };

            match self.lifecycle.apply_annotation(req.signal_id, text) {
                Ok(()) => {
                    debug!("rationale replaced");
                    AnnotationResult::Applied
                }
                Err(e) => {
                    warn!(error = %e, "annotation could not be applied");
                    AnnotationResult::KeptTechnical {
                        reason: e.to_string(),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    fn keep_technical(e: AnnotateError) -> AnnotationResult {
        warn!(
            component = "executor",
            event = "annotation_failed",
            error = %e,
            "annotation failed; keeping technical rationale"
        );
        AnnotationResult::KeptTechnical {
            reason: e.to_string(),
        }
    }

    /// Main worker loop. Exits once every sender is dropped and in-flight
    /// calls have finished.
    pub async fn run(self: Arc<Self>, mut rx: AnnotationReceiver) {
        info!(
            component = "executor",
            event = "startup",
            max_in_flight = self.cfg.max_in_flight,
            timeout_ms = self.cfg.timeout.as_millis() as u64,
            "annotation executor started"
        );

        let mut in_flight = JoinSet::new();

        while let Some(req) = rx.recv().await {
            while in_flight.len() >= self.cfg.max_in_flight {
                if let Some(Err(e)) = in_flight.join_next().await {
                    warn!(component = "executor", error = %e, "annotation task aborted");
                }
            }

            let this = Arc::clone(&self);
            in_flight.spawn(async move { this.annotate_one(req).await });
        }

        while let Some(res) = in_flight.join_next().await {
            if let Err(e) = res {
                warn!(component = "executor", error = %e, "annotation task aborted");
            }
        }

        info!(
            component = "executor",
            event = "shutdown",
            "annotation channel closed; executor stopped"
        );
    }
}
