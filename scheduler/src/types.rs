//! Jobs handed from the engine to the annotation executor.

use std::fmt;

use tokio::sync::mpsc::{Receiver, Sender};

use market::types::Instrument;
use signals::{Direction, Signal, SignalId};

/// Ask the executor to explain one resolved signal.
///
/// `rationale` is the technical text and doubles as the fallback.
#[derive(Clone)]
pub struct AnnotationRequest {
    pub signal_id: SignalId,
    pub instrument: Instrument,
    pub direction: Direction,
    pub entry_price: f64,
    pub close_price: f64,
    pub rationale: String,
}

impl AnnotationRequest {
    /// `None` while the signal is still pending.
    pub fn from_resolved(signal: &Signal) -> Option<Self> {
        let close_price = signal.close_price?;
        Some(Self {
            signal_id: signal.id,
            instrument: signal.instrument.clone(),
            direction: signal.direction,
            entry_price: signal.entry_price,
            close_price,
            rationale: signal.rationale.clone(),
        })
    }
}

impl fmt::Debug for AnnotationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationRequest")
            .field("signal_id", &self.signal_id)
            .field("instrument", &self.instrument)
            .field("direction", &self.direction)
            .field("entry_price", &self.entry_price)
            .field("close_price", &self.close_price)
            .finish()
    }
}

pub type AnnotationSender = Sender<AnnotationRequest>;
pub type AnnotationReceiver = Receiver<AnnotationRequest>;
