pub mod counters;
pub mod engine;
pub mod rules;
pub mod types;

pub use counters::{CounterSnapshot, EngineCounters};
pub use engine::{EngineConfig, EngineView, SignalEngine, TickOutcome};
pub use rules::{Rule, RuleThresholds, Trigger, evaluate, evaluate_state};
pub use types::{AnnotationReceiver, AnnotationRequest, AnnotationSender};
