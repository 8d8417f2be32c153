pub mod error;
pub mod manager;
pub mod model;
pub mod queue;
pub mod session;
pub mod stats;

pub use error::LifecycleError;
pub use manager::{Admission, LifecycleConfig, Rejection, SignalLifecycleManager};
pub use model::{Direction, Outcome, Signal, SignalId, SignalRequest};
pub use session::{SessionSchedule, SessionTransition};
pub use stats::{AggregateStats, SessionStats, SessionSummary};
