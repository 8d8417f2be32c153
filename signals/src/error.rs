use thiserror::Error;

use crate::model::SignalId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("signal {0} not found")]
    UnknownSignal(SignalId),

    #[error("signal {0} already resolved")]
    AlreadyResolved(SignalId),

    #[error("signal {id} not due until {resolve_at_ms} (now {now_ms})")]
    NotDue {
        id: SignalId,
        resolve_at_ms: u64,
        now_ms: u64,
    },

    #[error("signal {0} is still pending")]
    NotResolved(SignalId),

    #[error("invalid lifecycle config: {0}")]
    InvalidConfig(String),
}
