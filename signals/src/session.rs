//! Daily session window.
//!
//! Membership is decided from the local wall-clock hour over
//! `[start_hour, end_hour)`. A window whose end is before its start wraps
//! past midnight.

use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;
use crate::stats::SessionSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSchedule {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for SessionSchedule {
    fn default() -> Self {
        Self {
            start_hour: 0,
            end_hour: 12,
        }
    }
}

impl SessionSchedule {
    pub fn new(start_hour: u32, end_hour: u32) -> Result<Self, LifecycleError> {
        if start_hour > 23 || end_hour > 24 {
            return Err(LifecycleError::InvalidConfig(format!(
                "session hours out of range: {start_hour}..{end_hour}"
            )));
        }
        if start_hour == end_hour {
            return Err(LifecycleError::InvalidConfig(
                "session window is empty".into(),
            ));
        }
        Ok(Self {
            start_hour,
            end_hour,
        })
    }

    /// Schedule that is active at every hour.
    pub fn always() -> Self {
        Self {
            start_hour: 0,
            end_hour: 24,
        }
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        if self.start_hour < self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }

    pub fn is_active_at(&self, ms: u64) -> bool {
        self.contains_hour(common::time::local_hour(ms))
    }
}

/// Result of feeding a session flag into the lifecycle manager.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionTransition {
    Unchanged,
    /// Counters were reset for the new session.
    Opened,
    /// Carries the summary when the ending session produced any signals.
    Closed(Option<SessionSummary>),
}
