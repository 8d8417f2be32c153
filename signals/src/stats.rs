use serde::Serialize;

/// Aggregate counters. `today_*` reset on day rollover, `total_signals`
/// never does.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateStats {
    pub today_wins: u64,
    pub today_losses: u64,
    pub total_signals: u64,
    /// Externally supplied comparison figure, percent.
    pub rolling_average: f64,
}

impl AggregateStats {
    pub const DEFAULT_ROLLING_AVERAGE: f64 = 74.5;

    /// Today's wins over lifetime signals, percent.
    pub fn today_win_rate_pct(&self) -> f64 {
        pct(self.today_wins, self.total_signals)
    }
}

impl Default for AggregateStats {
    fn default() -> Self {
        Self {
            today_wins: 0,
            today_losses: 0,
            total_signals: 0,
            rolling_average: Self::DEFAULT_ROLLING_AVERAGE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub wins: u64,
    pub losses: u64,
    /// Signals created during the session, resolved or not.
    pub total: u64,
}

impl SessionStats {
    /// Wins over every signal created in the session, pending included.
    pub fn win_rate_pct(&self) -> f64 {
        pct(self.wins, self.total)
    }
}

/// Snapshot raised once when a session with activity ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionSummary {
    pub wins: u64,
    pub losses: u64,
    pub total: u64,
    pub win_rate_pct: f64,
}

impl From<SessionStats> for SessionSummary {
    fn from(s: SessionStats) -> Self {
        Self {
            wins: s.wins,
            losses: s.losses,
            total: s.total,
            win_rate_pct: s.win_rate_pct(),
        }
    }
}

fn pct(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
