use std::fmt;

use market::types::Instrument;
use serde::{Deserialize, Serialize};

pub type SignalId = uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Pending,
    Win,
    Loss,
}

impl Outcome {
    /// Win only on a strict move in the signalled direction; an unchanged
    /// price is a loss either way.
    pub fn decide(direction: Direction, entry_price: f64, close_price: f64) -> Self {
        let won = match direction {
            Direction::Up => close_price > entry_price,
            Direction::Down => close_price < entry_price,
        };
        if won { Outcome::Win } else { Outcome::Loss }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Pending => "PENDING",
            Outcome::Win => "WIN",
            Outcome::Loss => "LOSS",
        })
    }
}

/// What the rule evaluator asks the lifecycle manager to open.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRequest {
    pub instrument: Instrument,
    pub direction: Direction,
    pub entry_price: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub id: SignalId,
    pub instrument: Instrument,
    pub direction: Direction,
    pub entry_price: f64,
    pub created_at_ms: u64,
    pub resolve_at_ms: u64,
    pub close_price: Option<f64>,
    pub resolved_at_ms: Option<u64>,
    pub outcome: Outcome,
    /// Technical rationale until a post-hoc explanation replaces it.
    pub rationale: String,
    pub annotated: bool,
    /// Display stake; carries no sizing semantics.
    pub amount: f64,
}

impl Signal {
    pub fn is_pending(&self) -> bool {
        self.outcome == Outcome::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_wins_only_on_strict_rise() {
        assert_eq!(Outcome::decide(Direction::Up, 100.0, 100.1), Outcome::Win);
        assert_eq!(Outcome::decide(Direction::Up, 100.0, 99.9), Outcome::Loss);
    }

    #[test]
    fn down_wins_only_on_strict_fall() {
        assert_eq!(Outcome::decide(Direction::Down, 100.0, 99.9), Outcome::Win);
        assert_eq!(Outcome::decide(Direction::Down, 100.0, 100.1), Outcome::Loss);
    }

    #[test]
    fn unchanged_price_is_a_loss_for_up() {
        assert_eq!(Outcome::decide(Direction::Up, 101.2, 101.2), Outcome::Loss);
    }

    #[test]
    fn unchanged_price_is_a_loss_for_down() {
        assert_eq!(Outcome::decide(Direction::Down, 101.2, 101.2), Outcome::Loss);
    }
}
