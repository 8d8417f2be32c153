use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::model::{Outcome, Signal, SignalId, SignalRequest};
use crate::queue::ResolutionQueue;
use crate::session::SessionTransition;
use crate::stats::{AggregateStats, SessionStats, SessionSummary};
use market::types::Instrument;

/// Upper bound for the cooldown and resolution delay (one day).
pub const MAX_DELAY_MS: u64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifecycleConfig {
    /// Minimum spacing between any two created signals.
    pub cooldown_ms: u64,
    /// Delay from creation to resolution.
    pub resolve_delay_ms: u64,
    pub signal_amount: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 90_000,
            resolve_delay_ms: 60_000,
            signal_amount: 1.0,
        }
    }
}

impl LifecycleConfig {
    pub fn validate(&self) -> Result<(), LifecycleError> {
        if self.resolve_delay_ms == 0 || self.resolve_delay_ms > MAX_DELAY_MS {
            return Err(LifecycleError::InvalidConfig(format!(
                "resolve delay must be within 1..={MAX_DELAY_MS} ms, got {}",
                self.resolve_delay_ms
            )));
        }
        if self.cooldown_ms > MAX_DELAY_MS {
            return Err(LifecycleError::InvalidConfig(format!(
                "cooldown must be at most {MAX_DELAY_MS} ms, got {}",
                self.cooldown_ms
            )));
        }
        if !(self.signal_amount.is_finite() && self.signal_amount > 0.0) {
            return Err(LifecycleError::InvalidConfig(format!(
                "signal amount must be positive, got {}",
                self.signal_amount
            )));
        }
        Ok(())
    }
}

/// Why a candidate did not become a signal. Candidates are dropped, not
/// queued.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    CooldownActive { remaining_ms: u64 },
    InstrumentLocked { open_signal: SignalId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    Created(Signal),
    Rejected(Rejection),
}

impl Admission {
    pub fn created(&self) -> Option<&Signal> {
        match self {
            Admission::Created(s) => Some(s),
            Admission::Rejected(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct LifecycleState {
    open: HashMap<SignalId, Signal>,
    resolved: Vec<Signal>,
    resolved_index: HashMap<SignalId, usize>,
    locks: HashMap<Instrument, SignalId>,
    last_created_ms: Option<u64>,
    queue: ResolutionQueue,
    aggregate: AggregateStats,
    session: SessionStats,
    session_active: bool,
    /// Signals created during the current session.
    session_members: HashSet<SignalId>,
    pending_summary: Option<SessionSummary>,
}

/// Owns signal admission, resolution and every counter derived from them.
///
/// All mutation happens under one lock: the cooldown and instrument-lock
/// checks and the writes that claim them are a single step, so two
/// candidates can never both pass admission.
pub struct SignalLifecycleManager {
    cfg: LifecycleConfig,
    state: Mutex<LifecycleState>,
}

impl SignalLifecycleManager {
    pub fn new(cfg: LifecycleConfig) -> Result<Self, LifecycleError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            state: Mutex::new(LifecycleState::default()),
        })
    }

    pub fn config(&self) -> LifecycleConfig {
        self.cfg
    }

    /// Admit or reject a candidate at `now_ms`.
    pub fn try_create(&self, req: SignalRequest, now_ms: u64) -> Admission {
        let mut st = self.state.lock();

        if let Some(last) = st.last_created_ms {
            let elapsed = now_ms.saturating_sub(last);
            if elapsed < self.cfg.cooldown_ms {
                let remaining_ms = self.cfg.cooldown_ms - elapsed;
                debug!(instrument = %req.instrument, remaining_ms, "candidate rejected: cooldown");
                return Admission::Rejected(Rejection::CooldownActive { remaining_ms });
            }
        }

        if let Some(open) = st.locks.get(&req.instrument) {
            debug!(instrument = %req.instrument, open_signal = %open, "candidate rejected: instrument locked");
            return Admission::Rejected(Rejection::InstrumentLocked { open_signal: *open });
        }

        let signal = Signal {
            id: Uuid::new_v4(),
            instrument: req.instrument,
            direction: req.direction,
            entry_price: req.entry_price,
            created_at_ms: now_ms,
            resolve_at_ms: now_ms.saturating_add(self.cfg.resolve_delay_ms),
            close_price: None,
            resolved_at_ms: None,
            outcome: Outcome::Pending,
            rationale: req.rationale,
            annotated: false,
            amount: self.cfg.signal_amount,
        };

        st.last_created_ms = Some(now_ms);
        st.locks.insert(signal.instrument.clone(), signal.id);
        st.queue.schedule(signal.resolve_at_ms, signal.id);
        st.aggregate.total_signals += 1;
        if st.session_active {
            st.session.total += 1;
            st.session_members.insert(signal.id);
        }
        st.open.insert(signal.id, signal.clone());

        info!(
            signal_id = %signal.id,
            instrument = %signal.instrument,
            direction = %signal.direction,
            entry_price = signal.entry_price,
            resolve_at_ms = signal.resolve_at_ms,
            "signal created"
        );

        Admission::Created(signal)
    }

    /// Earliest pending resolution time.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.state.lock().queue.next_due_ms()
    }

    /// Resolve every signal due at `now_ms`, closing each at the price
    /// `price_of` reports for its instrument.
    pub fn resolve_due<F>(&self, now_ms: u64, price_of: F) -> Vec<Signal>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let mut guard = self.state.lock();
        let st = &mut *guard;
        let mut out = Vec::new();

        while let Some((_, id)) = st.queue.pop_due(now_ms) {
            let Some((instrument, entry)) = st
                .open
                .get(&id)
                .map(|s| (s.instrument.clone(), s.entry_price))
            else {
                // resolved explicitly ahead of its queue entry
                continue;
            };

            let close = price_of(instrument.as_str()).unwrap_or_else(|| {
                error!(signal_id = %id, %instrument, "no current price at resolution; closing at entry");
                entry
            });

            match Self::settle(st, id, close, now_ms) {
                Ok(sig) => out.push(sig),
                Err(e) => error!(signal_id = %id, error = %e, "resolution failed"),
            }
        }

        out
    }

    /// Resolve a single signal. Fails when it is unknown, already resolved
    /// or not yet due; a failed call changes nothing.
    pub fn resolve(
        &self,
        id: SignalId,
        close_price: f64,
        now_ms: u64,
    ) -> Result<Signal, LifecycleError> {
        let mut guard = self.state.lock();
        let st = &mut *guard;

        if st.resolved_index.contains_key(&id) {
            return Err(LifecycleError::AlreadyResolved(id));
        }
        let sig = st.open.get(&id).ok_or(LifecycleError::UnknownSignal(id))?;
        if now_ms < sig.resolve_at_ms {
            return Err(LifecycleError::NotDue {
                id,
                resolve_at_ms: sig.resolve_at_ms,
                now_ms,
            });
        }

        Self::settle(st, id, close_price, now_ms)
    }

    fn settle(
        st: &mut LifecycleState,
        id: SignalId,
        close_price: f64,
        now_ms: u64,
    ) -> Result<Signal, LifecycleError> {
        let mut sig = st.open.remove(&id).ok_or(LifecycleError::UnknownSignal(id))?;

        sig.close_price = Some(close_price);
        sig.resolved_at_ms = Some(now_ms);
        sig.outcome = Outcome::decide(sig.direction, sig.entry_price, close_price);

        if st.locks.get(&sig.instrument) == Some(&id) {
            st.locks.remove(&sig.instrument);
        } else {
            let holder = st.locks.get(&sig.instrument).copied();
            error!(signal_id = %id, instrument = %sig.instrument, holder = ?holder, "instrument lock not held by resolving signal");
            debug_assert!(false, "instrument lock not held by resolving signal");
        }

        let in_session = st.session_active && st.session_members.remove(&id);
        match sig.outcome {
            Outcome::Win => {
                st.aggregate.today_wins += 1;
                if in_session {
                    st.session.wins += 1;
                }
            }
            Outcome::Loss => {
                st.aggregate.today_losses += 1;
                if in_session {
                    st.session.losses += 1;
                }
            }
            Outcome::Pending => {}
        }

        info!(
            signal_id = %id,
            instrument = %sig.instrument,
            direction = %sig.direction,
            entry_price = sig.entry_price,
            close_price,
            outcome = %sig.outcome,
            "signal resolved"
        );

        st.resolved_index.insert(id, st.resolved.len());
        st.resolved.push(sig.clone());
        Ok(sig)
    }

    /// Replace the rationale of a resolved signal. Outcome, prices and
    /// counters are untouched.
    pub fn apply_annotation(&self, id: SignalId, text: String) -> Result<(), LifecycleError> {
        let mut st = self.state.lock();

        if st.open.contains_key(&id) {
            return Err(LifecycleError::NotResolved(id));
        }
        let idx = *st
            .resolved_index
            .get(&id)
            .ok_or(LifecycleError::UnknownSignal(id))?;

        let sig = &mut st.resolved[idx];
        sig.rationale = text;
        sig.annotated = true;
        debug!(signal_id = %id, "annotation applied");
        Ok(())
    }

    /// Feed the current session flag. Entering a session resets its
    /// counters; leaving one with activity raises a summary.
    pub fn set_session_active(&self, active: bool) -> SessionTransition {
        let mut st = self.state.lock();
        if st.session_active == active {
            return SessionTransition::Unchanged;
        }
        st.session_active = active;

        if active {
            st.session = SessionStats::default();
            st.session_members.clear();
            st.pending_summary = None;
            info!("session opened");
            SessionTransition::Opened
        } else {
            let summary = (st.session.total > 0).then(|| SessionSummary::from(st.session));
            st.pending_summary = summary;
            if let Some(s) = &summary {
                info!(wins = s.wins, losses = s.losses, total = s.total, win_rate_pct = s.win_rate_pct, "session closed");
            } else {
                info!("session closed without signals");
            }
            SessionTransition::Closed(summary)
        }
    }

    pub fn is_session_active(&self) -> bool {
        self.state.lock().session_active
    }

    /// Hands out the end-of-session summary at most once.
    pub fn take_summary(&self) -> Option<SessionSummary> {
        self.state.lock().pending_summary.take()
    }

    /// Clear the per-day counters. The lifetime total is kept.
    pub fn reset_today(&self) {
        let mut st = self.state.lock();
        st.aggregate.today_wins = 0;
        st.aggregate.today_losses = 0;
        info!(total_signals = st.aggregate.total_signals, "daily counters reset");
    }

    pub fn set_rolling_average(&self, pct: f64) {
        if !pct.is_finite() {
            warn!(pct, "ignoring non-finite rolling average");
            return;
        }
        self.state.lock().aggregate.rolling_average = pct;
    }

    pub fn aggregate_stats(&self) -> AggregateStats {
        self.state.lock().aggregate
    }

    pub fn session_stats(&self) -> SessionStats {
        self.state.lock().session
    }

    pub fn is_locked(&self, instrument: &str) -> bool {
        self.state.lock().locks.contains_key(instrument)
    }

    pub fn signal(&self, id: SignalId) -> Option<Signal> {
        let st = self.state.lock();
        st.open
            .get(&id)
            .cloned()
            .or_else(|| st.resolved_index.get(&id).map(|i| st.resolved[*i].clone()))
    }

    /// Pending signals, newest first.
    pub fn open_signals(&self) -> Vec<Signal> {
        let st = self.state.lock();
        let mut v: Vec<Signal> = st.open.values().cloned().collect();
        v.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        v
    }

    /// Resolved signals, most recently resolved first.
    pub fn resolved_signals(&self) -> Vec<Signal> {
        self.state.lock().resolved.iter().rev().cloned().collect()
    }
}
