//! Bounded momentum proxy.
//!
//! Each update nudges the previous value up when price rose since the last
//! tick and down otherwise (a flat tick counts as down), adds bounded jitter
//! and clamps the result to `[OSCILLATOR_MIN, OSCILLATOR_MAX]`. The value
//! never reaches 0 or 100.

use rand::Rng;

use crate::error::MarketError;

pub const OSCILLATOR_MIN: f64 = 10.0;
pub const OSCILLATOR_MAX: f64 = 90.0;
pub const OSCILLATOR_NEUTRAL: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumOscillator {
    step: f64,
    jitter: f64,
}

impl MomentumOscillator {
    pub fn new(step: f64, jitter: f64) -> Result<Self, MarketError> {
        if !step.is_finite() || step < 0.0 || !jitter.is_finite() || jitter < 0.0 {
            return Err(MarketError::InvalidParams(format!(
                "oscillator step/jitter must be finite and non-negative, got {step}/{jitter}"
            )));
        }
        Ok(Self { step, jitter })
    }

    pub fn next<R: Rng>(&self, prev: f64, rose: bool, rng: &mut R) -> f64 {
        let bias = if rose { self.step } else { -self.step };
        let noise = if self.jitter > 0.0 {
            rng.random_range(-self.jitter..=self.jitter)
        } else {
            0.0
        };
        (prev + bias + noise).clamp(OSCILLATOR_MIN, OSCILLATOR_MAX)
    }
}
