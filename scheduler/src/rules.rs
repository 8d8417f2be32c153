//! Decides whether an instrument's indicator state fires a signal.
//!
//! Evaluation is pure: it reads no clock and keeps no state between calls.

use std::fmt;

use serde::{Deserialize, Serialize};

use market::indicator::{IndicatorParams, IndicatorState};
use market::types::{EnrichedTick, Instrument};
use signals::{Direction, SignalRequest};

/// Oscillator thresholds that gate each rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleThresholds {
    /// Bullish cross fires only below this oscillator level.
    pub cross_up_max: f64,
    /// Bearish cross fires only above this oscillator level.
    pub cross_down_min: f64,
    pub oversold_max: f64,
    pub overbought_min: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            cross_up_max: 35.0,
            cross_down_min: 65.0,
            oversold_max: 25.0,
            overbought_min: 75.0,
        }
    }
}

/// Rules in evaluation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Rule {
    BullishCross,
    BearishCross,
    OversoldRejection,
    OverboughtRejection,
}

impl Rule {
    pub fn direction(&self) -> Direction {
        match self {
            Rule::BullishCross | Rule::OversoldRejection => Direction::Up,
            Rule::BearishCross | Rule::OverboughtRejection => Direction::Down,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rule::BullishCross => "bullish_cross",
            Rule::BearishCross => "bearish_cross",
            Rule::OversoldRejection => "oversold_rejection",
            Rule::OverboughtRejection => "overbought_rejection",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub rule: Rule,
    pub direction: Direction,
    pub rationale: String,
}

impl Trigger {
    pub fn into_request(self, instrument: Instrument, price: f64) -> SignalRequest {
        SignalRequest {
            instrument,
            direction: self.direction,
            entry_price: price,
            rationale: self.rationale,
        }
    }
}

/// Evaluate one enriched tick with the params it was computed under.
pub fn evaluate(tick: &EnrichedTick, th: &RuleThresholds) -> Option<Trigger> {
    evaluate_state(tick.price, &tick.indicators, &tick.params, th)
}

/// First matching rule wins: crosses before band rejections.
pub fn evaluate_state(
    price: f64,
    s: &IndicatorState,
    params: &IndicatorParams,
    th: &RuleThresholds,
) -> Option<Trigger> {
    let osc = s.oscillator;

    let crossed_up = s.prev_ema_fast <= s.prev_ema_slow && s.ema_fast > s.ema_slow;
    if crossed_up && osc < th.cross_up_max {
        return Some(trigger(
            Rule::BullishCross,
            format!(
                "EMA {} crossed above EMA {} with oscillator at {osc:.0} (bullish momentum)",
                params.fast_period, params.slow_period
            ),
        ));
    }

    let crossed_down = s.prev_ema_fast >= s.prev_ema_slow && s.ema_fast < s.ema_slow;
    if crossed_down && osc > th.cross_down_min {
        return Some(trigger(
            Rule::BearishCross,
            format!(
                "EMA {} crossed below EMA {} with oscillator at {osc:.0} (bearish momentum)",
                params.fast_period, params.slow_period
            ),
        ));
    }

    if price <= s.band_lower && osc < th.oversold_max {
        return Some(trigger(
            Rule::OversoldRejection,
            format!(
                "Price {price:.4} rejected lower band {:.4} with oversold oscillator ({osc:.0})",
                s.band_lower
            ),
        ));
    }

    if price >= s.band_upper && osc > th.overbought_min {
        return Some(trigger(
            Rule::OverboughtRejection,
            format!(
                "Price {price:.4} rejected upper band {:.4} with overbought oscillator ({osc:.0})",
                s.band_upper
            ),
        ));
    }

    None
}

fn trigger(rule: Rule, rationale: String) -> Trigger {
    Trigger {
        rule,
        direction: rule.direction(),
        rationale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state(prev: (f64, f64), cur: (f64, f64), osc: f64, band: (f64, f64)) -> IndicatorState {
        IndicatorState {
            ema_fast: cur.0,
            ema_slow: cur.1,
            prev_ema_fast: prev.0,
            prev_ema_slow: prev.1,
            oscillator: osc,
            band_lower: band.0,
            band_upper: band.1,
        }
    }

    fn eval(price: f64, s: &IndicatorState) -> Option<Trigger> {
        evaluate_state(price, s, &IndicatorParams::default(), &RuleThresholds::default())
    }

    #[test]
    fn bullish_cross_with_low_oscillator_fires_up() {
        let s = state((100.0, 100.5), (101.0, 100.6), 30.0, (99.0, 102.0));
        let t = eval(101.2, &s).unwrap();

        assert_eq!(t.rule, Rule::BullishCross);
        assert_eq!(t.direction, Direction::Up);
        assert_eq!(
            t.rationale,
            "EMA 9 crossed above EMA 21 with oscillator at 30 (bullish momentum)"
        );
    }

    #[test]
    fn bullish_cross_needs_oscillator_below_threshold() {
        let s = state((100.0, 100.5), (101.0, 100.6), 35.0, (99.0, 102.0));
        assert!(eval(101.2, &s).is_none());
    }

    #[test]
    fn touching_from_equal_counts_as_cross() {
        let s = state((100.0, 100.0), (100.1, 100.0), 20.0, (95.0, 105.0));
        assert_eq!(eval(100.0, &s).unwrap().rule, Rule::BullishCross);
    }

    #[test]
    fn level_without_sign_change_is_not_a_cross() {
        // fast already above slow on the previous update
        let s = state((101.0, 100.0), (101.5, 100.1), 20.0, (95.0, 105.0));
        assert!(eval(100.0, &s).is_none());
    }

    #[test]
    fn bearish_cross_with_high_oscillator_fires_down() {
        let s = state((101.0, 100.0), (99.9, 100.0), 70.0, (95.0, 105.0));
        let t = eval(100.0, &s).unwrap();
        assert_eq!(t.rule, Rule::BearishCross);
        assert_eq!(t.direction, Direction::Down);
        assert!(t.rationale.contains("crossed below"));
    }

    #[test]
    fn oversold_band_rejection_fires_up() {
        let s = state((100.0, 100.0), (100.0, 100.0), 20.0, (99.0, 101.0));
        let t = eval(99.0, &s).unwrap();
        assert_eq!(t.rule, Rule::OversoldRejection);
        assert_eq!(t.direction, Direction::Up);
        assert!(t.rationale.contains("99.0000"));
        assert!(t.rationale.contains("(20)"));
    }

    #[test]
    fn overbought_band_rejection_fires_down() {
        let s = state((100.0, 100.0), (100.0, 100.0), 80.0, (99.0, 101.0));
        let t = eval(101.5, &s).unwrap();
        assert_eq!(t.rule, Rule::OverboughtRejection);
        assert_eq!(t.direction, Direction::Down);
    }

    #[test]
    fn cross_takes_priority_over_band() {
        // oversold band and bullish cross at once
        let s = state((98.0, 99.0), (99.5, 99.2), 20.0, (99.6, 101.0));
        assert_eq!(eval(99.0, &s).unwrap().rule, Rule::BullishCross);
    }

    #[test]
    fn rationale_uses_current_periods() {
        let s = state((100.0, 100.5), (101.0, 100.6), 30.0, (99.0, 102.0));
        let params = IndicatorParams {
            fast_period: 5,
            slow_period: 50,
            oscillator_period: 7,
        };
        let t = evaluate_state(101.2, &s, &params, &RuleThresholds::default()).unwrap();
        assert!(t.rationale.starts_with("EMA 5 crossed above EMA 50"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn evaluation_is_deterministic(
            pf in 90.0f64..110.0, ps in 90.0f64..110.0,
            f in 90.0f64..110.0, sl in 90.0f64..110.0,
            osc in 10.0f64..90.0, price in 90.0f64..110.0,
        ) {
            let s = state((pf, ps), (f, sl), osc, (sl - 1.0, sl + 1.0));
            prop_assert_eq!(eval(price, &s), eval(price, &s));
        }

        #[test]
        fn neutral_oscillator_never_fires(
            pf in 90.0f64..110.0, ps in 90.0f64..110.0,
            f in 90.0f64..110.0, sl in 90.0f64..110.0,
            osc in 35.0f64..=65.0, price in 80.0f64..120.0,
        ) {
            let s = state((pf, ps), (f, sl), osc, (sl - 1.0, sl + 1.0));
            prop_assert!(eval(price, &s).is_none());
        }
    }
}
