use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use executor::{ExecutorConfig, GeminiConfig};
use market::feed::RandomWalkConfig;
use market::indicator::{IndicatorParams, TrackerConfig};
use market::types::{Instrument, default_instruments};
use signals::{LifecycleConfig, LifecycleError, SessionSchedule};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key}: cannot parse {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{key}: {reason}")]
    OutOfRange { key: &'static str, reason: String },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    // =========================
    // Market
    // =========================
    /// Tracked instruments. Fixed for the life of the process.
    pub instruments: Vec<Instrument>,

    /// Cadence of the simulated feed.
    pub tick_interval: Duration,

    /// Smoothing factors of the fast and slow averages.
    ///
    /// Fixed for the process; the period settings below only label them.
    pub ema_alpha_fast: f64,
    pub ema_alpha_slow: f64,

    /// Runtime-updatable indicator periods shown in rationale text.
    pub params: IndicatorParams,

    // =========================
    // Signal lifecycle
    // =========================
    /// Minimum spacing between any two signals, across instruments.
    pub cooldown_ms: u64,

    /// Delay from creation to win/loss resolution.
    pub resolve_delay_ms: u64,

    /// Local-hour session window `[start, end)`.
    pub session_start_hour: u32,
    pub session_end_hour: u32,

    /// Comparison figure on the status line, percent.
    pub rolling_average: f64,

    // =========================
    // Annotation
    // =========================
    /// Cap on one annotation call. The technical rationale is kept on expiry.
    pub annotation_timeout: Duration,

    /// Capacity of the engine -> executor channel. A full queue drops the
    /// annotation, never the signal.
    pub annotation_queue_capacity: usize,

    /// Annotation is disabled when unset.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,

    // =========================
    // Output
    // =========================
    /// Log a status line every N batches.
    pub status_every_ticks: u64,

    pub json_logs: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let instruments = match get("SIGNAL_INSTRUMENTS") {
            Some(raw) => {
                let list: Vec<Instrument> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(Instrument::from)
                    .collect();
                if list.is_empty() {
                    return Err(ConfigError::OutOfRange {
                        key: "SIGNAL_INSTRUMENTS",
                        reason: "no instruments listed".into(),
                    });
                }
                list
            }
            None => default_instruments(),
        };

        let defaults = IndicatorParams::default();
        let params = IndicatorParams {
            fast_period: parse(&get, "EMA_FAST_PERIOD", defaults.fast_period)?,
            slow_period: parse(&get, "EMA_SLOW_PERIOD", defaults.slow_period)?,
            oscillator_period: parse(&get, "OSCILLATOR_PERIOD", defaults.oscillator_period)?,
        };
        params.validate().map_err(|e| ConfigError::OutOfRange {
            key: "EMA_FAST_PERIOD",
            reason: e.to_string(),
        })?;

        let cfg = Self {
            instruments,
            tick_interval: Duration::from_millis(parse(&get, "TICK_INTERVAL_MS", 1_000)?),
            ema_alpha_fast: parse(&get, "EMA_ALPHA_FAST", 0.1)?,
            ema_alpha_slow: parse(&get, "EMA_ALPHA_SLOW", 0.05)?,
            params,
            cooldown_ms: parse(&get, "SIGNAL_COOLDOWN_MS", 90_000)?,
            resolve_delay_ms: parse(&get, "SIGNAL_RESOLVE_DELAY_MS", 60_000)?,
            session_start_hour: parse(&get, "SESSION_START_HOUR", 0)?,
            session_end_hour: parse(&get, "SESSION_END_HOUR", 12)?,
            rolling_average: parse(&get, "ROLLING_AVERAGE", 74.5)?,
            annotation_timeout: Duration::from_millis(parse(&get, "ANNOTATION_TIMEOUT_MS", 3_000)?),
            annotation_queue_capacity: parse(&get, "ANNOTATION_QUEUE_CAPACITY", 64)?,
            gemini_api_key: get("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.0-flash".to_string()),
            status_every_ticks: parse(&get, "STATUS_EVERY_TICKS", 30)?,
            json_logs: get("APP_ENV").is_some_and(|v| v == "production"),
        };

        if cfg.tick_interval.is_zero() {
            return Err(ConfigError::OutOfRange {
                key: "TICK_INTERVAL_MS",
                reason: "must be positive".into(),
            });
        }
        if cfg.annotation_queue_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                key: "ANNOTATION_QUEUE_CAPACITY",
                reason: "must be positive".into(),
            });
        }

        // fail on bad hours or lifecycle values at startup, not first use
        cfg.schedule()?;
        cfg.lifecycle_config().validate()?;

        Ok(cfg)
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            alpha_fast: self.ema_alpha_fast,
            alpha_slow: self.ema_alpha_slow,
            ..Default::default()
        }
    }

    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            cooldown_ms: self.cooldown_ms,
            resolve_delay_ms: self.resolve_delay_ms,
            ..Default::default()
        }
    }

    pub fn schedule(&self) -> Result<SessionSchedule, LifecycleError> {
        SessionSchedule::new(self.session_start_hour, self.session_end_hour)
    }

    pub fn random_walk_config(&self, seed: Option<u64>) -> RandomWalkConfig {
        RandomWalkConfig {
            cadence: self.tick_interval,
            seed,
            ..Default::default()
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            timeout: self.annotation_timeout,
            ..Default::default()
        }
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            model: self.gemini_model.clone(),
            api_key: self.gemini_api_key.clone(),
            ..Default::default()
        }
    }
}

fn parse<F, T>(get: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_match_reference_behaviour() {
        let cfg = from(&[]).unwrap();

        assert_eq!(cfg.instruments.len(), 10);
        assert_eq!(cfg.tick_interval, Duration::from_secs(1));
        assert_eq!(cfg.cooldown_ms, 90_000);
        assert_eq!(cfg.resolve_delay_ms, 60_000);
        assert_eq!((cfg.session_start_hour, cfg.session_end_hour), (0, 12));
        assert_eq!(cfg.params, IndicatorParams::default());
        assert_eq!(cfg.rolling_average, 74.5);
        assert_eq!(cfg.annotation_timeout, Duration::from_secs(3));
        assert!(cfg.gemini_api_key.is_none());
        assert!(!cfg.json_logs);
    }

    #[test]
    fn env_overrides_apply() {
        let cfg = from(&[
            ("SIGNAL_INSTRUMENTS", "AAA, BBB ,,"),
            ("SIGNAL_COOLDOWN_MS", "60000"),
            ("SESSION_START_HOUR", "22"),
            ("SESSION_END_HOUR", "3"),
            ("GEMINI_API_KEY", "secret"),
            ("APP_ENV", "production"),
        ])
        .unwrap();

        assert_eq!(cfg.instruments, vec![Instrument::from("AAA"), Instrument::from("BBB")]);
        assert_eq!(cfg.cooldown_ms, 60_000);
        assert!(cfg.schedule().unwrap().contains_hour(23));
        assert_eq!(cfg.gemini_api_key.as_deref(), Some("secret"));
        assert!(cfg.json_logs);
    }

    #[test]
    fn unparsable_value_names_the_key() {
        let err = from(&[("SIGNAL_COOLDOWN_MS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SIGNAL_COOLDOWN_MS", .. }));
    }

    #[test]
    fn invalid_ranges_fail_at_startup() {
        assert!(from(&[("SESSION_START_HOUR", "5"), ("SESSION_END_HOUR", "5")]).is_err());
        assert!(from(&[("EMA_FAST_PERIOD", "30")]).is_err());
        assert!(from(&[("SIGNAL_RESOLVE_DELAY_MS", "0")]).is_err());
        assert!(from(&[("SIGNAL_INSTRUMENTS", " , ")]).is_err());
        assert!(from(&[("TICK_INTERVAL_MS", "0")]).is_err());
    }

    #[test]
    fn absurd_delays_are_rejected() {
        let err = from(&[("SIGNAL_RESOLVE_DELAY_MS", "18446744073709551615")]).unwrap_err();
        assert!(matches!(err, ConfigError::Lifecycle(_)));
        assert!(matches!(
            from(&[("SIGNAL_COOLDOWN_MS", "86400001")]),
            Err(ConfigError::Lifecycle(_))
        ));
        assert!(from(&[("SIGNAL_COOLDOWN_MS", "60000")]).is_ok());
    }
}
