use clap::Parser;

use crate::config::AppConfig;
use market::types::Instrument;

#[derive(Debug, Parser)]
#[clap(name = "signalpulse", version)]
pub struct Cli {
    /// Instruments to track (comma-separated); overrides SIGNAL_INSTRUMENTS
    #[clap(long, value_delimiter = ',')]
    pub instruments: Vec<String>,

    /// Seed for the simulated feed and oscillator jitter
    #[clap(long)]
    pub seed: Option<u64>,

    /// Stop after this many tick batches
    #[clap(long)]
    pub max_ticks: Option<u64>,

    /// Ignore the session window and evaluate around the clock
    #[clap(long)]
    pub always_on: bool,

    /// Emit JSON logs regardless of APP_ENV
    #[clap(long)]
    pub json_logs: bool,
}

impl Cli {
    /// Fold command-line overrides into the env-derived config.
    pub(crate) fn apply(&self, cfg: &mut AppConfig) {
        let listed: Vec<Instrument> = self
            .instruments
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(Instrument::from)
            .collect();
        if !listed.is_empty() {
            cfg.instruments = listed;
        }
        if self.json_logs {
            cfg.json_logs = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse() {
        let cli = Cli::parse_from([
            "signalpulse",
            "--instruments",
            "AAA,BBB",
            "--seed",
            "7",
            "--max-ticks",
            "100",
            "--always-on",
        ]);
        assert_eq!(cli.instruments, vec!["AAA", "BBB"]);
        assert_eq!(cli.seed, Some(7));
        assert_eq!(cli.max_ticks, Some(100));
        assert!(cli.always_on);
        assert!(!cli.json_logs);
    }

    #[test]
    fn instruments_flag_overrides_config() {
        let mut cfg = AppConfig::from_lookup(|_| None).unwrap();
        let cli = Cli::parse_from(["signalpulse", "--instruments", "ZZZ", "--json-logs"]);
        cli.apply(&mut cfg);

        assert_eq!(cfg.instruments, vec![Instrument::from("ZZZ")]);
        assert!(cfg.json_logs);
    }
}
