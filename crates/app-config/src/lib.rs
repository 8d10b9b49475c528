// In crates/app-config/src/lib.rs

use config::{Config, Environment, File};
use std::path::Path;
use strategies::RollingLowSignal;

pub mod error;
pub mod types;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use types::{LiveConfig, LiveSettings, PaperSettings, Settings};

/// Loads the application settings from `config/`.
///
/// Layering, later sources winning:
/// 1. `config/base.toml`.
/// 2. `config/{APP_ENVIRONMENT}.toml` (optional, default "development").
/// 3. `APP__SECTION__KEY` environment variables.
pub fn load_settings() -> Result<Settings> {
    load_settings_from("config")
}

pub fn load_settings_from(dir: impl AsRef<Path>) -> Result<Settings> {
    let dir = dir.as_ref();
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

    let settings = Config::builder()
        .add_source(File::with_name(&dir.join("base").to_string_lossy()))
        .add_source(File::with_name(&dir.join(&environment).to_string_lossy()).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Loads the traded asset list from `config/live.toml`.
pub fn load_live_config() -> Result<LiveConfig> {
    load_live_config_from("config/live.toml")
}

pub fn load_live_config_from(path: impl AsRef<Path>) -> Result<LiveConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: LiveConfig = toml::from_str(&content)?;
    Ok(config)
}

impl Settings {
    /// Rejects parameters no command can run with. Called once at startup.
    pub fn validate(&self) -> Result<()> {
        if self.binance.rest_base_url.trim().is_empty() {
            return Err(invalid("binance", "rest_base_url must not be empty"));
        }
        RollingLowSignal::from_settings(&self.signal).map_err(|e| invalid("signal", e))?;
        if self.signal.interval.trim().is_empty() {
            return Err(invalid("signal", "interval must not be empty"));
        }

        self.live.gate().validate().map_err(|e| invalid("live", e))?;
        if self.live.cycle_interval_secs == 0 {
            return Err(invalid("live", "cycle_interval_secs must be at least 1"));
        }
        if self.live.status_every_cycles == 0 {
            return Err(invalid("live", "status_every_cycles must be at least 1"));
        }

        self.round_trip.validate().map_err(|e| invalid("round_trip", e))?;
        self.accumulation.validate().map_err(|e| invalid("accumulation", e))?;
        self.sweep.validate().map_err(|e| invalid("sweep", e))?;

        for (name, value) in [
            ("taker_fee", self.paper.taker_fee),
            ("slippage_percent", self.paper.slippage_percent),
        ] {
            if !value.is_finite() || !(0.0..1.0).contains(&value) {
                return Err(invalid("paper", format!(
                    "{name} must be a fraction in [0, 1) (got {value})"
                )));
            }
        }
        Ok(())
    }
}

fn invalid(section: &'static str, reason: impl ToString) -> Error {
    Error::Invalid {
        section,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const BASE: &str = r#"
[app]
environment = "test"
log_level = "info"

[binance]
rest_base_url = "https://fapi.binance.com"

[signal]
window_size = 1440
range_pct = 0.05

[live]
position_value_usd = 20.0
max_position_value_usd = 140.0
"#;

    fn write_config(base: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.toml"), base).unwrap();
        dir
    }

    #[test]
    fn loads_base_with_defaults() {
        let dir = write_config(BASE);
        let settings = load_settings_from(dir.path()).unwrap();

        assert_eq!(settings.signal.window_size, 1440);
        assert_eq!(settings.signal.interval, "1m");
        assert_eq!(settings.live.buy_block_minutes, 60);
        assert_eq!(settings.live.cycle_interval_secs, 60);
        assert!(!settings.live.live_trading_enabled);
        assert_eq!(settings.sweep.range_candidates.len(), 10);
        settings.validate().unwrap();
    }

    #[test]
    fn rejects_zero_window() {
        let dir = write_config(&BASE.replace("window_size = 1440", "window_size = 0"));
        let settings = load_settings_from(dir.path()).unwrap();
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, Error::Invalid { section: "signal", .. }));
    }

    #[test]
    fn rejects_negative_range() {
        let dir = write_config(&BASE.replace("range_pct = 0.05", "range_pct = -1.0"));
        let settings = load_settings_from(dir.path()).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_position_size() {
        let dir = write_config(&BASE.replace("position_value_usd = 20.0", "position_value_usd = 0.0"));
        let settings = load_settings_from(dir.path()).unwrap();
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, Error::Invalid { section: "live", .. }));
    }

    #[test]
    fn live_config_lists_enabled_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.toml");
        fs::write(
            &path,
            r#"
[[pairs]]
symbol = "BTCUSDT"

[[pairs]]
symbol = "ETHUSDT"
enabled = false
"#,
        )
        .unwrap();
        let live = load_live_config_from(&path).unwrap();
        assert_eq!(live.enabled_symbols(), vec![core_types::Symbol::from("BTCUSDT")]);
    }
}
