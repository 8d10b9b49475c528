// In crates/app-config/src/types.rs

use backtester::types::{AccumulationSettings, RoundTripSettings, SweepSettings};
use risk::types::BuyGateSettings;
use serde::Deserialize;
use strategies::types::RollingLowSettings;

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// The application's general settings.
    pub app: AppSettings,
    /// Settings for the Binance API.
    pub binance: BinanceSettings,
    /// Rolling-low window and buy range.
    #[serde(default)]
    pub signal: RollingLowSettings,
    #[serde(default)]
    pub live: LiveSettings,
    #[serde(default)]
    pub round_trip: RoundTripSettings,
    #[serde(default)]
    pub accumulation: AccumulationSettings,
    #[serde(default)]
    pub sweep: SweepSettings,
    #[serde(default)]
    pub paper: PaperSettings,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    pub environment: String,
    /// The log level for the application.
    pub log_level: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BinanceSettings {
    /// The API key for Binance.
    #[serde(default)]
    pub api_key: String,
    /// The secret key for Binance.
    #[serde(default)]
    pub secret_key: String,
    /// The REST API base URL for Binance.
    pub rest_base_url: String,
}

impl BinanceSettings {
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty()
    }
}

/// The live accumulation loop.
#[derive(Deserialize, Debug, Clone)]
pub struct LiveSettings {
    /// USD value of every buy.
    pub position_value_usd: f64,
    /// Per-asset ceiling on the total position value.
    pub max_position_value_usd: f64,
    /// Minimum minutes between two buys of the same asset.
    #[serde(default = "default_buy_block_minutes")]
    pub buy_block_minutes: u64,
    /// Seconds between two cycles.
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,
    /// Log the portfolio status on the first cycle and every N cycles after it.
    #[serde(default = "default_status_every_cycles")]
    pub status_every_cycles: u64,
    /// Send real orders; otherwise orders go to the paper executor.
    #[serde(default)]
    pub live_trading_enabled: bool,
}

fn default_buy_block_minutes() -> u64 {
    60
}

fn default_cycle_interval_secs() -> u64 {
    60
}

fn default_status_every_cycles() -> u64 {
    10
}

impl Default for LiveSettings {
    fn default() -> Self {
        let gate = BuyGateSettings::default();
        Self {
            position_value_usd: gate.position_value_usd,
            max_position_value_usd: gate.max_position_value_usd,
            buy_block_minutes: gate.buy_block_minutes,
            cycle_interval_secs: default_cycle_interval_secs(),
            status_every_cycles: default_status_every_cycles(),
            live_trading_enabled: false,
        }
    }
}

impl LiveSettings {
    pub fn gate(&self) -> BuyGateSettings {
        BuyGateSettings {
            position_value_usd: self.position_value_usd,
            max_position_value_usd: self.max_position_value_usd,
            buy_block_minutes: self.buy_block_minutes,
        }
    }
}

/// Fill model of the paper executor.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PaperSettings {
    /// The taker fee for the exchange (e.g., 0.0004 for 0.04%).
    pub taker_fee: f64,
    /// The simulated slippage for market orders (e.g., 0.0005 for 0.05%).
    pub slippage_percent: f64,
}

impl Default for PaperSettings {
    fn default() -> Self {
        Self {
            taker_fee: 0.0004,
            slippage_percent: 0.0005,
        }
    }
}

// --- Structs for live.toml Configuration ---

/// The assets traded by the live loop.
#[derive(Deserialize, Debug, Clone)]
pub struct LiveConfig {
    #[serde(rename = "pairs")]
    pub pair_configs: Vec<PairConfig>,
}

impl LiveConfig {
    pub fn enabled_symbols(&self) -> Vec<core_types::Symbol> {
        self.pair_configs
            .iter()
            .filter(|p| p.enabled)
            .map(|p| core_types::Symbol(p.symbol.clone()))
            .collect()
    }
}

/// Configuration for a single trading pair/asset.
#[derive(Deserialize, Debug, Clone)]
pub struct PairConfig {
    pub symbol: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Helper functions for serde defaults
fn default_enabled() -> bool {
    true
}
