use std::collections::HashMap;
use std::env;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not valid: {1}")]
    InvalidValue(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub base_asset: String,
    pub quote_asset: String,
    pub price_precision: u32,
    pub size_precision: u32,
    pub maker_fee_bps: u32,
    pub taker_fee_bps: u32,
    pub min_order_size: Decimal,
    pub max_order_size: Decimal,
    pub price_tick: Decimal,
    pub size_tick: Decimal,
}

/// Recognized configuration surface (§6). Loaded the way the teacher's
/// `main.rs` loads env vars: `dotenvy::dotenv()` once at startup, then
/// `std::env` with defaults for anything unset. There is no config file
/// format here because the teacher does not use one either.
#[derive(Debug, Clone)]
pub struct Config {
    pub markets: HashMap<String, MarketConfig>,
    pub deposit_confirmation_threshold: HashMap<String, u32>,
    pub withdrawal_network_fee: HashMap<String, Decimal>,
}

impl Config {
    /// Loads `.env` (if present) then falls back to a single ALT/USDT
    /// market with conservative defaults — enough for the exchange
    /// binary's smoke run without requiring an external config file.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut markets = HashMap::new();
        markets.insert(
            "ALT/USDT".to_string(),
            MarketConfig {
                base_asset: "ALT".to_string(),
                quote_asset: "USDT".to_string(),
                price_precision: 2,
                size_precision: 8,
                maker_fee_bps: env_u32("FEE_MAKER_BPS", 10)?,
                taker_fee_bps: env_u32("FEE_TAKER_BPS", 20)?,
                min_order_size: Decimal::new(1, 2),
                max_order_size: Decimal::from(1_000_000),
                price_tick: Decimal::new(1, 2),
                size_tick: Decimal::new(1, 8),
            },
        );

        let mut deposit_confirmation_threshold = HashMap::new();
        deposit_confirmation_threshold.insert("USDT".to_string(), env_u32("DEPOSIT_CONFIRMATIONS_USDT", 12)?);
        deposit_confirmation_threshold.insert("ALT".to_string(), env_u32("DEPOSIT_CONFIRMATIONS_ALT", 20)?);

        let mut withdrawal_network_fee = HashMap::new();
        withdrawal_network_fee.insert("USDT".to_string(), Decimal::new(1, 0));
        withdrawal_network_fee.insert("ALT".to_string(), Decimal::new(1, 1));

        Ok(Self { markets, deposit_confirmation_threshold, withdrawal_network_fee })
    }

    pub fn market(&self, symbol: &str) -> Option<&MarketConfig> {
        self.markets.get(symbol)
    }
}

fn env_u32(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue(key, raw)),
        Err(_) => Ok(default),
    }
}
