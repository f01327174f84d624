//! Runtime configuration.
//!
//! Resolution order, lowest to highest precedence: compiled defaults, the
//! optional TOML settings file, then `CASEPILOT_*` environment variables
//! (including those loaded from `.env`).

mod gateway;
pub(crate) mod helpers;
mod store;

pub use gateway::GatewayConfig;
pub use store::StoreConfig;

use crate::error::ConfigError;
use crate::settings::Settings;

#[derive(Debug, Clone)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub store: StoreConfig,
}

impl Config {
    pub fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            gateway: GatewayConfig::resolve(settings)?,
            store: StoreConfig::resolve(settings)?,
        })
    }
}
