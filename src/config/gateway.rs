use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::config::helpers::{parse_bool_env, parse_env, parse_string_env};
use crate::error::ConfigError;
use crate::settings::Settings;

/// HTTP gateway settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Delay injected before every API handler runs. Always nonzero so
    /// clients can exercise their loading states.
    pub latency: Duration,
    pub enforce_roles: bool,
}

impl GatewayConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn validate_host(raw: &str) -> Result<IpAddr, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("localhost") {
        return Ok(IpAddr::from([127, 0, 0, 1]));
    }
    trimmed.parse().map_err(|_| ConfigError::InvalidValue {
        key: "CASEPILOT_HOST".to_string(),
        message: format!("'{trimmed}' is not an IP address"),
    })
}

fn validate_latency(ms: u64) -> Result<Duration, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::InvalidValue {
            key: "CASEPILOT_LATENCY_MS".to_string(),
            message: "simulated latency must be at least 1 ms".to_string(),
        });
    }
    Ok(Duration::from_millis(ms))
}

impl GatewayConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let host = validate_host(&parse_string_env(
            "CASEPILOT_HOST",
            settings.gateway.host.clone(),
        )?)?;
        let latency = validate_latency(parse_env(
            "CASEPILOT_LATENCY_MS",
            settings.gateway.latency_ms,
        )?)?;

        Ok(Self {
            host,
            port: parse_env("CASEPILOT_PORT", settings.gateway.port)?,
            latency,
            enforce_roles: parse_bool_env(
                "CASEPILOT_ENFORCE_ROLES",
                settings.gateway.enforce_roles,
            )?,
        })
    }
}
