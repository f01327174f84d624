use crate::config::helpers::{parse_bool_env, parse_env};
use crate::db::query::PageLimits;
use crate::error::ConfigError;
use crate::settings::Settings;

/// In-memory store settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub seed: bool,
    pub page_limits: PageLimits,
}

fn validate_page_limits(default: usize, max: usize) -> Result<PageLimits, ConfigError> {
    if default == 0 {
        return Err(ConfigError::InvalidValue {
            key: "CASEPILOT_PAGE_LIMIT_DEFAULT".to_string(),
            message: "default page limit must be at least 1".to_string(),
        });
    }
    if max < default {
        return Err(ConfigError::InvalidValue {
            key: "CASEPILOT_PAGE_LIMIT_MAX".to_string(),
            message: format!("maximum page limit {max} is below the default {default}"),
        });
    }
    Ok(PageLimits { default, max })
}

impl StoreConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let default = parse_env(
            "CASEPILOT_PAGE_LIMIT_DEFAULT",
            settings.store.page_limit_default,
        )?;
        let max = parse_env("CASEPILOT_PAGE_LIMIT_MAX", settings.store.page_limit_max)?;

        Ok(Self {
            seed: parse_bool_env("CASEPILOT_SEED", settings.store.seed)?,
            page_limits: validate_page_limits(default, max)?,
        })
    }
}
