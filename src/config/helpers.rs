use std::str::FromStr;

use crate::error::ConfigError;

/// Read an environment variable, treating unset and blank values as absent.
pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

pub(crate) fn parse_bool_value(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

pub(crate) fn parse_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    match optional_env(key)? {
        Some(raw) => parse_bool_value(key, &raw),
        None => Ok(default),
    }
}

pub(crate) fn parse_string_env(key: &str, default: String) -> Result<String, ConfigError> {
    Ok(optional_env(key)?
        .map(|value| value.trim().to_string())
        .unwrap_or(default))
}

pub(crate) fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key)? {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_values_accept_common_spellings() {
        for raw in ["1", "true", "YES", " on "] {
            assert!(parse_bool_value("K", raw).expect("truthy"));
        }
        for raw in ["0", "False", "no", "off"] {
            assert!(!parse_bool_value("K", raw).expect("falsy"));
        }
    }

    #[test]
    fn bool_values_reject_garbage() {
        let err = parse_bool_value("CASEPILOT_SEED", "maybe").expect_err("must reject");
        let ConfigError::InvalidValue { key, message } = err else {
            panic!("expected InvalidValue");
        };
        assert_eq!(key, "CASEPILOT_SEED");
        assert!(message.contains("maybe"), "unexpected message: {message}");
    }

    #[test]
    fn unset_env_falls_back_to_default() {
        let key = "CASEPILOT_TEST_SURELY_UNSET_VARIABLE";
        assert_eq!(parse_env::<u64>(key, 42).expect("default"), 42);
        assert!(parse_bool_env(key, true).expect("default"));
        assert_eq!(
            parse_string_env(key, "fallback".to_string()).expect("default"),
            "fallback"
        );
    }
}
