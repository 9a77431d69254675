//! Environment variable names used by this crate for convenient
//! configuration of hooks from services.
//!
//! These are purely helpers; the hook types themselves never read the
//! environment.

use crate::config::{ConfigError, DeliveryMode, HookConfig, OverflowPolicy};
use std::str::FromStr;

/// Delivery queue capacity, e.g. `4096`.
pub const LOGAGENT_QUEUE_CAPACITY_ENV: &str = "LOGAGENT_QUEUE_CAPACITY";

/// Overflow policy of the delivery queue: `drop` or `block`.
pub const LOGAGENT_OVERFLOW_ENV: &str = "LOGAGENT_OVERFLOW";

/// Delivery mode: `async` or `sync`.
pub const LOGAGENT_MODE_ENV: &str = "LOGAGENT_MODE";

/// Whether to also print events to stdout: `true` or `false`.
pub const LOGAGENT_STDOUT_ENV: &str = "LOGAGENT_STDOUT";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl HookConfig {
    /// Build a configuration from `LOGAGENT_*` variables, using
    /// [`HookConfig::default`] for any that are unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = HookConfig::default();

        if let Some(value) = lookup(LOGAGENT_QUEUE_CAPACITY_ENV) {
            config.queue_capacity = parse_var(LOGAGENT_QUEUE_CAPACITY_ENV, value)?;
        }
        if let Some(value) = lookup(LOGAGENT_OVERFLOW_ENV) {
            config.overflow = parse_var::<OverflowPolicy>(LOGAGENT_OVERFLOW_ENV, value)?;
        }
        if let Some(value) = lookup(LOGAGENT_MODE_ENV) {
            config.mode = parse_var::<DeliveryMode>(LOGAGENT_MODE_ENV, value)?;
        }
        if let Some(value) = lookup(LOGAGENT_STDOUT_ENV) {
            config.enable_stdout = parse_var(LOGAGENT_STDOUT_ENV, value)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_unset_variables_use_defaults() {
        let config = HookConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, HookConfig::default());
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = HookConfig::from_lookup(lookup(&[
            (LOGAGENT_QUEUE_CAPACITY_ENV, "16"),
            (LOGAGENT_OVERFLOW_ENV, "block"),
            (LOGAGENT_MODE_ENV, "sync"),
            (LOGAGENT_STDOUT_ENV, "false"),
        ]))
        .unwrap();

        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.overflow, OverflowPolicy::Block);
        assert_eq!(config.mode, DeliveryMode::Sync);
        assert!(!config.enable_stdout);
    }

    #[test]
    fn test_bad_values_are_reported() {
        let err = HookConfig::from_lookup(lookup(&[(LOGAGENT_QUEUE_CAPACITY_ENV, "lots")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv { key: LOGAGENT_QUEUE_CAPACITY_ENV, .. }
        ));

        let err = HookConfig::from_lookup(lookup(&[(LOGAGENT_QUEUE_CAPACITY_ENV, "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCapacity(0)));
    }

    #[test]
    fn test_env_or_falls_back() {
        assert_eq!(env_or("LOGAGENT_SURELY_UNSET_VARIABLE", "fallback"), "fallback");
    }
}
