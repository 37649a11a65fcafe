//! Runtime configuration from environment variables.
//!
//! | Variable                  | Default      |
//! |---------------------------|--------------|
//! | `STAFFLOAD_PORT`          | `3000`       |
//! | `STAFFLOAD_DATA_DIR`      | `.staffload` |
//! | `STAFFLOAD_BATCH_SIZE`    | `100`        |
//! | `STAFFLOAD_TENANT`        | unset        |
//! | `STAFFLOAD_ALLOW_PARTIAL` | `true`       |
//!
//! A `.env` file in the working directory is loaded first (see `main.rs`).
//! Unparseable values fall back to the default with a warning.

use std::path::PathBuf;
use uuid::Uuid;

use crate::api::logs::log_warning;
use crate::batch::DEFAULT_BATCH_SIZE;
use crate::store::DEFAULT_DATA_DIR;
use crate::validation::primitives::parse_bool;

pub const DEFAULT_PORT: u16 = 3000;

pub const ENV_PORT: &str = "STAFFLOAD_PORT";
pub const ENV_DATA_DIR: &str = "STAFFLOAD_DATA_DIR";
pub const ENV_BATCH_SIZE: &str = "STAFFLOAD_BATCH_SIZE";
pub const ENV_TENANT: &str = "STAFFLOAD_TENANT";
pub const ENV_ALLOW_PARTIAL: &str = "STAFFLOAD_ALLOW_PARTIAL";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub batch_size: usize,
    /// Tenant used when a request does not name one.
    pub default_tenant: Option<Uuid>,
    pub allow_partial: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            batch_size: DEFAULT_BATCH_SIZE,
            default_tenant: None,
            allow_partial: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            port: parse_or(get(ENV_PORT), ENV_PORT, defaults.port, |v| v.parse().ok()),
            data_dir: get(ENV_DATA_DIR).map(PathBuf::from).unwrap_or(defaults.data_dir),
            batch_size: parse_or(get(ENV_BATCH_SIZE), ENV_BATCH_SIZE, defaults.batch_size, |v| {
                v.parse::<usize>().ok().filter(|n| *n > 0)
            }),
            default_tenant: get(ENV_TENANT).and_then(|v| match Uuid::parse_str(&v) {
                Ok(id) => Some(id),
                Err(_) => {
                    log_warning(format!("{} is not a UUID ('{}'), ignoring", ENV_TENANT, v));
                    None
                }
            }),
            allow_partial: parse_or(
                get(ENV_ALLOW_PARTIAL),
                ENV_ALLOW_PARTIAL,
                defaults.allow_partial,
                parse_bool,
            ),
        }
    }
}

fn parse_or<T, P>(raw: Option<String>, key: &str, default: T, parse: P) -> T
where
    T: std::fmt::Display,
    P: Fn(&str) -> Option<T>,
{
    match raw {
        None => default,
        Some(v) => parse(&v).unwrap_or_else(|| {
            log_warning(format!("Invalid {} '{}', using {}", key, v, default));
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), AppConfig::default());
        assert_eq!(AppConfig::default().batch_size, 100);
        assert!(AppConfig::default().allow_partial);
    }

    #[test]
    fn test_overrides() {
        let tenant = Uuid::new_v4().to_string();
        let cfg = config(&[
            (ENV_PORT, "8080"),
            (ENV_DATA_DIR, "/var/lib/staffload"),
            (ENV_BATCH_SIZE, "25"),
            (ENV_TENANT, &tenant),
            (ENV_ALLOW_PARTIAL, "no"),
        ]);

        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/staffload"));
        assert_eq!(cfg.batch_size, 25);
        assert_eq!(cfg.default_tenant.map(|t| t.to_string()), Some(tenant));
        assert!(!cfg.allow_partial);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let cfg = config(&[
            (ENV_PORT, "eighty"),
            (ENV_BATCH_SIZE, "0"),
            (ENV_TENANT, "acme"),
            (ENV_ALLOW_PARTIAL, "sometimes"),
        ]);

        assert_eq!(cfg, AppConfig::default());
    }
}
