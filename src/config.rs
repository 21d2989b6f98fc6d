// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of workers draining each work queue
    pub workers: usize,
    /// Attempts per dequeue cycle before a failing key is dropped
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Age after which recovered incidents are deleted, zero disables the collector
    pub incident_ttl: Duration,
    /// Icinga user that receives every Lookout notification
    pub notifier_user: String,
    /// Location of the Icinga connection config file
    pub icinga_config_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            workers: 2,
            max_retries: 5,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(300),
            incident_ttl: Duration::from_secs(90 * 24 * 3600),
            notifier_user: "lookout".to_string(),
            icinga_config_file: PathBuf::from("/srv/lookout/icinga.yaml"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let workers = match lookup("LOOKOUT_WORKERS") {
            Some(v) => v.parse().context("LOOKOUT_WORKERS must be a positive integer")?,
            None => defaults.workers,
        };
        if workers == 0 {
            anyhow::bail!("LOOKOUT_WORKERS must be at least 1");
        }

        let max_retries = match lookup("LOOKOUT_MAX_RETRIES") {
            Some(v) => v.parse().context("LOOKOUT_MAX_RETRIES must be an integer")?,
            None => defaults.max_retries,
        };

        let duration = |key: &str, default: Duration| -> Result<Duration> {
            match lookup(key) {
                Some(v) => humantime::parse_duration(&v)
                    .with_context(|| format!("{} is not a valid duration: {}", key, v)),
                None => Ok(default),
            }
        };

        Ok(Config {
            workers,
            max_retries,
            retry_base_delay: duration("LOOKOUT_RETRY_BASE_DELAY", defaults.retry_base_delay)?,
            retry_max_delay: duration("LOOKOUT_RETRY_MAX_DELAY", defaults.retry_max_delay)?,
            incident_ttl: duration("LOOKOUT_INCIDENT_TTL", defaults.incident_ttl)?,
            notifier_user: lookup("LOOKOUT_NOTIFIER_USER").unwrap_or(defaults.notifier_user),
            icinga_config_file: lookup("ICINGA_CONFIG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.icinga_config_file),
        })
    }
}
