// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Icinga API connection settings.

use crate::error::{LookoutError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IcingaConfig {
    /// Base URL of the Icinga API, e.g. https://icinga.monitoring.svc:5665
    pub endpoint: Url,
    pub username: String,
    pub password: String,
    /// PEM bundle the API certificate must chain to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert_file: Option<PathBuf>,
    #[serde(default)]
    pub insecure_skip_verify: bool,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl IcingaConfig {
    /// Read the config file, falling back to `ICINGA_*` environment variables when it is absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading Icinga configuration from {}", path.display());
            let content = std::fs::read_to_string(path)?;
            return Self::from_yaml(&content);
        }
        debug!("{} not found, reading Icinga configuration from environment", path.display());
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| LookoutError::ConfigError(format!("{} is not set", key)))
        };

        let endpoint = required("ICINGA_ENDPOINT")?;
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| LookoutError::ConfigError(format!("invalid ICINGA_ENDPOINT {}: {}", endpoint, e)))?;

        let timeout_secs = match lookup("ICINGA_TIMEOUT_SECS") {
            Some(v) => v
                .parse()
                .map_err(|_| LookoutError::ConfigError(format!("invalid ICINGA_TIMEOUT_SECS {}", v)))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(IcingaConfig {
            endpoint,
            username: required("ICINGA_USERNAME")?,
            password: required("ICINGA_PASSWORD")?,
            ca_cert_file: lookup("ICINGA_CA_CERT_FILE").map(PathBuf::from),
            insecure_skip_verify: lookup("ICINGA_INSECURE_SKIP_VERIFY").is_some_and(|v| v == "true"),
            timeout_secs,
        })
    }

    /// Copy safe to print
    pub fn redacted(&self) -> Self {
        IcingaConfig {
            password: "********".to_string(),
            ..self.clone()
        }
    }
}
