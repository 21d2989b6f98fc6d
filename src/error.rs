// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookoutError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Icinga request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Icinga API returned {status}: {message}")]
    IcingaError { status: u16, message: String },

    #[error("Invalid alert: {0}")]
    ValidationError(String),

    #[error("Invalid host name: {0}")]
    InvalidHostName(String),

    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LookoutError {
    /// Validation failures are reported once and never retried.
    pub fn is_validation(&self) -> bool {
        matches!(self, LookoutError::ValidationError(_))
    }

    /// True when the Icinga API answered 404 for the requested object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookoutError::IcingaError { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, LookoutError>;
