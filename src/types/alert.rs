// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Settings shared by the three alert kinds and the trait that lets reconcilers treat
//! them uniformly.

use crate::error::{LookoutError, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::NamespaceResourceScope;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// The scope an alert targets. Doubles as the host kind in Icinga host names.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, schemars::JsonSchema)]
pub enum AlertKind {
    ClusterAlert,
    NodeAlert,
    PodAlert,
}

impl AlertKind {
    pub const ALL: [AlertKind; 3] = [AlertKind::ClusterAlert, AlertKind::NodeAlert, AlertKind::PodAlert];

    /// Host kind segment used in Icinga host names
    pub fn host_kind(&self) -> &'static str {
        match self {
            AlertKind::ClusterAlert => "cluster",
            AlertKind::NodeAlert => "node",
            AlertKind::PodAlert => "pod",
        }
    }

    pub fn from_host_kind(kind: &str) -> Option<AlertKind> {
        match kind {
            "cluster" => Some(AlertKind::ClusterAlert),
            "node" => Some(AlertKind::NodeAlert),
            "pod" => Some(AlertKind::PodAlert),
            _ => None,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertKind::ClusterAlert => "ClusterAlert",
            AlertKind::NodeAlert => "NodeAlert",
            AlertKind::PodAlert => "PodAlert",
        };
        f.write_str(s)
    }
}

/// Who gets notified when the check enters a given state
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Receiver {
    /// Check state that triggers the notification, e.g. Critical
    pub state: String,
    /// Destinations understood by the notifier (addresses, channels, ...)
    #[serde(default)]
    pub to: Vec<String>,
    /// Notifier channel, e.g. Mailgun or Slack
    pub notifier: String,
}

/// Fields every alert kind carries
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertSettings {
    /// Name of the check command to run
    pub check: String,
    /// How often Icinga runs the check, e.g. 30s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_interval: Option<String>,
    /// How often Icinga re-sends notifications while the problem persists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_interval: Option<String>,
    /// Check command parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub receivers: Vec<Receiver>,
    /// Secret in the alert namespace holding notifier credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifier_secret_name: Option<String>,
    #[serde(default)]
    pub paused: bool,
}

impl AlertSettings {
    pub fn check_interval(&self) -> Result<Duration> {
        parse_interval("checkInterval", self.check_interval.as_deref())
    }

    pub fn alert_interval(&self) -> Result<Duration> {
        parse_interval("alertInterval", self.alert_interval.as_deref())
    }
}

fn parse_interval(field: &str, value: Option<&str>) -> Result<Duration> {
    match value.map(str::trim) {
        None | Some("") => Ok(Duration::ZERO),
        Some(v) => humantime::parse_duration(v).map_err(|e| {
            LookoutError::ValidationError(format!("{} '{}' is not a valid duration: {}", field, v, e))
        }),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// How an alert picks its targets
#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    /// The synthetic cluster target
    Cluster,
    /// Exactly one named object
    Name(String),
    /// Every object matching the selector
    Selector(LabelSelector),
    /// Every object of the kind
    All,
}

/// Common view over ClusterAlert, NodeAlert and PodAlert
pub trait Alert:
    Resource<DynamicType = (), Scope = NamespaceResourceScope> + Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: AlertKind;

    fn settings(&self) -> &AlertSettings;

    /// Target selection, failing when the name and selector modes are combined or missing
    fn selection(&self) -> Result<Selection>;

    fn status(&self) -> Option<&AlertStatus>;

    /// Work queue key, `namespace/name`
    fn key(&self) -> String {
        alert_key(&self.namespace().unwrap_or_default(), &self.name_any())
    }

    fn is_terminating(&self) -> bool {
        self.meta().deletion_timestamp.is_some()
    }

    fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers().iter().any(|f| f == finalizer)
    }
}

pub fn alert_key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

/// Split a `namespace/name` key
pub fn split_key(key: &str) -> Result<(&str, &str)> {
    match key.split_once('/') {
        Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => Ok((ns, name)),
        _ => Err(LookoutError::InvalidAnnotation(format!("malformed alert key '{}'", key))),
    }
}

/// Shared name XOR selector rule for Node and Pod alerts
pub(crate) fn name_or_selector(
    kind: AlertKind,
    name: Option<&String>,
    selector: Option<&LabelSelector>,
    allow_all: bool,
) -> Result<Selection> {
    let name = name.filter(|n| !n.is_empty());
    match (name, selector) {
        (Some(_), Some(_)) => Err(LookoutError::ValidationError(format!(
            "{} cannot set both an object name and a selector",
            kind
        ))),
        (Some(name), None) => Ok(Selection::Name(name.clone())),
        (None, Some(selector)) => Ok(Selection::Selector(selector.clone())),
        (None, None) if allow_all => Ok(Selection::All),
        (None, None) => Err(LookoutError::ValidationError(format!(
            "{} requires either an object name or a selector",
            kind
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_kind_round_trip() {
        for kind in AlertKind::ALL {
            assert_eq!(AlertKind::from_host_kind(kind.host_kind()), Some(kind));
        }
        assert_eq!(AlertKind::from_host_kind("service"), None);
    }

    #[test]
    fn test_intervals_default_to_zero() {
        let settings = AlertSettings::default();
        assert_eq!(settings.check_interval().unwrap(), Duration::ZERO);
        assert_eq!(settings.alert_interval().unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_intervals_are_parsed() {
        let settings = AlertSettings {
            check_interval: Some("30s".to_string()),
            alert_interval: Some("5m".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.check_interval().unwrap(), Duration::from_secs(30));
        assert_eq!(settings.alert_interval().unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn test_invalid_interval_is_a_validation_error() {
        let settings = AlertSettings {
            check_interval: Some("often".to_string()),
            ..Default::default()
        };
        assert!(settings.check_interval().unwrap_err().is_validation());
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("default/web").unwrap(), ("default", "web"));
        assert!(split_key("web").is_err());
        assert!(split_key("/web").is_err());
        assert!(split_key("a/b/c").is_err());
    }
}
