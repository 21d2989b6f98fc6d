// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::types::alert::AlertKind;
use chrono::{DateTime, Utc};
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A run of notifications for one alert on one object, written by the notifier
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[kube(group = "monitoring.geeko.me", version = "v1alpha1", kind = "Incident")]
#[kube(namespaced)]
#[kube(status = "IncidentStatus")]
#[serde(rename_all = "camelCase")]
pub struct IncidentSpec {
    pub alert_kind: AlertKind,
    pub alert_name: String,
    /// Object the alert fired for, empty for cluster alerts
    #[serde(default)]
    pub object_name: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub enum IncidentNotificationType {
    Problem,
    Acknowledgement,
    Recovery,
    Custom,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncidentNotification {
    #[serde(rename = "type")]
    pub notification_type: IncidentNotificationType,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncidentStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_notification_type: Option<IncidentNotificationType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<IncidentNotification>,
}

impl Incident {
    pub fn is_recovered(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.last_notification_type)
            .is_some_and(|t| t == IncidentNotificationType::Recovery)
    }

    /// Recovered and created more than `ttl` before `now`
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        if !self.is_recovered() {
            return false;
        }
        let Some(created) = self.creation_timestamp() else {
            return false;
        };
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return false;
        };
        created.0 + ttl < now
    }
}
