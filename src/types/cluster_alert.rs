// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::Result;
use crate::types::alert::{Alert, AlertKind, AlertSettings, AlertStatus, Selection};
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Runs a cluster wide check against the synthetic cluster host of its namespace
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "monitoring.geeko.me", version = "v1alpha1", kind = "ClusterAlert")]
#[kube(namespaced, shortname = "ca")]
#[kube(status = "AlertStatus")]
#[kube(printcolumn = r#"{"name":"Check", "type":"string", "jsonPath":".spec.check"}"#)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAlertSpec {
    #[serde(flatten)]
    pub alert: AlertSettings,
}

impl Alert for ClusterAlert {
    const KIND: AlertKind = AlertKind::ClusterAlert;

    fn settings(&self) -> &AlertSettings {
        &self.spec.alert
    }

    fn selection(&self) -> Result<Selection> {
        Ok(Selection::Cluster)
    }

    fn status(&self) -> Option<&AlertStatus> {
        self.status.as_ref()
    }
}
