// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::Result;
use crate::types::alert::{name_or_selector, Alert, AlertKind, AlertSettings, AlertStatus, Selection};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Runs a check against every matching pod in the alert's namespace
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "monitoring.geeko.me", version = "v1alpha1", kind = "PodAlert")]
#[kube(namespaced, shortname = "pa")]
#[kube(status = "AlertStatus")]
#[kube(printcolumn = r#"{"name":"Check", "type":"string", "jsonPath":".spec.check"}"#)]
#[serde(rename_all = "camelCase")]
pub struct PodAlertSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
    #[serde(flatten)]
    pub alert: AlertSettings,
}

impl Alert for PodAlert {
    const KIND: AlertKind = AlertKind::PodAlert;

    fn settings(&self) -> &AlertSettings {
        &self.spec.alert
    }

    fn selection(&self) -> Result<Selection> {
        name_or_selector(
            Self::KIND,
            self.spec.pod_name.as_ref(),
            self.spec.selector.as_ref(),
            false,
        )
    }

    fn status(&self) -> Option<&AlertStatus> {
        self.status.as_ref()
    }
}
