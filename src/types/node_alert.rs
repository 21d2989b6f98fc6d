// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::Result;
use crate::types::alert::{name_or_selector, Alert, AlertKind, AlertSettings, AlertStatus, Selection};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Runs a check against matching nodes. Without a name or selector every node is targeted.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "monitoring.geeko.me", version = "v1alpha1", kind = "NodeAlert")]
#[kube(namespaced, shortname = "noa")]
#[kube(status = "AlertStatus")]
#[kube(printcolumn = r#"{"name":"Check", "type":"string", "jsonPath":".spec.check"}"#)]
#[serde(rename_all = "camelCase")]
pub struct NodeAlertSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
    #[serde(flatten)]
    pub alert: AlertSettings,
}

impl Alert for NodeAlert {
    const KIND: AlertKind = AlertKind::NodeAlert;

    fn settings(&self) -> &AlertSettings {
        &self.spec.alert
    }

    fn selection(&self) -> Result<Selection> {
        name_or_selector(
            Self::KIND,
            self.spec.node_name.as_ref(),
            self.spec.selector.as_ref(),
            true,
        )
    }

    fn status(&self) -> Option<&AlertStatus> {
        self.status.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn make_spec(node_name: Option<&str>, selector: Option<LabelSelector>) -> NodeAlert {
        NodeAlert::new(
            "disk",
            NodeAlertSpec {
                node_name: node_name.map(str::to_string),
                selector,
                alert: AlertSettings {
                    check: "node-volume".to_string(),
                    ..Default::default()
                },
            },
        )
    }

    #[test]
    fn test_neither_name_nor_selector_targets_all_nodes() {
        assert_eq!(make_spec(None, None).selection().unwrap(), Selection::All);
    }

    #[test]
    fn test_empty_name_is_ignored() {
        assert_eq!(make_spec(Some(""), None).selection().unwrap(), Selection::All);
    }

    #[test]
    fn test_both_is_rejected() {
        let selector = LabelSelector {
            match_labels: Some(BTreeMap::from([("role".to_string(), "storage".to_string())])),
            ..Default::default()
        };
        assert!(make_spec(Some("node-1"), Some(selector)).selection().is_err());
    }
}
