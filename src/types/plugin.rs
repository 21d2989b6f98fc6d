// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::types::alert::AlertKind;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// A check command provided by a plugin executable installed next to Icinga.
/// The object name is the check command name alerts refer to.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[kube(group = "monitoring.geeko.me", version = "v1alpha1", kind = "CheckPlugin")]
#[kube(shortname = "cp")]
#[serde(rename_all = "camelCase")]
pub struct CheckPluginSpec {
    /// Executable Icinga runs for the check
    pub command: String,
    /// Alert kinds that may use this check
    pub alert_kinds: Vec<AlertKind>,
    /// Variables the check accepts, passed as `--<name>` arguments
    #[serde(default)]
    pub vars: Vec<String>,
    /// States the check can report
    #[serde(default)]
    pub states: Vec<String>,
}
