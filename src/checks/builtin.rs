// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Check commands that ship with the Lookout Icinga image.

use crate::checks::registry::CheckCommand;
use crate::types::AlertKind::{self, ClusterAlert, NodeAlert, PodAlert};

const CRITICAL_UNKNOWN: &[&str] = &["Critical", "Unknown"];
const ALL_STATES: &[&str] = &["Critical", "Warning", "Unknown"];

pub fn commands() -> Vec<CheckCommand> {
    let cluster: &[AlertKind] = &[ClusterAlert];
    let node: &[AlertKind] = &[NodeAlert];
    let pod: &[AlertKind] = &[PodAlert];
    let node_and_pod: &[AlertKind] = &[NodeAlert, PodAlert];

    vec![
        CheckCommand::builtin("any-http", cluster, &["url", "method", "body", "timeout"], CRITICAL_UNKNOWN),
        CheckCommand::builtin("ca-cert", cluster, &["warning", "critical"], ALL_STATES),
        CheckCommand::builtin("component-status", cluster, &["selector", "componentName"], CRITICAL_UNKNOWN),
        CheckCommand::builtin(
            "json-path",
            cluster,
            &["url", "secretName", "warning", "critical"],
            ALL_STATES,
        ),
        CheckCommand::builtin("node-exists", cluster, &["selector", "nodeName", "count"], CRITICAL_UNKNOWN),
        CheckCommand::builtin("pod-exists", cluster, &["selector", "podName", "count"], CRITICAL_UNKNOWN),
        CheckCommand::builtin("event", cluster, &["clockSkew"], &["Warning", "Unknown"]),
        CheckCommand::builtin(
            "cert",
            cluster,
            &["selector", "secretName", "secretKey", "warning", "critical"],
            ALL_STATES,
        ),
        CheckCommand::builtin("node-status", node, &[], CRITICAL_UNKNOWN),
        CheckCommand::builtin(
            "node-volume",
            node,
            &["mountPoint", "secretName", "warning", "critical"],
            ALL_STATES,
        ),
        CheckCommand::builtin("pod-status", pod, &[], CRITICAL_UNKNOWN),
        CheckCommand::builtin(
            "pod-volume",
            pod,
            &["volumeName", "secretName", "warning", "critical"],
            ALL_STATES,
        ),
        CheckCommand::builtin("pod-exec", pod, &["container", "cmd", "argv"], CRITICAL_UNKNOWN),
        CheckCommand::builtin(
            "influx-query",
            node_and_pod,
            &["influxHost", "secretName", "A", "B", "C", "D", "E", "R", "warning", "critical"],
            ALL_STATES,
        ),
    ]
}
