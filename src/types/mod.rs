// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resources served by the operator.

pub mod alert;
pub mod cluster_alert;
pub mod incident;
pub mod node_alert;
pub mod plugin;
pub mod pod_alert;

pub use alert::{Alert, AlertKind, AlertSettings, AlertStatus, Receiver, Selection};
pub use cluster_alert::{ClusterAlert, ClusterAlertSpec};
pub use incident::{Incident, IncidentNotificationType, IncidentSpec, IncidentStatus};
pub use node_alert::{NodeAlert, NodeAlertSpec};
pub use plugin::{CheckPlugin, CheckPluginSpec};
pub use pod_alert::{PodAlert, PodAlertSpec};
