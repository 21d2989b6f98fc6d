// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes annotation keys used by Lookout
pub mod annotations {
    /// Set on Pods, lists the PodAlerts that provisioned monitoring for the pod
    pub const POD_ALERTS: &str = "lookout.geeko.me/podalerts";
    /// Set on Nodes, lists the NodeAlerts that provisioned monitoring for the node
    pub const NODE_ALERTS: &str = "lookout.geeko.me/nodealerts";
    /// Set on Namespaces, lists the ClusterAlerts that provisioned the namespace's cluster host
    pub const CLUSTER_ALERTS: &str = "lookout.geeko.me/clusteralerts";
}

/// Finalizer that blocks alert removal until Icinga objects are gone
pub const ALERT_FINALIZER: &str = "monitoring.geeko.me/lookout";

/// The operator name used for server-side apply and as event reporter
pub const OPERATOR_NAME: &str = "lookout";

/// CRD and Icinga polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRDs
    pub const POLL_INTERVAL_SECS: u64 = 2;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 30;
}

pub mod icinga {
    /// Initial polling interval in seconds when waiting for the Icinga API
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
    /// Host template every Lookout host inherits from
    pub const HOST_TEMPLATE: &str = "generic-host";
    /// Notification template carrying the notification command
    pub const NOTIFICATION_TEMPLATE: &str = "lookout-notification";
    /// Check command template for plugin provided checks
    pub const PLUGIN_TEMPLATE: &str = "plugin-check-command";
    /// Address of the synthetic cluster host
    pub const CLUSTER_HOST_ADDRESS: &str = "127.0.0.1";
}

/// Kubernetes event reasons
pub mod reasons {
    pub const VALIDATION_FAILED: &str = "ValidationFailed";
    pub const SYNC_FAILED: &str = "SyncFailed";
    pub const SYNCED: &str = "Synced";
    pub const DELETE_FAILED: &str = "DeleteFailed";
    pub const PLUGIN_REJECTED: &str = "PluginRejected";
}
