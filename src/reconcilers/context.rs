// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Shared state handed to every reconciler.

use crate::checks::CheckCommandRegistry;
use crate::config::Config;
use crate::icinga::IcingaApi;
use crate::kubernetes::EventPublisher;
use crate::sync::{RetryPolicy, WorkQueue};
use crate::targets::TargetResolver;
use crate::types::{Alert, AlertKind, CheckPlugin, ClusterAlert, NodeAlert, PodAlert};
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::runtime::reflector::Store;
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One queue per watched type
#[derive(Clone)]
pub struct Queues {
    pub cluster_alerts: WorkQueue,
    pub node_alerts: WorkQueue,
    pub pod_alerts: WorkQueue,
    pub pods: WorkQueue,
    pub nodes: WorkQueue,
    pub namespaces: WorkQueue,
    pub plugins: WorkQueue,
}

impl Queues {
    pub fn new(config: &Config) -> Self {
        let policy = RetryPolicy {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay,
            max_delay: config.retry_max_delay,
        };
        Queues {
            cluster_alerts: WorkQueue::new("clusteralerts", policy.clone()),
            node_alerts: WorkQueue::new("nodealerts", policy.clone()),
            pod_alerts: WorkQueue::new("podalerts", policy.clone()),
            pods: WorkQueue::new("pods", policy.clone()),
            nodes: WorkQueue::new("nodes", policy.clone()),
            namespaces: WorkQueue::new("namespaces", policy.clone()),
            plugins: WorkQueue::new("checkplugins", policy),
        }
    }

    pub fn alerts(&self, kind: AlertKind) -> &WorkQueue {
        match kind {
            AlertKind::ClusterAlert => &self.cluster_alerts,
            AlertKind::NodeAlert => &self.node_alerts,
            AlertKind::PodAlert => &self.pod_alerts,
        }
    }
}

/// Informer caches of the alert kinds
#[derive(Clone)]
pub struct AlertStores {
    pub cluster: Store<ClusterAlert>,
    pub node: Store<NodeAlert>,
    pub pod: Store<PodAlert>,
}

/// Last known state of deleted objects, consumed by the reconcile that tears them down
pub struct Tombstones<K> {
    objects: Mutex<HashMap<String, Arc<K>>>,
}

impl<K> Tombstones<K> {
    pub fn new() -> Self {
        Tombstones {
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, key: String, obj: Arc<K>) {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, obj);
    }

    pub fn take(&self, key: &str) -> Option<Arc<K>> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key)
    }
}

impl<K> Default for Tombstones<K> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Context {
    pub client: Client,
    pub icinga: Arc<dyn IcingaApi>,
    pub registry: Arc<CheckCommandRegistry>,
    pub resolver: TargetResolver,
    pub alerts: AlertStores,
    pub plugins: Store<CheckPlugin>,
    pub events: Arc<dyn EventPublisher>,
    pub queues: Queues,
    pub pod_tombstones: Tombstones<Pod>,
    pub node_tombstones: Tombstones<Node>,
    /// Icinga user every notification is addressed to
    pub notifier_user: String,
}

/// Alert kinds whose cache lives in the [`Context`]
pub trait CachedAlert: Alert {
    fn store(ctx: &Context) -> &Store<Self>;
}

impl CachedAlert for ClusterAlert {
    fn store(ctx: &Context) -> &Store<Self> {
        &ctx.alerts.cluster
    }
}

impl CachedAlert for NodeAlert {
    fn store(ctx: &Context) -> &Store<Self> {
        &ctx.alerts.node
    }
}

impl CachedAlert for PodAlert {
    fn store(ctx: &Context) -> &Store<Self> {
        &ctx.alerts.pod
    }
}
