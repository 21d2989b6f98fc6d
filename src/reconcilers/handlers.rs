// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Watch event handlers deciding which changes are worth a reconcile.

use crate::constants::reasons;
use crate::kubernetes::EventPublisher;
use crate::reconcilers::context::Context;
use crate::reconcilers::validation::check_object;
use crate::sync::{EventHandler, WorkQueue};
use crate::targets::resolver::{node_address, pod_ip};
use crate::types::{Alert, CheckPlugin};
use k8s_openapi::api::core::v1::{Namespace, Node, Pod};
use kube::{Resource, ResourceExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Alerts are re-processed when their spec changes or deletion starts. New alerts that fail
/// the object-local checks are reported right away and never queued.
pub struct AlertHandler {
    queue: WorkQueue,
    events: Arc<dyn EventPublisher>,
}

impl AlertHandler {
    pub fn new(queue: WorkQueue, events: Arc<dyn EventPublisher>) -> Self {
        Self { queue, events }
    }
}

fn spec_of<K: serde::Serialize>(obj: &K) -> Option<serde_json::Value> {
    serde_json::to_value(obj)
        .ok()
        .and_then(|mut v| v.get_mut("spec").map(serde_json::Value::take))
}

impl<A: Alert> EventHandler<A> for AlertHandler {
    fn on_add(&self, obj: &A) {
        if !obj.is_terminating() {
            if let Err(e) = check_object(obj) {
                warn!("Alert {} is invalid: {}", obj.key(), e);
                let events = self.events.clone();
                let oref = obj.object_ref(&());
                let note = e.to_string();
                tokio::spawn(async move {
                    events
                        .warn(&oref, reasons::VALIDATION_FAILED, "Validate", note)
                        .await;
                });
                return;
            }
        }
        self.queue.add(obj.key());
    }

    fn on_update(&self, old: &A, new: &A) {
        if spec_of(old) != spec_of(new) || old.is_terminating() != new.is_terminating() {
            self.queue.add(new.key());
        }
    }

    fn on_delete(&self, obj: &A) {
        self.queue.add(obj.key());
    }
}

/// Pods matter when labels or address change; deleted pods leave a tombstone
pub struct PodHandler {
    ctx: Arc<Context>,
}

impl PodHandler {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }
}

fn pod_key(pod: &Pod) -> String {
    format!("{}/{}", pod.namespace().unwrap_or_default(), pod.name_any())
}

impl EventHandler<Pod> for PodHandler {
    fn on_add(&self, obj: &Pod) {
        self.ctx.queues.pods.add(pod_key(obj));
    }

    fn on_update(&self, old: &Pod, new: &Pod) {
        if old.labels() != new.labels() || pod_ip(old) != pod_ip(new) {
            self.ctx.queues.pods.add(pod_key(new));
        }
    }

    fn on_delete(&self, obj: &Pod) {
        let key = pod_key(obj);
        debug!("Pod {} deleted", key);
        self.ctx.pod_tombstones.insert(key.clone(), Arc::new(obj.clone()));
        self.ctx.queues.pods.add(key);
    }
}

/// Nodes matter when labels or addresses change; deleted nodes leave a tombstone
pub struct NodeHandler {
    ctx: Arc<Context>,
}

impl NodeHandler {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }
}

impl EventHandler<Node> for NodeHandler {
    fn on_add(&self, obj: &Node) {
        self.ctx.queues.nodes.add(obj.name_any());
    }

    fn on_update(&self, old: &Node, new: &Node) {
        if old.labels() != new.labels() || node_address(old) != node_address(new) {
            self.ctx.queues.nodes.add(new.name_any());
        }
    }

    fn on_delete(&self, obj: &Node) {
        let key = obj.name_any();
        debug!("Node {} deleted", key);
        self.ctx.node_tombstones.insert(key.clone(), Arc::new(obj.clone()));
        self.ctx.queues.nodes.add(key);
    }
}

/// Only namespace deletion is of interest
pub struct NamespaceHandler {
    queue: WorkQueue,
}

impl NamespaceHandler {
    pub fn new(queue: WorkQueue) -> Self {
        Self { queue }
    }
}

impl EventHandler<Namespace> for NamespaceHandler {
    fn on_add(&self, obj: &Namespace) {
        if obj.metadata.deletion_timestamp.is_some() {
            self.queue.add(obj.name_any());
        }
    }

    fn on_update(&self, old: &Namespace, new: &Namespace) {
        if old.metadata.deletion_timestamp.is_none() && new.metadata.deletion_timestamp.is_some() {
            self.queue.add(new.name_any());
        }
    }

    fn on_delete(&self, obj: &Namespace) {
        self.queue.add(obj.name_any());
    }
}

pub struct PluginHandler {
    queue: WorkQueue,
}

impl PluginHandler {
    pub fn new(queue: WorkQueue) -> Self {
        Self { queue }
    }
}

impl EventHandler<CheckPlugin> for PluginHandler {
    fn on_add(&self, obj: &CheckPlugin) {
        self.queue.add(obj.name_any());
    }

    fn on_update(&self, old: &CheckPlugin, new: &CheckPlugin) {
        if old.spec != new.spec {
            self.queue.add(new.name_any());
        }
    }

    fn on_delete(&self, obj: &CheckPlugin) {
        self.queue.add(obj.name_any());
    }
}
