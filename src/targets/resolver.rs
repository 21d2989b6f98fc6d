// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resolves the Kubernetes objects an alert applies to, reading only from informer stores.

use crate::error::Result;
use crate::targets::claims;
use crate::targets::identity::HostIdentity;
use crate::targets::selector;
use crate::types::{alert::split_key, Alert, AlertKind, Selection};
use k8s_openapi::api::core::v1::{Namespace, Node, Pod};
use kube::runtime::reflector::{ObjectRef, Store};
use kube::ResourceExt;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// The Kubernetes object carrying the claims for a target
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetRef {
    Pod { namespace: String, name: String },
    Node { name: String },
    /// The alert namespace stands in for the synthetic cluster target
    Namespace { name: String },
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Pod { namespace, name } => write!(f, "pod/{}/{}", namespace, name),
            TargetRef::Node { name } => write!(f, "node/{}", name),
            TargetRef::Namespace { name } => write!(f, "namespace/{}", name),
        }
    }
}

/// A concrete object an alert applies to
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub identity: HostIdentity,
    pub target_ref: TargetRef,
    /// Address Icinga checks the host on
    pub address: String,
    /// Alerts of the resolving kind that currently claim this target
    pub claims: BTreeSet<String>,
    pub resource_version: Option<String>,
}

/// Read-only view over the informer caches
#[derive(Clone)]
pub struct TargetResolver {
    pods: Store<Pod>,
    nodes: Store<Node>,
    namespaces: Store<Namespace>,
}

impl TargetResolver {
    pub fn new(pods: Store<Pod>, nodes: Store<Node>, namespaces: Store<Namespace>) -> Self {
        Self { pods, nodes, namespaces }
    }

    /// Objects the alert currently selects. An empty result is not an error.
    pub fn resolve<A: Alert>(&self, alert: &A) -> Result<Vec<Target>> {
        let namespace = alert.namespace().unwrap_or_default();
        let selection = alert.selection()?;
        if let Selection::Selector(s) = &selection {
            selector::validate(s)?;
        }

        match A::KIND {
            AlertKind::ClusterAlert => Ok(vec![self.cluster_target(&namespace)?]),
            AlertKind::NodeAlert => {
                let mut targets = vec![];
                for node in self.nodes.state() {
                    if selects(&selection, &node.name_any(), node.labels())? {
                        targets.push(node_target(&namespace, &node)?);
                    }
                }
                Ok(sorted(targets))
            }
            AlertKind::PodAlert => {
                let mut targets = vec![];
                for pod in self.pods.state() {
                    if pod.namespace().as_deref() != Some(namespace.as_str()) {
                        continue;
                    }
                    if !selects(&selection, &pod.name_any(), pod.labels())? {
                        continue;
                    }
                    if let Some(target) = pod_target(&pod)? {
                        targets.push(target);
                    }
                }
                Ok(sorted(targets))
            }
        }
    }

    /// Targets whose claims annotation lists the alert, found without the alert object
    pub fn claimed_by(&self, kind: AlertKind, alert_key: &str) -> Result<Vec<Target>> {
        let (namespace, _) = split_key(alert_key)?;
        let mut targets = vec![];

        match kind {
            AlertKind::ClusterAlert => {
                if let Some(ns) = self.namespaces.get(&ObjectRef::new(namespace)) {
                    if claims::of(ns.as_ref(), kind).contains(alert_key) {
                        targets.push(self.cluster_target(namespace)?);
                    }
                }
            }
            AlertKind::NodeAlert => {
                for node in self.nodes.state() {
                    if claims::of(node.as_ref(), kind).contains(alert_key) {
                        targets.push(node_target(namespace, &node)?);
                    }
                }
            }
            AlertKind::PodAlert => {
                for pod in self.pods.state() {
                    if pod.namespace().as_deref() == Some(namespace)
                        && claims::of(pod.as_ref(), kind).contains(alert_key)
                    {
                        targets.push(claimed_pod_target(&pod)?);
                    }
                }
            }
        }
        Ok(sorted(targets))
    }

    pub fn pod(&self, namespace: &str, name: &str) -> Option<Arc<Pod>> {
        self.pods.get(&ObjectRef::new(name).within(namespace))
    }

    pub fn node(&self, name: &str) -> Option<Arc<Node>> {
        self.nodes.get(&ObjectRef::new(name))
    }

    pub fn namespace(&self, name: &str) -> Option<Arc<Namespace>> {
        self.namespaces.get(&ObjectRef::new(name))
    }

    fn cluster_target(&self, namespace: &str) -> Result<Target> {
        let ns = self.namespaces.get(&ObjectRef::new(namespace));
        Ok(Target {
            identity: HostIdentity::cluster(namespace)?,
            target_ref: TargetRef::Namespace {
                name: namespace.to_string(),
            },
            address: crate::constants::icinga::CLUSTER_HOST_ADDRESS.to_string(),
            claims: ns
                .as_ref()
                .map(|ns| claims::of(ns.as_ref(), AlertKind::ClusterAlert))
                .unwrap_or_default(),
            resource_version: ns.and_then(|ns| ns.resource_version()),
        })
    }
}

/// Whether an object with the given name and labels falls under the selection
pub fn selects(
    selection: &Selection,
    name: &str,
    labels: &std::collections::BTreeMap<String, String>,
) -> Result<bool> {
    match selection {
        Selection::All | Selection::Cluster => Ok(true),
        Selection::Name(wanted) => Ok(wanted == name),
        Selection::Selector(s) => selector::matches(s, labels),
    }
}

fn sorted(mut targets: Vec<Target>) -> Vec<Target> {
    targets.sort_by(|a, b| a.identity.cmp(&b.identity));
    targets
}

/// Target for a node as seen by an alert in `alert_namespace`
pub fn node_target(alert_namespace: &str, node: &Node) -> Result<Target> {
    let name = node.name_any();
    Ok(Target {
        identity: HostIdentity::new(AlertKind::NodeAlert, alert_namespace, &name)?,
        target_ref: TargetRef::Node { name: name.clone() },
        address: node_address(node).unwrap_or(name),
        claims: claims::of(node, AlertKind::NodeAlert),
        resource_version: node.resource_version(),
    })
}

/// Target for a pod, `None` until the pod has an IP to check
pub fn pod_target(pod: &Pod) -> Result<Option<Target>> {
    if pod_ip(pod).is_none() {
        return Ok(None);
    }
    claimed_pod_target(pod).map(Some)
}

fn claimed_pod_target(pod: &Pod) -> Result<Target> {
    let name = pod.name_any();
    let namespace = pod.namespace().unwrap_or_default();
    Ok(Target {
        identity: HostIdentity::new(AlertKind::PodAlert, &namespace, &name)?,
        target_ref: TargetRef::Pod {
            namespace,
            name,
        },
        address: pod_ip(pod).unwrap_or_default(),
        claims: claims::of(pod, AlertKind::PodAlert),
        resource_version: pod.resource_version(),
    })
}

pub fn pod_ip(pod: &Pod) -> Option<String> {
    pod.status
        .as_ref()
        .and_then(|s| s.pod_ip.clone())
        .filter(|ip| !ip.is_empty())
}

/// Preferred node address: InternalIP, then ExternalIP, then Hostname
pub fn node_address(node: &Node) -> Option<String> {
    let addresses = node.status.as_ref()?.addresses.as_ref()?;
    ["InternalIP", "ExternalIP", "Hostname"].iter().find_map(|wanted| {
        addresses
            .iter()
            .find(|a| a.type_ == *wanted && !a.address.is_empty())
            .map(|a| a.address.clone())
    })
}
