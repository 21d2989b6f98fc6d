// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pod and Node reconcilers.
//!
//! A changed object re-queues every alert that claims it or selects it now. A deleted object
//! is gone from the cache before its key is processed, so its hosts are torn down from the
//! tombstone left by the watch handler. The same goes for an object that was deleted and
//! recreated under its old name before the key came up.

use crate::error::Result;
use crate::reconcilers::adapter::EngineHostAdapter;
use crate::reconcilers::context::Context;
use crate::targets::resolver::selects;
use crate::targets::{claims, HostIdentity};
use crate::types::alert::split_key;
use crate::types::{Alert, AlertKind};
use kube::{Resource, ResourceExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[instrument(skip(ctx))]
pub async fn reconcile_pod(ctx: Arc<Context>, key: String) -> Result<()> {
    let (namespace, name) = split_key(&key)?;
    let pod = ctx.resolver.pod(namespace, name);

    if let Some(tombstone) = ctx.pod_tombstones.take(&key) {
        if replaced(pod.as_deref(), tombstone.as_ref()) {
            let claimed = claims::of(tombstone.as_ref(), AlertKind::PodAlert);
            let result = teardown(&ctx, AlertKind::PodAlert, &claimed, |_| {
                HostIdentity::new(AlertKind::PodAlert, namespace, name)
            })
            .await;
            if result.is_err() {
                ctx.pod_tombstones.insert(key.clone(), tombstone);
                return result;
            }
        }
    }

    let Some(pod) = pod else {
        debug!("Pod {} is gone", key);
        return Ok(());
    };

    let mut alerts = claims::of(pod.as_ref(), AlertKind::PodAlert);
    for alert in ctx.alerts.pod.state() {
        if alert.namespace().as_deref() == Some(namespace) && selected_by(alert.as_ref(), name, pod.labels()) {
            alerts.insert(alert.key());
        }
    }
    enqueue(&ctx, AlertKind::PodAlert, alerts);
    Ok(())
}

#[instrument(skip(ctx))]
pub async fn reconcile_node(ctx: Arc<Context>, key: String) -> Result<()> {
    let node = ctx.resolver.node(&key);

    if let Some(tombstone) = ctx.node_tombstones.take(&key) {
        if replaced(node.as_deref(), tombstone.as_ref()) {
            let claimed = claims::of(tombstone.as_ref(), AlertKind::NodeAlert);
            // Node hosts live in the namespace of the alert watching them
            let result = teardown(&ctx, AlertKind::NodeAlert, &claimed, |alert_namespace| {
                HostIdentity::new(AlertKind::NodeAlert, alert_namespace, &key)
            })
            .await;
            if result.is_err() {
                ctx.node_tombstones.insert(key.clone(), tombstone);
                return result;
            }
        }
    }

    let Some(node) = node else {
        debug!("Node {} is gone", key);
        return Ok(());
    };

    let mut alerts = claims::of(node.as_ref(), AlertKind::NodeAlert);
    for alert in ctx.alerts.node.state() {
        if selected_by(alert.as_ref(), &key, node.labels()) {
            alerts.insert(alert.key());
        }
    }
    enqueue(&ctx, AlertKind::NodeAlert, alerts);
    Ok(())
}

/// Whether the deleted object is not the one in the cache. An object recreated under the
/// same name carries a new UID and none of the old claims.
fn replaced<K: Resource>(live: Option<&K>, tombstone: &K) -> bool {
    match live {
        Some(live) => live.uid() != tombstone.uid(),
        None => true,
    }
}

/// Invalid selections select nothing; the alert reconciler reports them
fn selected_by<A: Alert>(alert: &A, name: &str, labels: &BTreeMap<String, String>) -> bool {
    alert
        .selection()
        .and_then(|selection| selects(&selection, name, labels))
        .unwrap_or(false)
}

fn enqueue(ctx: &Context, kind: AlertKind, alerts: BTreeSet<String>) {
    let queue = ctx.queues.alerts(kind);
    for alert in alerts {
        queue.add(alert);
    }
}

async fn teardown(
    ctx: &Context,
    kind: AlertKind,
    claimed: &BTreeSet<String>,
    identity: impl Fn(&str) -> Result<HostIdentity>,
) -> Result<()> {
    let adapter = EngineHostAdapter::new(kind, ctx.icinga.clone(), &ctx.notifier_user);
    for alert_key in claimed {
        let (alert_namespace, alert_name) = split_key(alert_key)?;
        let host = identity(alert_namespace)?;
        info!("Removing {} from deleted target {}", alert_key, host);
        adapter.delete(alert_name, &host).await?;
    }
    enqueue(ctx, kind, claimed.clone());
    Ok(())
}
