// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Alert reconciler - keeps the Icinga objects of one alert in line with its targets.
//!
//! A key is handled in one of three ways:
//! - the alert is gone from the cache: tear down whatever its claims and Icinga still point at;
//! - the alert is terminating: tear everything down, then release the finalizer;
//! - otherwise validate, provision every resolved target and drop targets no longer selected.

use crate::checks::CheckCommand;
use crate::constants::{reasons, ALERT_FINALIZER};
use crate::error::Result;
use crate::reconcilers::adapter::EngineHostAdapter;
use crate::reconcilers::context::{CachedAlert, Context};
use crate::reconcilers::validation::validate;
use crate::targets::{claims, HostIdentity, Target, TargetRef};
use crate::types::alert::split_key;
use crate::types::AlertKind;
use kube::api::{Patch, PatchParams};
use kube::runtime::reflector::ObjectRef;
use kube::{Api, Resource, ResourceExt};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[instrument(skip(ctx), fields(kind = %A::KIND))]
pub async fn reconcile<A: CachedAlert>(ctx: Arc<Context>, key: String) -> Result<()> {
    let (namespace, name) = split_key(&key)?;
    let adapter = EngineHostAdapter::new(A::KIND, ctx.icinga.clone(), &ctx.notifier_user);

    let Some(alert) = A::store(&ctx).get(&ObjectRef::new(name).within(namespace)) else {
        return teardown(&ctx, &adapter, A::KIND, &key, name).await;
    };

    if alert.is_terminating() {
        if alert.has_finalizer(ALERT_FINALIZER) {
            return finalize(&ctx, &adapter, alert.as_ref()).await;
        }
        debug!("Alert is terminating without our finalizer, nothing to do");
        return Ok(());
    }

    let oref = alert.object_ref(&());
    let command = match validate(&ctx, alert.as_ref()).await {
        Ok(command) => command,
        Err(e) if e.is_validation() => {
            warn!("Alert {} is invalid: {}", key, e);
            ctx.events
                .warn(&oref, reasons::VALIDATION_FAILED, "Validate", e.to_string())
                .await;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    if let Err(e) = sync(&ctx, &adapter, alert.as_ref(), &command).await {
        ctx.events
            .warn(&oref, reasons::SYNC_FAILED, "Sync", e.to_string())
            .await;
        return Err(e);
    }
    Ok(())
}

/// The alert object is gone; its claims and its services in Icinga are all that is left
async fn teardown(
    ctx: &Context,
    adapter: &EngineHostAdapter,
    kind: AlertKind,
    key: &str,
    alert_name: &str,
) -> Result<()> {
    let (namespace, _) = split_key(key)?;
    let targets = ctx.resolver.claimed_by(kind, key)?;
    let hosts = teardown_hosts(ctx, kind, namespace, alert_name, &targets).await?;
    if hosts.is_empty() {
        debug!("Alert {} is gone and left nothing behind", key);
        return Ok(());
    }

    info!("Alert {} is gone, removing it from {} hosts", key, hosts.len());
    adapter.delete_all(alert_name, &hosts).await?;
    release_claims(ctx, kind, key, &targets).await
}

async fn finalize<A: CachedAlert>(ctx: &Context, adapter: &EngineHostAdapter, alert: &A) -> Result<()> {
    let key = alert.key();
    let name = alert.name_any();
    let mut targets: BTreeMap<TargetRef, Target> = ctx
        .resolver
        .claimed_by(A::KIND, &key)?
        .into_iter()
        .map(|t| (t.target_ref.clone(), t))
        .collect();

    match ctx.resolver.resolve(alert) {
        Ok(resolved) => {
            for target in resolved {
                targets.entry(target.target_ref.clone()).or_insert(target);
            }
        }
        Err(e) if e.is_validation() => debug!("Ignoring unresolvable selection during deletion: {}", e),
        Err(e) => return Err(e),
    }
    let targets: Vec<Target> = targets.into_values().collect();

    let removed: Result<()> = async {
        let namespace = alert.namespace().unwrap_or_default();
        let hosts = teardown_hosts(ctx, A::KIND, &namespace, &name, &targets).await?;
        info!("Removing alert {} from {} hosts", key, hosts.len());
        adapter.delete_all(&name, &hosts).await
    }
    .await;
    if let Err(e) = removed {
        ctx.events
            .warn(
                &alert.object_ref(&()),
                reasons::DELETE_FAILED,
                "Delete",
                e.to_string(),
            )
            .await;
        return Err(e);
    }

    release_claims(ctx, A::KIND, &key, &targets).await?;
    remove_finalizer(ctx, alert).await
}

async fn sync<A: CachedAlert>(
    ctx: &Context,
    adapter: &EngineHostAdapter,
    alert: &A,
    command: &CheckCommand,
) -> Result<()> {
    let key = alert.key();
    let name = alert.name_any();
    let settings = alert.settings();

    add_finalizer(ctx, alert).await?;

    let targets = ctx.resolver.resolve(alert)?;
    debug!("Alert {} resolves to {} targets", key, targets.len());

    for target in &targets {
        if settings.paused {
            adapter.pause(&name, &target.identity).await?;
        } else {
            adapter.apply(&name, settings, target).await?;
        }
    }

    // Paused targets stay claimed so deletion still finds their hosts
    for target in targets.iter().filter(|t| !t.claims.contains(&key)) {
        let mut claimed = target.claims.clone();
        claimed.insert(key.clone());
        claims::write(
            &ctx.client,
            &target.target_ref,
            A::KIND,
            &claimed,
            target.resource_version.as_deref(),
        )
        .await?;
    }

    let selected: BTreeSet<&TargetRef> = targets.iter().map(|t| &t.target_ref).collect();
    let stale: Vec<Target> = ctx
        .resolver
        .claimed_by(A::KIND, &key)?
        .into_iter()
        .filter(|t| !selected.contains(&t.target_ref))
        .collect();

    let selected_hosts: BTreeSet<&HostIdentity> = targets.iter().map(|t| &t.identity).collect();
    let namespace = alert.namespace().unwrap_or_default();
    let stale_hosts: Vec<HostIdentity> = teardown_hosts(ctx, A::KIND, &namespace, &name, &stale)
        .await?
        .into_iter()
        .filter(|h| !selected_hosts.contains(h))
        .collect();
    if !stale_hosts.is_empty() {
        info!("Alert {} no longer selects {} hosts", key, stale_hosts.len());
        adapter.delete_all(&name, &stale_hosts).await?;
    }
    release_claims(ctx, A::KIND, &key, &stale).await?;

    update_status(ctx, alert, command, targets.len()).await
}

/// Hosts of the given targets plus every host Icinga still runs the alert's service on.
///
/// Targets deleted while nothing was watching leave neither claim nor tombstone behind,
/// so Icinga is the only place their hosts can still be found.
async fn teardown_hosts(
    ctx: &Context,
    kind: AlertKind,
    namespace: &str,
    alert_name: &str,
    targets: &[Target],
) -> Result<Vec<HostIdentity>> {
    let mut hosts: BTreeSet<HostIdentity> = targets.iter().map(|t| t.identity.clone()).collect();
    let prefix = HostIdentity::prefix(kind, namespace);
    for name in ctx.icinga.service_hosts(alert_name, &prefix).await? {
        match HostIdentity::parse(&name) {
            Ok(host) if host.kind == kind && host.namespace == namespace => {
                hosts.insert(host);
            }
            Ok(host) => debug!("Ignoring host {} of another namespace or kind", host),
            Err(e) => debug!("Ignoring host {}: {}", name, e),
        }
    }
    Ok(hosts.into_iter().collect())
}

async fn release_claims(ctx: &Context, kind: AlertKind, key: &str, targets: &[Target]) -> Result<()> {
    for target in targets.iter().filter(|t| t.claims.contains(key)) {
        let mut remaining = target.claims.clone();
        remaining.remove(key);
        claims::write(
            &ctx.client,
            &target.target_ref,
            kind,
            &remaining,
            target.resource_version.as_deref(),
        )
        .await?;
    }
    Ok(())
}

async fn add_finalizer<A: CachedAlert>(ctx: &Context, alert: &A) -> Result<()> {
    if alert.has_finalizer(ALERT_FINALIZER) {
        return Ok(());
    }
    let mut finalizers = alert.finalizers().to_vec();
    finalizers.push(ALERT_FINALIZER.to_string());
    patch_finalizers(ctx, alert, finalizers).await
}

async fn remove_finalizer<A: CachedAlert>(ctx: &Context, alert: &A) -> Result<()> {
    let finalizers: Vec<String> = alert
        .finalizers()
        .iter()
        .filter(|f| f.as_str() != ALERT_FINALIZER)
        .cloned()
        .collect();
    patch_finalizers(ctx, alert, finalizers).await
}

async fn patch_finalizers<A: CachedAlert>(ctx: &Context, alert: &A, finalizers: Vec<String>) -> Result<()> {
    let api: Api<A> = Api::namespaced(ctx.client.clone(), &alert.namespace().unwrap_or_default());
    let patch = json!({
        "metadata": {
            "finalizers": finalizers,
            "resourceVersion": alert.resource_version(),
        }
    });
    api.patch(&alert.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

async fn update_status<A: CachedAlert>(
    ctx: &Context,
    alert: &A,
    command: &CheckCommand,
    targets: usize,
) -> Result<()> {
    let generation = alert.meta().generation;
    let observed = alert.status().and_then(|s| s.observed_generation);
    if generation.is_none() || generation == observed {
        return Ok(());
    }

    let api: Api<A> = Api::namespaced(ctx.client.clone(), &alert.namespace().unwrap_or_default());
    let patch = json!({ "status": { "observedGeneration": generation } });
    api.patch_status(&alert.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    let note = if alert.settings().paused {
        format!("Paused {} on {} targets", command.name, targets)
    } else {
        format!("Running {} on {} targets", command.name, targets)
    };
    ctx.events
        .normal(&alert.object_ref(&()), reasons::SYNCED, "Sync", note)
        .await;
    Ok(())
}
