// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace reconciler - deletes the alerts of a namespace that is going away, so each one
//! runs through its finalizer instead of disappearing with the namespace.

use crate::error::Result;
use crate::reconcilers::context::{CachedAlert, Context};
use crate::types::{ClusterAlert, NodeAlert, PodAlert};
use kube::api::DeleteParams;
use kube::{Api, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[instrument(skip(ctx))]
pub async fn reconcile_namespace(ctx: Arc<Context>, key: String) -> Result<()> {
    let going_away = match ctx.resolver.namespace(&key) {
        None => true,
        Some(ns) => ns.metadata.deletion_timestamp.is_some(),
    };
    if !going_away {
        debug!("Namespace {} is active", key);
        return Ok(());
    }

    info!("Namespace {} is going away, deleting its alerts", key);
    delete_alerts::<ClusterAlert>(&ctx, &key).await?;
    delete_alerts::<NodeAlert>(&ctx, &key).await?;
    delete_alerts::<PodAlert>(&ctx, &key).await
}

async fn delete_alerts<A: CachedAlert>(ctx: &Context, namespace: &str) -> Result<()> {
    let api: Api<A> = Api::namespaced(ctx.client.clone(), namespace);
    let alerts = A::store(ctx)
        .state()
        .into_iter()
        .filter(|a| a.namespace().as_deref() == Some(namespace));

    for alert in alerts {
        if !alert.is_terminating() {
            match api.delete(&alert.name_any(), &DeleteParams::default()).await {
                Ok(_) => debug!("Deleted {} {}", A::KIND, alert.key()),
                Err(kube::Error::Api(e)) if e.code == 404 => {}
                Err(e) => return Err(e.into()),
            }
        }
        ctx.queues.alerts(A::KIND).add(alert.key());
    }
    Ok(())
}
