// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Claim annotations record which alerts provisioned Icinga objects for a target.
//!
//! They are the persisted membership used to tear down objects after an alert or its
//! target is gone, and to find targets an alert's selector no longer matches.

use crate::constants::annotations;
use crate::error::Result;
use crate::targets::resolver::TargetRef;
use crate::types::AlertKind;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, Resource};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

/// Annotation holding the claims of the given alert kind
pub fn annotation_key(kind: AlertKind) -> &'static str {
    match kind {
        AlertKind::ClusterAlert => annotations::CLUSTER_ALERTS,
        AlertKind::NodeAlert => annotations::NODE_ALERTS,
        AlertKind::PodAlert => annotations::POD_ALERTS,
    }
}

/// Alert keys stored in the annotation
pub fn parse(annotations: Option<&BTreeMap<String, String>>, key: &str) -> BTreeSet<String> {
    annotations
        .and_then(|a| a.get(key))
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Claims of the given kind on any Kubernetes object
pub fn of<K: Resource>(obj: &K, kind: AlertKind) -> BTreeSet<String> {
    parse(obj.meta().annotations.as_ref(), annotation_key(kind))
}

/// Annotation value, `None` once nothing claims the object
pub fn format(claims: &BTreeSet<String>) -> Option<String> {
    if claims.is_empty() {
        None
    } else {
        Some(claims.iter().cloned().collect::<Vec<_>>().join(","))
    }
}

/// Write the claims annotation. The cached resourceVersion makes concurrent writers fail with
/// a conflict instead of overwriting each other; a vanished object is not an error.
#[instrument(skip(client, claims), fields(target = %target))]
pub async fn write(
    client: &Client,
    target: &TargetRef,
    kind: AlertKind,
    claims: &BTreeSet<String>,
    resource_version: Option<&str>,
) -> Result<()> {
    let patch = claims_patch(kind, claims, resource_version);
    let pp = PatchParams::default();

    let result = match target {
        TargetRef::Pod { namespace, name } => Api::<Pod>::namespaced(client.clone(), namespace)
            .patch(name, &pp, &Patch::Merge(&patch))
            .await
            .map(|_| ()),
        TargetRef::Node { name } => Api::<Node>::all(client.clone())
            .patch(name, &pp, &Patch::Merge(&patch))
            .await
            .map(|_| ()),
        TargetRef::Namespace { name } => Api::<Namespace>::all(client.clone())
            .patch(name, &pp, &Patch::Merge(&patch))
            .await
            .map(|_| ()),
    };

    match result {
        Ok(()) => {
            debug!("Updated {} claims to {:?}", kind, claims);
            Ok(())
        }
        Err(kube::Error::Api(err)) if err.code == 404 => {
            debug!("Target vanished before its claims could be updated");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn claims_patch(
    kind: AlertKind,
    claims: &BTreeSet<String>,
    resource_version: Option<&str>,
) -> serde_json::Value {
    let key = annotation_key(kind);
    let mut metadata = json!({
        "annotations": { key: format(claims) }
    });
    if let Some(rv) = resource_version {
        metadata["resourceVersion"] = json!(rv);
    }
    json!({ "metadata": metadata })
}
