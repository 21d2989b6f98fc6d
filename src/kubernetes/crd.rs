// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD registration and availability checking utilities

use crate::constants::crd::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS};
use crate::constants::OPERATOR_NAME;
use crate::error::Result;
use crate::types::{CheckPlugin, ClusterAlert, Incident, NodeAlert, PodAlert};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{
    api::{Patch, PatchParams},
    Api, Client, CustomResourceExt, ResourceExt,
};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

/// Every CRD the operator serves
pub fn definitions() -> Vec<CustomResourceDefinition> {
    vec![
        ClusterAlert::crd(),
        NodeAlert::crd(),
        PodAlert::crd(),
        Incident::crd(),
        CheckPlugin::crd(),
    ]
}

/// Apply all CRDs and wait until the API server serves them
#[instrument(skip(client))]
pub async fn register_crds(client: &Client) -> Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let pp = PatchParams::apply(OPERATOR_NAME).force();

    for crd in definitions() {
        let name = crd.name_any();
        info!("Registering CRD {}", name);
        crds.patch(&name, &pp, &Patch::Apply(&crd)).await?;
    }

    for crd in definitions() {
        wait_for_crd(&crds, &crd.name_any()).await?;
    }
    Ok(())
}

/// Wait for a CRD to report the Established condition.
/// This uses exponential backoff starting at POLL_INTERVAL_SECS seconds.
async fn wait_for_crd(crds: &Api<CustomResourceDefinition>, name: &str) -> Result<()> {
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match crds.get_opt(name).await {
            Ok(Some(crd)) if is_established(&crd) => {
                info!("CRD {} is established", name);
                return Ok(());
            }
            Ok(_) => {
                info!("CRD {} not yet established, waiting {} seconds...", name, interval);
            }
            Err(e) => {
                warn!(
                    "Error checking CRD {}: {}, retrying in {} seconds...",
                    name, e, interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;

        // Exponential backoff with max cap
        interval = (interval * 2).min(POLL_MAX_INTERVAL_SECS);
    }
}

fn is_established(crd: &CustomResourceDefinition) -> bool {
    crd.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Established" && c.status == "True")
        })
}
