// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Periodic removal of recovered incidents older than the configured TTL.

use crate::error::Result;
use crate::types::Incident;
use chrono::{DateTime, Utc};
use kube::api::{DeleteParams, ListParams};
use kube::{Api, Client, ResourceExt};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub struct IncidentCollector {
    client: Client,
    ttl: Duration,
}

impl IncidentCollector {
    pub fn new(client: Client, ttl: Duration) -> Self {
        Self { client, ttl }
    }

    /// Collect every TTL until cancelled; a zero TTL disables collection
    pub async fn run(self, token: CancellationToken) {
        if self.ttl.is_zero() {
            info!("Incident garbage collection disabled");
            return;
        }
        info!("Collecting recovered incidents older than {}", humantime::format_duration(self.ttl));

        let mut ticker = tokio::time::interval(self.ttl);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.collect(Utc::now()).await {
                        warn!("Incident garbage collection failed: {}", e);
                    }
                }
            }
        }
    }

    /// Delete expired incidents, returning how many were removed
    #[instrument(skip(self))]
    pub async fn collect(&self, now: DateTime<Utc>) -> Result<usize> {
        let all: Api<Incident> = Api::all(self.client.clone());
        let mut deleted = 0;

        for incident in all.list(&ListParams::default()).await? {
            if !incident.is_expired(self.ttl, now) {
                continue;
            }
            let namespace = incident.namespace().unwrap_or_default();
            let api: Api<Incident> = Api::namespaced(self.client.clone(), &namespace);
            match api.delete(&incident.name_any(), &DeleteParams::default()).await {
                Ok(_) => {
                    debug!("Deleted incident {}/{}", namespace, incident.name_any());
                    deleted += 1;
                }
                Err(kube::Error::Api(e)) if e.code == 404 => {}
                Err(e) => return Err(e.into()),
            }
        }

        if deleted > 0 {
            info!("Deleted {} expired incidents", deleted);
        }
        Ok(deleted)
    }
}
