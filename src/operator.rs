// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Wires informers, work queues and reconcilers together.

use crate::checks::CheckCommandRegistry;
use crate::config::Config;
use crate::constants::OPERATOR_NAME;
use crate::icinga::IcingaApi;
use crate::kubernetes::{EventPublisher, KubeEventPublisher};
use crate::reconcilers::handlers::{AlertHandler, NamespaceHandler, NodeHandler, PluginHandler, PodHandler};
use crate::reconcilers::{alert, namespace, plugin, target};
use crate::reconcilers::{AlertStores, Context, IncidentCollector, Queues, Tombstones};
use crate::sync::{run_workers, Informer, WorkQueue};
use crate::targets::TargetResolver;
use crate::types::{CheckPlugin, ClusterAlert, NodeAlert, PodAlert};
use anyhow::Context as _;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod};
use kube::{Api, Client};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub struct Operator {
    client: Client,
    config: Config,
    icinga: Arc<dyn IcingaApi>,
}

impl Operator {
    pub fn new(client: Client, config: Config, icinga: Arc<dyn IcingaApi>) -> Self {
        Self { client, config, icinga }
    }

    /// Run until the token is cancelled, then wait for every task to wind down
    pub async fn run(self, token: CancellationToken) -> anyhow::Result<()> {
        let client = self.client;
        let pods = Informer::<Pod>::new(Api::all(client.clone()));
        let nodes = Informer::<Node>::new(Api::all(client.clone()));
        let namespaces = Informer::<Namespace>::new(Api::all(client.clone()));
        let cluster_alerts = Informer::<ClusterAlert>::new(Api::all(client.clone()));
        let node_alerts = Informer::<NodeAlert>::new(Api::all(client.clone()));
        let pod_alerts = Informer::<PodAlert>::new(Api::all(client.clone()));
        let plugins = Informer::<CheckPlugin>::new(Api::all(client.clone()));

        let queues = Queues::new(&self.config);
        let events: Arc<dyn EventPublisher> = Arc::new(KubeEventPublisher::new(client.clone(), OPERATOR_NAME));
        let ctx = Arc::new(Context {
            client: client.clone(),
            icinga: self.icinga,
            registry: Arc::new(CheckCommandRegistry::with_builtins()),
            resolver: TargetResolver::new(pods.store(), nodes.store(), namespaces.store()),
            alerts: AlertStores {
                cluster: cluster_alerts.store(),
                node: node_alerts.store(),
                pod: pod_alerts.store(),
            },
            plugins: plugins.store(),
            events,
            queues: queues.clone(),
            pod_tombstones: Tombstones::new(),
            node_tombstones: Tombstones::new(),
            notifier_user: self.config.notifier_user.clone(),
        });

        let (pod_store, node_store, namespace_store) = (pods.store(), nodes.store(), namespaces.store());
        let plugin_store = plugins.store();

        let mut tasks = JoinSet::new();
        tasks.spawn(pods.run(Arc::new(PodHandler::new(ctx.clone())), token.clone()));
        tasks.spawn(nodes.run(Arc::new(NodeHandler::new(ctx.clone())), token.clone()));
        tasks.spawn(namespaces.run(
            Arc::new(NamespaceHandler::new(queues.namespaces.clone())),
            token.clone(),
        ));
        tasks.spawn(cluster_alerts.run(
            Arc::new(AlertHandler::new(queues.cluster_alerts.clone(), ctx.events.clone())),
            token.clone(),
        ));
        tasks.spawn(node_alerts.run(
            Arc::new(AlertHandler::new(queues.node_alerts.clone(), ctx.events.clone())),
            token.clone(),
        ));
        tasks.spawn(pod_alerts.run(
            Arc::new(AlertHandler::new(queues.pod_alerts.clone(), ctx.events.clone())),
            token.clone(),
        ));
        tasks.spawn(plugins.run(Arc::new(PluginHandler::new(queues.plugins.clone())), token.clone()));

        info!("Waiting for informer caches to sync...");
        let synced = async {
            tokio::try_join!(
                pod_store.wait_until_ready(),
                node_store.wait_until_ready(),
                namespace_store.wait_until_ready(),
                ctx.alerts.cluster.wait_until_ready(),
                ctx.alerts.node.wait_until_ready(),
                ctx.alerts.pod.wait_until_ready(),
                plugin_store.wait_until_ready(),
            )
        };
        tokio::select! {
            _ = token.cancelled() => info!("Shutdown requested before caches synced"),
            result = synced => {
                result.context("Informer stopped before its cache synced")?;
                info!("Caches synced, starting workers");

                // Plugins first, so alerts referencing them validate on their first pass
                let workers = self.config.workers;
                spawn_workers(&mut tasks, &queues.plugins, workers, &token, &ctx, plugin::reconcile_plugin);
                spawn_workers(&mut tasks, &queues.cluster_alerts, workers, &token, &ctx, alert::reconcile::<ClusterAlert>);
                spawn_workers(&mut tasks, &queues.node_alerts, workers, &token, &ctx, alert::reconcile::<NodeAlert>);
                spawn_workers(&mut tasks, &queues.pod_alerts, workers, &token, &ctx, alert::reconcile::<PodAlert>);
                spawn_workers(&mut tasks, &queues.pods, workers, &token, &ctx, target::reconcile_pod);
                spawn_workers(&mut tasks, &queues.nodes, workers, &token, &ctx, target::reconcile_node);
                spawn_workers(&mut tasks, &queues.namespaces, workers, &token, &ctx, namespace::reconcile_namespace);

                tasks.spawn(IncidentCollector::new(client, self.config.incident_ttl).run(token.clone()));
            }
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!("Operator task failed: {}", e);
            }
        }
        info!("Operator stopped");
        Ok(())
    }
}

fn spawn_workers<F, Fut>(
    tasks: &mut JoinSet<()>,
    queue: &WorkQueue,
    workers: usize,
    token: &CancellationToken,
    ctx: &Arc<Context>,
    reconcile: F,
) where
    F: Fn(Arc<Context>, String) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = crate::error::Result<()>> + Send + 'static,
{
    let ctx = ctx.clone();
    tasks.spawn(run_workers(queue.clone(), workers, token.clone(), move |key| {
        reconcile(ctx.clone(), key)
    }));
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
