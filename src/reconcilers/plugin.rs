// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CheckPlugin reconciler - keeps the registry and Icinga's check commands in sync with the
//! installed plugins.

use crate::checks::{BuiltinConflict, CheckCommand};
use crate::constants::reasons;
use crate::error::Result;
use crate::icinga::objects::plugin_check_command;
use crate::icinga::ObjectType;
use crate::reconcilers::context::Context;
use crate::types::{Alert, AlertKind};
use kube::runtime::reflector::{ObjectRef, Store};
use kube::Resource;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[instrument(skip(ctx))]
pub async fn reconcile_plugin(ctx: Arc<Context>, key: String) -> Result<()> {
    let Some(plugin) = ctx.plugins.get(&ObjectRef::new(&key)) else {
        let Some(command) = ctx.registry.delete(&key) else {
            return Ok(());
        };
        info!("Check plugin {} removed", key);
        if let Err(e) = ctx.icinga.delete(ObjectType::CheckCommand, &key).await {
            // Keep it registered so the retry still knows to delete it
            let _ = ctx.registry.set(command);
            return Err(e);
        }
        requeue_users(&ctx, &command);
        return Ok(());
    };

    let command = CheckCommand::from_plugin(&plugin);
    if let Err(BuiltinConflict(name)) = ctx.registry.set(command.clone()) {
        warn!("Check plugin {} collides with a built-in check", name);
        ctx.events
            .warn(
                &plugin.object_ref(&()),
                reasons::PLUGIN_REJECTED,
                "Register",
                format!("{} is a built-in check and cannot be replaced", name),
            )
            .await;
        return Ok(());
    }

    let object = plugin_check_command(&plugin.spec.command, &plugin.spec.vars);
    if ctx.icinga.exists(ObjectType::CheckCommand, &key).await? {
        ctx.icinga
            .update(ObjectType::CheckCommand, &key, &object.attrs)
            .await?;
    } else {
        info!("Check plugin {} registered", key);
        ctx.icinga
            .create(ObjectType::CheckCommand, &key, &object)
            .await?;
    }
    requeue_users(&ctx, &command);
    Ok(())
}

/// Alerts referencing the command get another pass now that its definition changed
fn requeue_users(ctx: &Context, command: &CheckCommand) {
    fn users<A: Alert>(store: &Store<A>, check: &str) -> Vec<String> {
        store
            .state()
            .iter()
            .filter(|a| a.settings().check == check)
            .map(|a| a.key())
            .collect()
    }

    for kind in &command.kinds {
        let keys = match kind {
            AlertKind::ClusterAlert => users(&ctx.alerts.cluster, &command.name),
            AlertKind::NodeAlert => users(&ctx.alerts.node, &command.name),
            AlertKind::PodAlert => users(&ctx.alerts.pod, &command.name),
        };
        for key in keys {
            ctx.queues.alerts(*kind).add(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{in_namespace, FakeIcinga, MockService, RecordingEvents, TestWorld};
    use crate::types::{AlertSettings, CheckPlugin, CheckPluginSpec, PodAlert, PodAlertSpec};
    use serde_json::json;

    fn plugin(name: &str) -> CheckPlugin {
        CheckPlugin::new(
            name,
            CheckPluginSpec {
                command: "/usr/lib/lookout/check_probe".to_string(),
                alert_kinds: vec![AlertKind::PodAlert],
                vars: vec!["url".to_string()],
                states: vec!["Critical".to_string()],
            },
        )
    }

    fn probe_alert() -> PodAlert {
        in_namespace(
            PodAlert::new(
                "probe",
                PodAlertSpec {
                    pod_name: Some("web-0".to_string()),
                    selector: None,
                    alert: AlertSettings {
                        check: "web-probe".to_string(),
                        ..Default::default()
                    },
                },
            ),
            "default",
        )
    }

    fn context(world: TestWorld, icinga: &Arc<FakeIcinga>, events: &Arc<RecordingEvents>) -> Arc<Context> {
        Arc::new(world.context(MockService::new().into_client(), icinga.clone(), events.clone()))
    }

    #[tokio::test]
    async fn test_plugin_is_registered_and_pushed_to_icinga() {
        let icinga = Arc::new(FakeIcinga::new());
        let events = Arc::new(RecordingEvents::default());
        let world = TestWorld {
            plugins: vec![plugin("web-probe")],
            pod_alerts: vec![probe_alert()],
            ..Default::default()
        };
        let ctx = context(world, &icinga, &events);

        reconcile_plugin(ctx.clone(), "web-probe".to_string()).await.unwrap();

        assert!(ctx.registry.get(AlertKind::PodAlert, "web-probe").is_some());
        let object = icinga.get(ObjectType::CheckCommand, "web-probe").unwrap();
        assert_eq!(object.attrs["command"], json!(["/usr/lib/lookout/check_probe"]));
        assert_eq!(ctx.queues.pod_alerts.len(), 1);

        // A second pass updates in place
        icinga.clear_calls();
        reconcile_plugin(ctx.clone(), "web-probe".to_string()).await.unwrap();
        assert_eq!(
            icinga.calls(),
            vec!["get checkcommands web-probe", "update checkcommands web-probe"]
        );
    }

    #[tokio::test]
    async fn test_builtin_name_is_rejected() {
        let icinga = Arc::new(FakeIcinga::new());
        let events = Arc::new(RecordingEvents::default());
        let world = TestWorld {
            plugins: vec![plugin("pod-status")],
            ..Default::default()
        };
        let ctx = context(world, &icinga, &events);

        reconcile_plugin(ctx.clone(), "pod-status".to_string()).await.unwrap();

        assert!(icinga.calls().is_empty());
        assert_eq!(events.reasons(), vec![reasons::PLUGIN_REJECTED]);
        assert!(!ctx.registry.get(AlertKind::PodAlert, "pod-status").unwrap().is_plugin());
    }

    #[tokio::test]
    async fn test_removed_plugin_is_unregistered() {
        let icinga = Arc::new(FakeIcinga::new());
        let events = Arc::new(RecordingEvents::default());
        let world = TestWorld {
            pod_alerts: vec![probe_alert()],
            ..Default::default()
        };
        let ctx = context(world, &icinga, &events);
        ctx.registry.set(CheckCommand::from_plugin(&plugin("web-probe"))).unwrap();
        icinga.insert(
            ObjectType::CheckCommand,
            "web-probe",
            plugin_check_command("/usr/lib/lookout/check_probe", &vec!["url".to_string()]),
        );

        reconcile_plugin(ctx.clone(), "web-probe".to_string()).await.unwrap();

        assert!(ctx.registry.get(AlertKind::PodAlert, "web-probe").is_none());
        assert!(icinga.names(ObjectType::CheckCommand).is_empty());
        assert_eq!(ctx.queues.pod_alerts.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_removal_stays_registered() {
        let icinga = Arc::new(FakeIcinga::new());
        icinga.set_unavailable(true);
        let events = Arc::new(RecordingEvents::default());
        let ctx = context(TestWorld::default(), &icinga, &events);
        ctx.registry.set(CheckCommand::from_plugin(&plugin("web-probe"))).unwrap();

        assert!(reconcile_plugin(ctx.clone(), "web-probe".to_string()).await.is_err());
        assert!(ctx.registry.get(AlertKind::PodAlert, "web-probe").is_some());
    }
}
