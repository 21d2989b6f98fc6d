// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Alert validation. Failures here are reported on the alert and never retried.

use crate::checks::{CheckCommand, CheckCommandRegistry};
use crate::error::{LookoutError, Result};
use crate::reconcilers::context::Context;
use crate::targets::selector;
use crate::types::{Alert, AlertKind, AlertSettings, Selection};
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, ResourceExt};
use std::collections::BTreeSet;
use tracing::debug;

/// Validate an alert and return the check command it runs.
///
/// A missing notifier secret is a validation error; failing to look it up is not.
pub async fn validate<A: Alert>(ctx: &Context, alert: &A) -> Result<CheckCommand> {
    let settings = alert.settings();
    let command = check_settings(&ctx.registry, A::KIND, settings)?;
    check_object(alert)?;

    if let Some(secret_name) = settings.notifier_secret_name.as_deref().filter(|s| !s.is_empty()) {
        let namespace = alert.namespace().unwrap_or_default();
        let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), &namespace);
        if secrets.get_opt(secret_name).await?.is_none() {
            return Err(LookoutError::ValidationError(format!(
                "notifier secret {}/{} does not exist",
                namespace, secret_name
            )));
        }
        debug!("Notifier secret {}/{} found", namespace, secret_name);
    }

    Ok(command)
}

/// Checks that only depend on the alert object itself, cheap enough for a watch handler
pub fn check_object<A: Alert>(alert: &A) -> Result<()> {
    if let Selection::Selector(s) = alert.selection()? {
        selector::validate(&s)?;
    }
    let settings = alert.settings();
    settings.check_interval()?;
    settings.alert_interval()?;
    Ok(())
}

/// Checks that only depend on the alert settings and the registry
pub fn check_settings(
    registry: &CheckCommandRegistry,
    kind: AlertKind,
    settings: &AlertSettings,
) -> Result<CheckCommand> {
    let command = registry.get(kind, &settings.check).ok_or_else(|| {
        LookoutError::ValidationError(format!("unknown check '{}' for {}", settings.check, kind))
    })?;

    let unknown_vars: BTreeSet<&str> = settings
        .vars
        .keys()
        .filter(|k| !command.vars.contains(*k))
        .map(String::as_str)
        .collect();
    if !unknown_vars.is_empty() {
        return Err(LookoutError::ValidationError(format!(
            "check '{}' does not accept vars {:?}",
            command.name, unknown_vars
        )));
    }

    let unknown_states: BTreeSet<&str> = settings
        .receivers
        .iter()
        .map(|r| r.state.as_str())
        .filter(|s| !command.states.contains(*s))
        .collect();
    if !unknown_states.is_empty() {
        return Err(LookoutError::ValidationError(format!(
            "check '{}' never reports states {:?}",
            command.name, unknown_states
        )));
    }

    settings.check_interval()?;
    settings.alert_interval()?;
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeIcinga, MockService, RecordingEvents, TestWorld};
    use crate::types::{PodAlert, PodAlertSpec, Receiver};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn settings(check: &str, vars: &[(&str, &str)], states: &[&str]) -> AlertSettings {
        AlertSettings {
            check: check.to_string(),
            vars: vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            receivers: states
                .iter()
                .map(|s| Receiver {
                    state: s.to_string(),
                    to: vec!["ops@example.com".to_string()],
                    notifier: "Mailgun".to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn message(err: LookoutError) -> String {
        assert!(err.is_validation(), "expected a validation error, got {}", err);
        err.to_string()
    }

    #[test]
    fn test_known_check_with_allowed_vars_and_states() {
        let registry = CheckCommandRegistry::with_builtins();
        let s = settings("node-volume", &[("mountPoint", "/"), ("warning", "80")], &["Critical", "Warning"]);
        let command = check_settings(&registry, AlertKind::NodeAlert, &s).unwrap();
        assert_eq!(command.name, "node-volume");
    }

    #[test]
    fn test_unknown_check() {
        let registry = CheckCommandRegistry::with_builtins();
        let err = check_settings(&registry, AlertKind::ClusterAlert, &settings("no-such-check", &[], &[]));
        assert!(message(err.unwrap_err()).contains("no-such-check"));
    }

    #[test]
    fn test_check_for_other_kind_is_unknown() {
        let registry = CheckCommandRegistry::with_builtins();
        let err = check_settings(&registry, AlertKind::NodeAlert, &settings("pod-status", &[], &[]));
        assert!(err.unwrap_err().is_validation());
    }

    #[test]
    fn test_vars_must_be_a_subset() {
        let registry = CheckCommandRegistry::with_builtins();
        let s = settings("node-volume", &[("mountPoint", "/"), ("color", "red")], &[]);
        let msg = message(check_settings(&registry, AlertKind::NodeAlert, &s).unwrap_err());
        assert!(msg.contains("color"));
        assert!(!msg.contains("mountPoint"));
    }

    #[test]
    fn test_receiver_states_must_be_a_subset() {
        let registry = CheckCommandRegistry::with_builtins();
        let s = settings("pod-status", &[], &["Critical", "Sleepy"]);
        let msg = message(check_settings(&registry, AlertKind::PodAlert, &s).unwrap_err());
        assert!(msg.contains("Sleepy"));
    }

    #[test]
    fn test_bad_interval() {
        let registry = CheckCommandRegistry::with_builtins();
        let mut s = settings("pod-status", &[], &[]);
        s.alert_interval = Some("every now and then".to_string());
        assert!(check_settings(&registry, AlertKind::PodAlert, &s).unwrap_err().is_validation());
    }

    fn pod_alert(selector: LabelSelector, secret: Option<&str>) -> PodAlert {
        let mut alert = PodAlert::new(
            "web-status",
            PodAlertSpec {
                pod_name: None,
                selector: Some(selector),
                alert: AlertSettings {
                    notifier_secret_name: secret.map(str::to_string),
                    ..settings("pod-status", &[], &["Critical"])
                },
            },
        );
        alert.metadata.namespace = Some("default".to_string());
        alert
    }

    fn web() -> LabelSelector {
        LabelSelector {
            match_labels: Some(BTreeMap::from([("app".to_string(), "web".to_string())])),
            ..Default::default()
        }
    }

    fn context(mock: MockService) -> Context {
        TestWorld::default().context(
            mock.into_client(),
            Arc::new(FakeIcinga::new()),
            Arc::new(RecordingEvents::default()),
        )
    }

    #[tokio::test]
    async fn test_malformed_selector() {
        let ctx = context(MockService::new());
        let selector = LabelSelector {
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "app".to_string(),
                operator: "Near".to_string(),
                values: None,
            }]),
            ..Default::default()
        };
        assert!(validate(&ctx, &pod_alert(selector, None)).await.unwrap_err().is_validation());
    }

    #[test]
    fn test_check_object() {
        assert!(check_object(&pod_alert(web(), None)).is_ok());

        let mut both = pod_alert(web(), None);
        both.spec.pod_name = Some("web-0".to_string());
        assert!(check_object(&both).unwrap_err().is_validation());

        let mut bad_interval = pod_alert(web(), None);
        bad_interval.spec.alert.check_interval = Some("soon".to_string());
        assert!(check_object(&bad_interval).unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_missing_notifier_secret() {
        let ctx = context(MockService::new());
        let err = validate(&ctx, &pod_alert(web(), Some("mailgun"))).await.unwrap_err();
        assert!(message(err).contains("default/mailgun"));
    }

    #[tokio::test]
    async fn test_existing_notifier_secret() {
        let secret = serde_json::json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {"name": "mailgun", "namespace": "default"},
            "data": {"apiKey": "c2VjcmV0"}
        })
        .to_string();
        let ctx = context(MockService::new().on_get("/api/v1/namespaces/default/secrets/mailgun", 200, &secret));
        assert!(validate(&ctx, &pod_alert(web(), Some("mailgun"))).await.is_ok());
    }

    #[tokio::test]
    async fn test_secret_lookup_failure_is_transient() {
        let status = serde_json::json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "message": "etcd timeout",
            "reason": "InternalError",
            "code": 500
        })
        .to_string();
        let ctx = context(MockService::new().on_get("/api/v1/namespaces/default/secrets/", 500, &status));
        let err = validate(&ctx, &pod_alert(web(), Some("mailgun"))).await.unwrap_err();
        assert!(!err.is_validation());
    }
}
