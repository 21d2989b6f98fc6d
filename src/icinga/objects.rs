// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Icinga object payloads.

use crate::constants::icinga::{HOST_TEMPLATE, NOTIFICATION_TEMPLATE, PLUGIN_TEMPLATE};
use crate::types::{AlertKind, Receiver};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

pub type Attrs = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    Host,
    Service,
    Notification,
    CheckCommand,
}

impl ObjectType {
    /// URL segment under `/v1/objects`
    pub fn path(&self) -> &'static str {
        match self {
            ObjectType::Host => "hosts",
            ObjectType::Service => "services",
            ObjectType::Notification => "notifications",
            ObjectType::CheckCommand => "checkcommands",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Body of an object create request
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct IcingaObject {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<String>,
    #[serde(default)]
    pub attrs: Attrs,
}

pub fn host(kind: AlertKind, address: &str) -> IcingaObject {
    let check_command = match kind {
        AlertKind::ClusterAlert => "dummy",
        AlertKind::NodeAlert | AlertKind::PodAlert => "hostalive",
    };
    let mut attrs = Attrs::new();
    attrs.insert("address".to_string(), json!(address));
    attrs.insert("check_command".to_string(), json!(check_command));
    IcingaObject {
        templates: vec![HOST_TEMPLATE.to_string()],
        attrs,
    }
}

/// Whole seconds to send, `None` when the interval rounds down to zero
fn interval_secs(interval: Duration) -> Option<u64> {
    Some(interval.as_secs()).filter(|secs| *secs > 0)
}

/// Complete service attributes; a zero interval leaves Icinga's default in place.
///
/// `vars` is sent as one dictionary so an update replaces the whole map instead of
/// merging into it.
pub fn service_attrs(check: &str, check_interval: Duration, vars: &BTreeMap<String, String>) -> Attrs {
    let mut attrs = Attrs::new();
    attrs.insert("check_command".to_string(), json!(check));
    if let Some(secs) = interval_secs(check_interval) {
        attrs.insert("check_interval".to_string(), json!(secs));
    }
    attrs.insert("vars".to_string(), json!(vars));
    attrs
}

/// Complete notification attributes; a zero interval leaves Icinga's default in place
pub fn notification_attrs(alert_interval: Duration, user: &str, receivers: &[Receiver]) -> Attrs {
    let mut attrs = Attrs::new();
    if let Some(secs) = interval_secs(alert_interval) {
        attrs.insert("interval".to_string(), json!(secs));
    }
    attrs.insert("users".to_string(), json!([user]));
    attrs.insert("vars".to_string(), json!({ "receivers": receivers }));
    attrs
}

pub fn notification(attrs: Attrs) -> IcingaObject {
    IcingaObject {
        templates: vec![NOTIFICATION_TEMPLATE.to_string()],
        attrs,
    }
}

/// Check command running a plugin executable with one `--<var>` argument per variable
pub fn plugin_check_command<'a>(command: &str, vars: impl IntoIterator<Item = &'a String>) -> IcingaObject {
    let arguments: Map<String, Value> = vars
        .into_iter()
        .map(|var| {
            (
                format!("--{}", var),
                json!({ "value": format!("${}$", var), "set_if": format!("${}$", var) }),
            )
        })
        .collect();

    let mut attrs = Attrs::new();
    attrs.insert("command".to_string(), json!([command]));
    attrs.insert("arguments".to_string(), Value::Object(arguments));
    IcingaObject {
        templates: vec![PLUGIN_TEMPLATE.to_string()],
        attrs,
    }
}
