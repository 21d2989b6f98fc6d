// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Icinga host, service and notification names derived from Kubernetes identities.
//!
//! Host names have the form `namespace@kind@object` (`namespace@cluster` for the synthetic
//! cluster host). Kubernetes names are DNS labels or subdomains and never contain `@` or `!`,
//! so splitting on the delimiters recovers every field. Because the name only depends on the
//! identity, hosts can be torn down after the Kubernetes object is already gone.

use crate::error::{LookoutError, Result};
use crate::types::AlertKind;
use std::fmt;

const HOST_DELIMITER: char = '@';
const OBJECT_DELIMITER: char = '!';

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostIdentity {
    pub kind: AlertKind,
    /// Namespace of the alert owning the host
    pub namespace: String,
    /// Targeted object, empty for the cluster host
    pub object_name: String,
}

impl HostIdentity {
    pub fn new(kind: AlertKind, namespace: &str, object_name: &str) -> Result<Self> {
        check_segment("namespace", namespace)?;
        match kind {
            AlertKind::ClusterAlert if !object_name.is_empty() => {
                return Err(LookoutError::InvalidHostName(format!(
                    "cluster host in namespace {} cannot carry object name {}",
                    namespace, object_name
                )));
            }
            AlertKind::ClusterAlert => {}
            _ => check_segment("object name", object_name)?,
        }
        Ok(HostIdentity {
            kind,
            namespace: namespace.to_string(),
            object_name: object_name.to_string(),
        })
    }

    pub fn cluster(namespace: &str) -> Result<Self> {
        Self::new(AlertKind::ClusterAlert, namespace, "")
    }

    /// Icinga host name
    pub fn name(&self) -> String {
        match self.kind {
            AlertKind::ClusterAlert => format!("{}{}{}", self.namespace, HOST_DELIMITER, self.kind.host_kind()),
            _ => format!(
                "{}{}{}{}{}",
                self.namespace,
                HOST_DELIMITER,
                self.kind.host_kind(),
                HOST_DELIMITER,
                self.object_name
            ),
        }
    }

    /// Leading part shared by every host of a kind in a namespace
    pub fn prefix(kind: AlertKind, namespace: &str) -> String {
        format!("{}{}{}", namespace, HOST_DELIMITER, kind.host_kind())
    }

    /// Inverse of [`HostIdentity::name`]
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = || LookoutError::InvalidHostName(name.to_string());
        let mut parts = name.splitn(3, HOST_DELIMITER);
        let namespace = parts.next().ok_or_else(invalid)?;
        let kind = parts
            .next()
            .and_then(AlertKind::from_host_kind)
            .ok_or_else(invalid)?;
        let object_name = parts.next();

        match (kind, object_name) {
            (AlertKind::ClusterAlert, None) => Self::new(kind, namespace, ""),
            (AlertKind::ClusterAlert, Some(_)) | (_, None) => Err(invalid()),
            (_, Some(object_name)) => Self::new(kind, namespace, object_name).map_err(|_| invalid()),
        }
    }

    /// Icinga service name for the given alert on this host
    pub fn service_name(&self, alert_name: &str) -> String {
        format!("{}{}{}", self.name(), OBJECT_DELIMITER, alert_name)
    }

    /// Icinga notification name for the given alert's service on this host
    pub fn notification_name(&self, alert_name: &str) -> String {
        format!("{}{}{}", self.service_name(alert_name), OBJECT_DELIMITER, alert_name)
    }
}

impl fmt::Display for HostIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

fn check_segment(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(LookoutError::InvalidHostName(format!("{} must not be empty", what)));
    }
    if value.contains(HOST_DELIMITER) || value.contains(OBJECT_DELIMITER) {
        return Err(LookoutError::InvalidHostName(format!(
            "{} '{}' contains a reserved character",
            what, value
        )));
    }
    Ok(())
}
