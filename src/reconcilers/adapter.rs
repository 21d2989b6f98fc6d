// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Icinga objects for one alert on one host.
//!
//! Every alert/host pair owns a service named `host!alert` and a notification named
//! `host!alert!alert`. Hosts are shared between alerts of the same namespace and are only
//! removed once their last service is gone.

use crate::error::Result;
use crate::icinga::objects::{self, IcingaObject};
use crate::icinga::{Attrs, IcingaApi, ObjectType};
use crate::targets::{HostIdentity, Target};
use crate::types::{AlertKind, AlertSettings};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct EngineHostAdapter {
    kind: AlertKind,
    icinga: Arc<dyn IcingaApi>,
    notifier_user: String,
}

impl EngineHostAdapter {
    pub fn new(kind: AlertKind, icinga: Arc<dyn IcingaApi>, notifier_user: &str) -> Self {
        EngineHostAdapter {
            kind,
            icinga,
            notifier_user: notifier_user.to_string(),
        }
    }

    /// Create or fully update the service and notification for the target
    #[instrument(skip(self, settings, target), fields(kind = %self.kind, host = %target.identity))]
    pub async fn apply(&self, alert_name: &str, settings: &AlertSettings, target: &Target) -> Result<()> {
        let host = target.identity.name();
        let service = target.identity.service_name(alert_name);
        let notification = target.identity.notification_name(alert_name);

        let service_attrs = objects::service_attrs(&settings.check, settings.check_interval()?, &settings.vars);
        let notification_attrs =
            objects::notification_attrs(settings.alert_interval()?, &self.notifier_user, &settings.receivers);

        if self.icinga.exists(ObjectType::Service, &service).await? {
            debug!("Updating service {}", service);
            let mut host_attrs = Attrs::new();
            host_attrs.insert("address".to_string(), json!(target.address));
            self.icinga.update(ObjectType::Host, &host, &host_attrs).await?;
            self.icinga.update(ObjectType::Service, &service, &service_attrs).await?;
            match self
                .icinga
                .update(ObjectType::Notification, &notification, &notification_attrs)
                .await
            {
                Err(e) if e.is_not_found() => {
                    debug!("Notification {} missing, recreating", notification);
                    self.icinga
                        .create(
                            ObjectType::Notification,
                            &notification,
                            &objects::notification(notification_attrs),
                        )
                        .await?;
                }
                result => result?,
            }
            return Ok(());
        }

        if !self.icinga.exists(ObjectType::Host, &host).await? {
            debug!("Creating host {}", host);
            self.icinga
                .create(ObjectType::Host, &host, &objects::host(self.kind, &target.address))
                .await?;
        }
        debug!("Creating service {}", service);
        self.icinga
            .create(
                ObjectType::Service,
                &service,
                &IcingaObject {
                    templates: vec![],
                    attrs: service_attrs,
                },
            )
            .await?;
        self.icinga
            .create(
                ObjectType::Notification,
                &notification,
                &objects::notification(notification_attrs),
            )
            .await
    }

    /// Stop checking without giving up the host
    #[instrument(skip(self), fields(kind = %self.kind, host = %host))]
    pub async fn pause(&self, alert_name: &str, host: &HostIdentity) -> Result<()> {
        self.icinga
            .delete(ObjectType::Notification, &host.notification_name(alert_name))
            .await?;
        self.icinga
            .delete(ObjectType::Service, &host.service_name(alert_name))
            .await
    }

    /// Remove the alert's objects from the host, and the host once nothing else uses it
    #[instrument(skip(self), fields(kind = %self.kind, host = %host))]
    pub async fn delete(&self, alert_name: &str, host: &HostIdentity) -> Result<()> {
        self.icinga
            .delete(ObjectType::Service, &host.service_name(alert_name))
            .await?;

        let name = host.name();
        let remaining = self.icinga.host_services(&name).await?;
        if remaining.is_empty() {
            debug!("Deleting host {}", name);
            self.icinga.delete(ObjectType::Host, &name).await?;
        } else {
            debug!("Keeping host {}, still used by {:?}", name, remaining);
        }
        Ok(())
    }

    /// Delete on every host, attempting all of them before reporting the first failure
    pub async fn delete_all(&self, alert_name: &str, hosts: &[HostIdentity]) -> Result<()> {
        let mut first_error = None;
        for host in hosts {
            if let Err(e) = self.delete(alert_name, host).await {
                warn!("Failed to delete {} from {}: {}", alert_name, host, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
