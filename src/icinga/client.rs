// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! HTTP client for the Icinga2 object API.

use crate::constants::icinga::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS};
use crate::error::{LookoutError, Result};
use crate::icinga::config::IcingaConfig;
use crate::icinga::objects::{Attrs, IcingaObject, ObjectType};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// The subset of the Icinga API the reconcilers need. Every call is idempotent on the
/// Icinga side, so implementations need no client side locking.
#[async_trait]
pub trait IcingaApi: Send + Sync {
    /// Succeeds when the API answers and accepts our credentials
    async fn status(&self) -> Result<()>;

    async fn exists(&self, object_type: ObjectType, name: &str) -> Result<bool>;

    async fn create(&self, object_type: ObjectType, name: &str, object: &IcingaObject) -> Result<()>;

    /// Replace the given attributes; fails with a 404 error when the object is missing
    async fn update(&self, object_type: ObjectType, name: &str, attrs: &Attrs) -> Result<()>;

    /// Delete with cascade, a missing object counts as deleted
    async fn delete(&self, object_type: ObjectType, name: &str) -> Result<()>;

    /// Names of the services attached to a host
    async fn host_services(&self, host: &str) -> Result<Vec<String>>;

    /// Names of the hosts starting with `host_prefix` that carry a service named `service`
    async fn service_hosts(&self, service: &str, host_prefix: &str) -> Result<Vec<String>>;
}

#[derive(Deserialize)]
struct QueryResults {
    #[serde(default)]
    results: Vec<QueryResult>,
}

#[derive(Deserialize)]
struct QueryResult {
    name: String,
    #[serde(default)]
    attrs: QueryAttrs,
}

#[derive(Deserialize, Default)]
struct QueryAttrs {
    host_name: Option<String>,
}

pub struct IcingaClient {
    http: reqwest::Client,
    endpoint: Url,
    username: String,
    password: String,
}

impl IcingaClient {
    pub fn new(config: &IcingaConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let mut builder = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90));

        if let Some(ca_file) = &config.ca_cert_file {
            let pem = std::fs::read(ca_file)?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }
        if config.insecure_skip_verify {
            warn!("TLS verification of the Icinga API is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(IcingaClient {
            http: builder.build()?,
            endpoint: config.endpoint.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| LookoutError::ConfigError(format!("{} cannot be a base URL", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn object_url(&self, object_type: ObjectType, name: &str) -> Result<Url> {
        self.url(&["v1", "objects", object_type.path(), name])
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
    }
}

/// Turn a non-2xx response into an error carrying Icinga's status text
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(LookoutError::IcingaError {
        status: status.as_u16(),
        message: error_message(&message),
    })
}

fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        status: Option<String>,
        results: Option<Vec<ErrorResult>>,
    }
    #[derive(Deserialize)]
    struct ErrorResult {
        status: Option<String>,
        #[serde(default)]
        errors: Vec<String>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { status: Some(status), .. }) => status,
        Ok(ErrorBody {
            results: Some(results),
            ..
        }) => results
            .into_iter()
            .flat_map(|r| r.status.into_iter().chain(r.errors))
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.trim().to_string(),
    }
}

#[async_trait]
impl IcingaApi for IcingaClient {
    async fn status(&self) -> Result<()> {
        let url = self.url(&["v1", "status"])?;
        check(self.request(Method::GET, url).send().await?).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn exists(&self, object_type: ObjectType, name: &str) -> Result<bool> {
        let url = self.object_url(object_type, name)?;
        let response = self.request(Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response).await?;
        Ok(true)
    }

    #[instrument(skip(self, object))]
    async fn create(&self, object_type: ObjectType, name: &str, object: &IcingaObject) -> Result<()> {
        debug!("Creating Icinga {} {}", object_type, name);
        let url = self.object_url(object_type, name)?;
        check(self.request(Method::PUT, url).json(object).send().await?).await?;
        Ok(())
    }

    #[instrument(skip(self, attrs))]
    async fn update(&self, object_type: ObjectType, name: &str, attrs: &Attrs) -> Result<()> {
        debug!("Updating Icinga {} {}", object_type, name);
        let url = self.object_url(object_type, name)?;
        let body = json!({ "attrs": attrs });
        check(self.request(Method::POST, url).json(&body).send().await?).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, object_type: ObjectType, name: &str) -> Result<()> {
        debug!("Deleting Icinga {} {}", object_type, name);
        let mut url = self.object_url(object_type, name)?;
        url.query_pairs_mut().append_pair("cascade", "1");
        let response = self.request(Method::DELETE, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Icinga {} {} already gone", object_type, name);
            return Ok(());
        }
        check(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn host_services(&self, host: &str) -> Result<Vec<String>> {
        let url = self.url(&["v1", "objects", ObjectType::Service.path()])?;
        let body = json!({
            "filter": "host.name==host_name",
            "filter_vars": { "host_name": host },
            "attrs": ["name"],
        });
        // Icinga only accepts a filter body on GET through the method override
        let response = self
            .request(Method::POST, url)
            .header("X-HTTP-Method-Override", "GET")
            .json(&body)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(vec![]);
        }
        let results: QueryResults = check(response).await?.json().await?;
        Ok(results.results.into_iter().map(|r| r.name).collect())
    }

    #[instrument(skip(self))]
    async fn service_hosts(&self, service: &str, host_prefix: &str) -> Result<Vec<String>> {
        let url = self.url(&["v1", "objects", ObjectType::Service.path()])?;
        let body = service_hosts_query(service, host_prefix);
        let response = self
            .request(Method::POST, url)
            .header("X-HTTP-Method-Override", "GET")
            .json(&body)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(vec![]);
        }
        let results: QueryResults = check(response).await?.json().await?;
        Ok(results
            .results
            .into_iter()
            .filter_map(|r| r.attrs.host_name.or_else(|| host_of(&r.name, service)))
            .collect())
    }
}

fn service_hosts_query(service: &str, host_prefix: &str) -> serde_json::Value {
    json!({
        "filter": "service.name==service_name && match(host_pattern, service.host_name)",
        "filter_vars": {
            "service_name": service,
            "host_pattern": format!("{}*", host_prefix),
        },
        "attrs": ["host_name"],
    })
}

/// Host part of a full `host!service` name
fn host_of(full_name: &str, service: &str) -> Option<String> {
    full_name
        .strip_suffix(service)
        .and_then(|rest| rest.strip_suffix('!'))
        .map(str::to_string)
}

/// Block until the Icinga API answers, backing off exponentially between attempts
pub async fn wait_for_icinga(icinga: &dyn IcingaApi, token: &CancellationToken) -> Result<()> {
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match icinga.status().await {
            Ok(()) => {
                info!("Icinga API is reachable");
                return Ok(());
            }
            Err(e) => {
                warn!(
                    "Icinga API not reachable: {}, retrying in {} seconds...",
                    e, interval
                );
            }
        }

        tokio::select! {
            _ = token.cancelled() => {
                return Err(LookoutError::ConfigError("shutdown while waiting for Icinga".to_string()));
            }
            _ = sleep(Duration::from_secs(interval)) => {}
        }

        // Exponential backoff with max cap
        interval = (interval * 2).min(POLL_MAX_INTERVAL_SECS);
    }
}
