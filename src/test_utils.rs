// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mock Kubernetes API, an in-memory Icinga and object fixtures.

use crate::checks::CheckCommandRegistry;
use crate::config::Config;
use crate::error::{LookoutError, Result};
use crate::icinga::{Attrs, IcingaApi, IcingaObject, ObjectType};
use crate::kubernetes::EventPublisher;
use crate::reconcilers::context::{AlertStores, Context, Queues, Tombstones};
use crate::targets::TargetResolver;
use crate::types::{CheckPlugin, ClusterAlert, NodeAlert, PodAlert};
use async_trait::async_trait;
use http::{Request, Response};
use http_body_util::BodyExt;
use k8s_openapi::api::core::v1::{
    Namespace, Node, NodeAddress, NodeStatus, ObjectReference, Pod, PodStatus,
};
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::runtime::events::EventType;
use kube::runtime::reflector::{self, store::Writer, Store};
use kube::runtime::watcher;
use kube::{Client, Resource};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context as TaskContext, Poll};
use tower::Service;

type Recorded = Arc<Mutex<Vec<(String, String, String)>>>;

/// A mock HTTP service that returns predefined responses based on request paths
/// and records every request it receives.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Recorded,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(vec![])),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for GET requests matching the path or path prefix
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Path and body of every request made with the given method, in order
    pub fn requests(&self, method: &str) -> Vec<(String, String)> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _, _)| m == method)
            .map(|(_, path, body)| (path.clone(), body.clone()))
            .collect()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "https://kubernetes.default.svc")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Longest prefix wins, e.g. /pods/web-0 over /pods/
        responses
            .iter()
            .filter(|((m, p), _)| m == method && path.starts_with(p.as_str()))
            .max_by_key(|((_, p), _)| p.len())
            .map(|(_, resp)| resp.clone())
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let response = self.find_response(&method, &path);
        let requests = self.requests.clone();

        Box::pin(async move {
            let body = req.into_body().collect().await?.to_bytes();
            requests
                .lock()
                .unwrap()
                .push((method, path, String::from_utf8_lossy(&body).to_string()));

            let (status, body) = response.unwrap_or_else(|| (404, not_found_json("object", "unknown")));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

fn labels(pairs: &[(&str, &str)]) -> Option<BTreeMap<String, String>> {
    if pairs.is_empty() {
        return None;
    }
    Some(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
}

pub fn make_pod(namespace: &str, name: &str, label_pairs: &[(&str, &str)], ip: Option<&str>) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: labels(label_pairs),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        status: Some(PodStatus {
            pod_ip: ip.map(str::to_string),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn make_node(name: &str, label_pairs: &[(&str, &str)], internal_ip: &str) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: labels(label_pairs),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        status: Some(NodeStatus {
            addresses: Some(vec![
                NodeAddress {
                    type_: "Hostname".to_string(),
                    address: name.to_string(),
                },
                NodeAddress {
                    type_: "InternalIP".to_string(),
                    address: internal_ip.to_string(),
                },
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn make_namespace(name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Set a claims annotation on any object
pub fn with_claims<K: Resource>(mut obj: K, annotation: &str, value: &str) -> K {
    obj.meta_mut()
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(annotation.to_string(), value.to_string());
    obj
}

/// A ready reflector store holding the given objects, plus its writer for later changes
pub fn store_with<K>(objects: Vec<K>) -> (Store<K>, Writer<K>)
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    let (store, mut writer) = reflector::store();
    writer.apply_watcher_event(&watcher::Event::Init);
    for obj in objects {
        writer.apply_watcher_event(&watcher::Event::InitApply(obj));
    }
    writer.apply_watcher_event(&watcher::Event::InitDone);
    (store, writer)
}

pub fn stores_with(
    pods: Vec<Pod>,
    nodes: Vec<Node>,
    namespaces: Vec<Namespace>,
) -> (Store<Pod>, Store<Node>, Store<Namespace>) {
    (store_with(pods).0, store_with(nodes).0, store_with(namespaces).0)
}

/// In-memory Icinga recording every mutating call as `<verb> <type> <name>`
#[derive(Default)]
pub struct FakeIcinga {
    objects: Mutex<BTreeMap<(ObjectType, String), IcingaObject>>,
    calls: Mutex<Vec<String>>,
    unavailable: AtomicBool,
}

impl FakeIcinga {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the API were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Names of stored objects of a type, sorted
    pub fn names(&self, object_type: ObjectType) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(t, _)| *t == object_type)
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn get(&self, object_type: ObjectType, name: &str) -> Option<IcingaObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(object_type, name.to_string()))
            .cloned()
    }

    pub fn insert(&self, object_type: ObjectType, name: &str, object: IcingaObject) {
        self.objects
            .lock()
            .unwrap()
            .insert((object_type, name.to_string()), object);
    }

    fn record(&self, verb: &str, object_type: ObjectType, name: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {} {}", verb, object_type, name));
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LookoutError::IcingaError {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl IcingaApi for FakeIcinga {
    async fn status(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LookoutError::IcingaError {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn exists(&self, object_type: ObjectType, name: &str) -> Result<bool> {
        self.record("get", object_type, name)?;
        Ok(self.get(object_type, name).is_some())
    }

    async fn create(&self, object_type: ObjectType, name: &str, object: &IcingaObject) -> Result<()> {
        self.record("create", object_type, name)?;
        let mut objects = self.objects.lock().unwrap();
        let key = (object_type, name.to_string());
        if objects.contains_key(&key) {
            return Err(LookoutError::IcingaError {
                status: 500,
                message: "Object already exists.".to_string(),
            });
        }
        objects.insert(key, object.clone());
        Ok(())
    }

    async fn update(&self, object_type: ObjectType, name: &str, attrs: &Attrs) -> Result<()> {
        self.record("update", object_type, name)?;
        let mut objects = self.objects.lock().unwrap();
        match objects.get_mut(&(object_type, name.to_string())) {
            Some(object) => {
                object.attrs.extend(attrs.clone());
                Ok(())
            }
            None => Err(LookoutError::IcingaError {
                status: 404,
                message: "No objects found.".to_string(),
            }),
        }
    }

    async fn delete(&self, object_type: ObjectType, name: &str) -> Result<()> {
        self.record("delete", object_type, name)?;
        let prefix = format!("{}!", name);
        let mut objects = self.objects.lock().unwrap();
        objects.retain(|(t, n), _| {
            let cascaded = match object_type {
                ObjectType::Host => *t != ObjectType::CheckCommand && n.starts_with(&prefix),
                ObjectType::Service => *t == ObjectType::Notification && n.starts_with(&prefix),
                _ => false,
            };
            !(cascaded || (*t == object_type && n == name))
        });
        Ok(())
    }

    async fn host_services(&self, host: &str) -> Result<Vec<String>> {
        self.record("list", ObjectType::Service, host)?;
        let prefix = format!("{}!", host);
        Ok(self
            .names(ObjectType::Service)
            .into_iter()
            .filter(|n| n.starts_with(&prefix))
            .collect())
    }

    async fn service_hosts(&self, service: &str, host_prefix: &str) -> Result<Vec<String>> {
        self.record("query", ObjectType::Service, service)?;
        let suffix = format!("!{}", service);
        Ok(self
            .names(ObjectType::Service)
            .into_iter()
            .filter_map(|n| n.strip_suffix(&suffix).map(str::to_string))
            .filter(|host| host.starts_with(host_prefix))
            .collect())
    }
}

#[derive(Clone, Debug)]
pub struct RecordedEvent {
    pub object: String,
    pub type_: EventType,
    pub reason: String,
    pub note: Option<String>,
}

/// Event publisher keeping every event in memory
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEvents {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn reasons(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.reason).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingEvents {
    async fn publish(
        &self,
        object: &ObjectReference,
        type_: EventType,
        reason: &str,
        _action: &str,
        note: Option<String>,
    ) {
        self.events.lock().unwrap().push(RecordedEvent {
            object: format!(
                "{}/{}",
                object.namespace.clone().unwrap_or_default(),
                object.name.clone().unwrap_or_default()
            ),
            type_,
            reason: reason.to_string(),
            note,
        });
    }
}

/// Cluster contents behind a test [`Context`]
#[derive(Default)]
pub struct TestWorld {
    pub pods: Vec<Pod>,
    pub nodes: Vec<Node>,
    pub namespaces: Vec<Namespace>,
    pub cluster_alerts: Vec<ClusterAlert>,
    pub node_alerts: Vec<NodeAlert>,
    pub pod_alerts: Vec<PodAlert>,
    pub plugins: Vec<CheckPlugin>,
}

impl TestWorld {
    pub fn context(self, client: Client, icinga: Arc<FakeIcinga>, events: Arc<RecordingEvents>) -> Context {
        let (pods, nodes, namespaces) = stores_with(self.pods, self.nodes, self.namespaces);
        Context {
            client,
            icinga,
            registry: Arc::new(CheckCommandRegistry::with_builtins()),
            resolver: TargetResolver::new(pods, nodes, namespaces),
            alerts: AlertStores {
                cluster: store_with(self.cluster_alerts).0,
                node: store_with(self.node_alerts).0,
                pod: store_with(self.pod_alerts).0,
            },
            plugins: store_with(self.plugins).0,
            events,
            queues: Queues::new(&Config::default()),
            pod_tombstones: Tombstones::new(),
            node_tombstones: Tombstones::new(),
            notifier_user: "lookout".to_string(),
        }
    }
}

/// Place a freshly built custom resource in a namespace, as the API server would return it
pub fn in_namespace<K: Resource>(mut obj: K, namespace: &str) -> K {
    let meta = obj.meta_mut();
    meta.namespace = Some(namespace.to_string());
    meta.generation = Some(1);
    meta.resource_version = Some("1".to_string());
    meta.uid = Some(format!("uid-{}", meta.name.clone().unwrap_or_default()));
    obj
}
