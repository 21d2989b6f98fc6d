// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Watch streams feeding a reflector store and add/update/delete callbacks.
//!
//! The previous version of an object is read from the store before the event is applied,
//! so handlers can compare old and new. After a relist, objects that disappeared while the
//! watch was down are reported as deletes.

use futures::StreamExt;
use kube::runtime::reflector::{self, ObjectRef, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Resource};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Callbacks invoked for every change seen by an [`Informer`]. They run on the watch task
/// and must not block; handlers only enqueue keys.
pub trait EventHandler<K>: Send + Sync {
    fn on_add(&self, obj: &K);
    fn on_update(&self, old: &K, new: &K);
    fn on_delete(&self, obj: &K);
}

/// Applies watcher events to the store and translates them into handler callbacks
pub struct Dispatcher<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    writer: reflector::store::Writer<K>,
    store: Store<K>,
    relisted: Vec<K>,
}

impl<K> Dispatcher<K>
where
    K: Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static,
    ObjectRef<K>: Hash + Eq,
{
    pub fn new() -> Self {
        let (store, writer) = reflector::store();
        Dispatcher {
            writer,
            store,
            relisted: vec![],
        }
    }

    pub fn store(&self) -> Store<K> {
        self.store.clone()
    }

    pub fn dispatch(&mut self, event: watcher::Event<K>, handler: &dyn EventHandler<K>) {
        match &event {
            watcher::Event::Apply(obj) => {
                let old = self.store.get(&ObjectRef::from_obj(obj));
                self.writer.apply_watcher_event(&event);
                match old {
                    Some(old) => handler.on_update(&old, obj),
                    None => handler.on_add(obj),
                }
            }
            watcher::Event::Delete(obj) => {
                self.writer.apply_watcher_event(&event);
                handler.on_delete(obj);
            }
            watcher::Event::Init => {
                self.relisted.clear();
                self.writer.apply_watcher_event(&event);
            }
            watcher::Event::InitApply(obj) => {
                // Buffered by the writer until InitDone swaps the whole store
                self.relisted.push(obj.clone());
                self.writer.apply_watcher_event(&event);
            }
            watcher::Event::InitDone => {
                let previous = self.store.state();
                self.writer.apply_watcher_event(&event);
                let relisted = std::mem::take(&mut self.relisted);

                let seen: HashSet<ObjectRef<K>> = relisted.iter().map(ObjectRef::from_obj).collect();
                for obj in &relisted {
                    match previous.iter().find(|o| ObjectRef::from_obj(o.as_ref()) == ObjectRef::from_obj(obj)) {
                        Some(old) => handler.on_update(old, obj),
                        None => handler.on_add(obj),
                    }
                }
                for gone in previous.iter().filter(|o| !seen.contains(&ObjectRef::from_obj(o.as_ref()))) {
                    debug!("Object {} vanished during relist", ObjectRef::from_obj(gone.as_ref()));
                    handler.on_delete(gone);
                }
            }
        }
    }
}

impl<K> Default for Dispatcher<K>
where
    K: Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static,
    ObjectRef<K>: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A watch on one resource type with a local cache
pub struct Informer<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    api: Api<K>,
    config: watcher::Config,
    dispatcher: Dispatcher<K>,
}

impl<K> Informer<K>
where
    K: Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned + Send + Sync + 'static,
    ObjectRef<K>: Hash + Eq,
{
    pub fn new(api: Api<K>) -> Self {
        Informer {
            api,
            config: watcher::Config::default().any_semantic(),
            dispatcher: Dispatcher::new(),
        }
    }

    pub fn store(&self) -> Store<K> {
        self.dispatcher.store()
    }

    /// Watch until the token is cancelled. Watch errors are logged and retried with backoff.
    pub async fn run(mut self, handler: Arc<dyn EventHandler<K>>, token: CancellationToken) {
        let kind = K::kind(&()).to_string();
        info!("Starting {} informer", kind);

        let stream = watcher(self.api, self.config).default_backoff();
        futures::pin_mut!(stream);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                next = stream.next() => match next {
                    Some(Ok(event)) => self.dispatcher.dispatch(event, handler.as_ref()),
                    Some(Err(e)) => warn!("{} watch failed: {}", kind, e),
                    None => break,
                },
            }
        }
        info!("{} informer stopped", kind);
    }
}
