// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deduplicating work queue of object keys with per-key retry tracking.
//!
//! A key is handed to at most one worker at a time. Keys added while being processed are
//! parked and handed out again once the worker calls [`WorkQueue::done`].

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Exponential backoff for the given (1-based) attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(300),
        }
    }
}

#[derive(Default)]
struct State {
    queue: VecDeque<String>,
    /// Keys waiting to be processed, whether queued or parked behind an in-flight run
    dirty: HashSet<String>,
    processing: HashSet<String>,
    retries: HashMap<String, u32>,
    shutting_down: bool,
}

struct Inner {
    name: &'static str,
    state: Mutex<State>,
    notify: Notify,
    policy: RetryPolicy,
}

/// Cheap to clone handle to a shared queue
#[derive(Clone)]
pub struct WorkQueue {
    inner: Arc<Inner>,
}

impl WorkQueue {
    pub fn new(name: &'static str, policy: RetryPolicy) -> Self {
        WorkQueue {
            inner: Arc::new(Inner {
                name,
                state: Mutex::new(State::default()),
                notify: Notify::new(),
                policy,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add(&self, key: impl Into<String>) {
        let key = key.into();
        let mut state = self.lock();
        if state.shutting_down || state.dirty.contains(&key) {
            return;
        }
        state.dirty.insert(key.clone());
        if state.processing.contains(&key) {
            return;
        }
        debug!(queue = self.inner.name, key = %key, "Enqueued");
        state.queue.push_back(key);
        drop(state);
        self.inner.notify.notify_one();
    }

    /// Next key to process, `None` once the queue shuts down or the token is cancelled
    pub async fn get(&self, token: &CancellationToken) -> Option<String> {
        loop {
            {
                let mut state = self.lock();
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
                if state.shutting_down {
                    return None;
                }
            }
            tokio::select! {
                _ = token.cancelled() => return None,
                _ = self.inner.notify.notified() => {}
            }
        }
    }

    /// Mark a key as processed, re-queueing it if it was added in the meantime
    pub fn done(&self, key: &str) {
        let mut state = self.lock();
        state.processing.remove(key);
        if state.dirty.contains(key) && !state.shutting_down {
            state.queue.push_back(key.to_string());
            drop(state);
            self.inner.notify.notify_one();
        }
    }

    /// Schedule a retry after the backoff delay, returns false once retries are exhausted
    pub fn retry(&self, key: &str) -> bool {
        let attempt = {
            let mut state = self.lock();
            let attempts = state.retries.entry(key.to_string()).or_insert(0);
            *attempts += 1;
            *attempts
        };
        if attempt > self.inner.policy.max_retries {
            self.forget(key);
            return false;
        }

        let delay = self.inner.policy.delay(attempt);
        debug!(queue = self.inner.name, key, attempt, ?delay, "Scheduling retry");
        let queue = self.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key);
        });
        true
    }

    /// Reset the retry count of a key
    pub fn forget(&self, key: &str) {
        self.lock().retries.remove(key);
    }

    pub fn retries(&self, key: &str) -> u32 {
        self.lock().retries.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shutdown(&self) {
        self.lock().shutting_down = true;
        self.inner.notify.notify_waiters();
    }
}

/// Drain the queue with `workers` concurrent workers until the token is cancelled.
///
/// Failed keys are retried with backoff until the policy's limit; cancellation drops the
/// in-flight reconcile, which aborts any request it is waiting on.
pub async fn run_workers<F, Fut, E>(queue: WorkQueue, workers: usize, token: CancellationToken, reconcile: F)
where
    F: Fn(String) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    info!(queue = queue.name(), workers, "Starting workers");
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let queue = queue.clone();
        let token = token.clone();
        let reconcile = reconcile.clone();
        handles.push(tokio::spawn(async move {
            while let Some(key) = queue.get(&token).await {
                let result = tokio::select! {
                    _ = token.cancelled() => {
                        queue.done(&key);
                        break;
                    }
                    result = reconcile(key.clone()) => result,
                };
                match result {
                    Ok(()) => queue.forget(&key),
                    Err(e) => {
                        if queue.retry(&key) {
                            warn!(queue = queue.name(), key = %key, "Reconcile failed, will retry: {}", e);
                        } else {
                            error!(queue = queue.name(), key = %key, "Reconcile failed, giving up: {}", e);
                        }
                    }
                }
                queue.done(&key);
            }
        }));
    }

    token.cancelled().await;
    queue.shutdown();
    for handle in handles {
        if let Err(e) = handle.await {
            error!(queue = queue.name(), "Worker panicked: {}", e);
        }
    }
    info!(queue = queue.name(), "Workers stopped");
}
