// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Watch plumbing: informers feeding deduplicating work queues.

pub mod informer;
pub mod queue;

pub use informer::{EventHandler, Informer};
pub use queue::{run_workers, RetryPolicy, WorkQueue};
