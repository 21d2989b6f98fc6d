// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reconcilers draining the work queues, and the watch handlers feeding them.

pub mod adapter;
pub mod alert;
pub mod context;
pub mod gc;
pub mod handlers;
pub mod namespace;
pub mod plugin;
pub mod target;
pub mod validation;

pub use adapter::EngineHostAdapter;
pub use context::{AlertStores, CachedAlert, Context, Queues, Tombstones};
pub use gc::IncidentCollector;
