// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD registration and event publishing.

pub mod crd;
pub mod events;

pub use crd::register_crds;
pub use events::{EventPublisher, KubeEventPublisher};
