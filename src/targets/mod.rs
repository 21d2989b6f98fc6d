// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Mapping from alerts to the Kubernetes objects they monitor and the Icinga hosts
//! standing in for them.

pub mod claims;
pub mod identity;
pub mod resolver;
pub mod selector;

pub use identity::HostIdentity;
pub use resolver::{Target, TargetRef, TargetResolver};
