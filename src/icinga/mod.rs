// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Icinga2 API access: connection settings, client and object payloads.

pub mod client;
pub mod config;
pub mod objects;

pub use client::{wait_for_icinga, IcingaApi, IcingaClient};
pub use config::IcingaConfig;
pub use objects::{Attrs, IcingaObject, ObjectType};
