// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Check commands alerts can run.

pub mod builtin;
pub mod registry;

pub use registry::{BuiltinConflict, CheckCommand, CheckCommandRegistry};
