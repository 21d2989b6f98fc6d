// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Process wide registry of the check commands alerts may reference.

use crate::checks::builtin;
use crate::types::{AlertKind, CheckPlugin};
use kube::ResourceExt;
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;
use tracing::{debug, warn};

/// A check command and the variables and states it understands
#[derive(Clone, Debug, PartialEq)]
pub struct CheckCommand {
    pub name: String,
    pub kinds: BTreeSet<AlertKind>,
    pub vars: BTreeSet<String>,
    pub states: BTreeSet<String>,
    /// Executable for plugin checks, `None` for commands shipped with the Icinga image
    pub plugin_command: Option<String>,
}

impl CheckCommand {
    pub fn builtin(name: &str, kinds: &[AlertKind], vars: &[&str], states: &[&str]) -> Self {
        CheckCommand {
            name: name.to_string(),
            kinds: kinds.iter().copied().collect(),
            vars: vars.iter().map(|v| v.to_string()).collect(),
            states: states.iter().map(|s| s.to_string()).collect(),
            plugin_command: None,
        }
    }

    pub fn from_plugin(plugin: &CheckPlugin) -> Self {
        CheckCommand {
            name: plugin.name_any(),
            kinds: plugin.spec.alert_kinds.iter().copied().collect(),
            vars: plugin.spec.vars.iter().cloned().collect(),
            states: plugin.spec.states.iter().cloned().collect(),
            plugin_command: Some(plugin.spec.command.clone()),
        }
    }

    pub fn is_plugin(&self) -> bool {
        self.plugin_command.is_some()
    }

    pub fn supports(&self, kind: AlertKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Error returned when a plugin tries to replace a built-in check
#[derive(Debug, PartialEq)]
pub struct BuiltinConflict(pub String);

/// Check commands keyed by name. Callers only ever receive clones.
#[derive(Debug, Default)]
pub struct CheckCommandRegistry {
    commands: RwLock<HashMap<String, CheckCommand>>,
}

impl CheckCommandRegistry {
    /// Registry pre-populated with the built-in checks
    pub fn with_builtins() -> Self {
        let registry = Self::default();
        {
            let mut commands = registry.write();
            for command in builtin::commands() {
                commands.insert(command.name.clone(), command);
            }
        }
        registry
    }

    /// Command usable by the given alert kind
    pub fn get(&self, kind: AlertKind, name: &str) -> Option<CheckCommand> {
        self.read().get(name).filter(|c| c.supports(kind)).cloned()
    }

    /// Register or replace a plugin command. Built-in commands cannot be replaced.
    pub fn set(&self, command: CheckCommand) -> Result<(), BuiltinConflict> {
        let mut commands = self.write();
        if let Some(existing) = commands.get(&command.name) {
            if !existing.is_plugin() {
                return Err(BuiltinConflict(command.name));
            }
        }
        debug!("Registering check command {}", command.name);
        commands.insert(command.name.clone(), command);
        Ok(())
    }

    /// Remove a plugin command, built-ins are left alone
    pub fn delete(&self, name: &str) -> Option<CheckCommand> {
        let mut commands = self.write();
        match commands.get(name) {
            Some(c) if c.is_plugin() => {
                debug!("Unregistering check command {}", name);
                commands.remove(name)
            }
            _ => None,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, CheckCommand>> {
        self.commands.read().unwrap_or_else(|poisoned| {
            warn!("Check command registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, CheckCommand>> {
        self.commands.write().unwrap_or_else(|poisoned| {
            warn!("Check command registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn plugin(name: &str) -> CheckCommand {
        CheckCommand {
            name: name.to_string(),
            kinds: BTreeSet::from([AlertKind::PodAlert]),
            vars: BTreeSet::from(["url".to_string()]),
            states: BTreeSet::from(["Critical".to_string()]),
            plugin_command: Some("/usr/lib/lookout/check_http".to_string()),
        }
    }

    #[test]
    fn test_builtin_lookup_respects_kind() {
        let registry = CheckCommandRegistry::with_builtins();
        assert!(registry.get(AlertKind::PodAlert, "pod-status").is_some());
        assert!(registry.get(AlertKind::NodeAlert, "pod-status").is_none());
        assert!(registry.get(AlertKind::NodeAlert, "node-volume").is_some());
        assert!(registry.get(AlertKind::ClusterAlert, "no-such-check").is_none());
    }

    #[test]
    fn test_plugin_set_get_delete() {
        let registry = CheckCommandRegistry::with_builtins();
        registry.set(plugin("web-probe")).unwrap();
        assert_eq!(registry.get(AlertKind::PodAlert, "web-probe"), Some(plugin("web-probe")));

        assert!(registry.delete("web-probe").is_some());
        assert!(registry.get(AlertKind::PodAlert, "web-probe").is_none());
    }

    #[test]
    fn test_plugin_cannot_replace_builtin() {
        let registry = CheckCommandRegistry::with_builtins();
        assert_eq!(
            registry.set(plugin("pod-status")),
            Err(BuiltinConflict("pod-status".to_string()))
        );
        assert!(registry.delete("pod-status").is_none());
        assert!(registry.get(AlertKind::PodAlert, "pod-status").unwrap().plugin_command.is_none());
    }

    #[test]
    fn test_concurrent_access() {
        let registry = Arc::new(CheckCommandRegistry::with_builtins());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let name = format!("probe-{}", i);
                    for _ in 0..100 {
                        registry.set(plugin(&name)).unwrap();
                        assert!(registry.get(AlertKind::PodAlert, "pod-status").is_some());
                        registry.delete(&name);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(registry.get(AlertKind::PodAlert, "probe-0").is_none());
    }
}
