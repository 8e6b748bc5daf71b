//! Module identity for hot-reload detection.
//!
//! Every registered component records a snapshot of the module it was
//! defined in: the module path and an epoch. Reloading a module bumps its
//! epoch, so a second registration under the same identifier from the same
//! module is recognised as a reload rather than a duplicate. Unloading marks
//! the module inactive, so components still registered from it are treated as
//! stale on their next interaction.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

/// A module as seen at the time a component was registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleData {
    pub name: String,
    pub epoch: u64,
}

impl ModuleData {
    /// Whether `self` is a newer load of the module `original` came from.
    pub fn is_reload_of(&self, original: &ModuleData) -> bool {
        self.name == original.name && self.epoch > original.epoch
    }
}

/// The module path of a Rust type name: everything before the last `::`.
pub fn module_of(type_name: &str) -> &str {
    match type_name.rfind("::") {
        Some(index) => &type_name[..index],
        None => type_name,
    }
}

#[derive(Debug, Default)]
struct ModuleState {
    epoch: u64,
    loaded: bool,
}

/// Epoch and load state per module name.
#[derive(Debug, Default)]
pub struct ModuleTable {
    modules: Mutex<HashMap<String, ModuleState>>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot `name`, marking it loaded.
    ///
    /// A module seen for the first time, or seen again after an unload,
    /// starts a new epoch.
    pub fn snapshot(&self, name: &str) -> ModuleData {
        let mut modules = self.modules.lock();
        let state = modules.entry(name.to_string()).or_default();
        if !state.loaded {
            state.epoch += 1;
            state.loaded = true;
        }
        ModuleData {
            name: name.to_string(),
            epoch: state.epoch,
        }
    }

    /// Start a new epoch for `name`.
    pub fn reload(&self, name: &str) -> u64 {
        let mut modules = self.modules.lock();
        let state = modules.entry(name.to_string()).or_default();
        state.epoch += 1;
        state.loaded = true;
        debug!(module = name, epoch = state.epoch, "module reloaded");
        state.epoch
    }

    /// Mark `name` as no longer loaded.
    pub fn unload(&self, name: &str) {
        if let Some(state) = self.modules.lock().get_mut(name) {
            state.loaded = false;
            debug!(module = name, epoch = state.epoch, "module unloaded");
        }
    }

    /// Whether `module` is still the live load of its module.
    pub fn is_active(&self, module: &ModuleData) -> bool {
        self.modules
            .lock()
            .get(&module.name)
            .is_some_and(|state| state.loaded && state.epoch == module.epoch)
    }
}
