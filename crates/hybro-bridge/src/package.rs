//! The exposed package tree: package → module → methods and events.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures_core::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::error::{BridgeError, MethodError, Result};
use crate::event::EventHandler;

/// Completion of a method call. Sync methods resolve immediately.
pub type MethodFuture = BoxFuture<'static, std::result::Result<Value, MethodError>>;

/// Capabilities a module exposes to the guest view.
///
/// Methods are looked up by name and awaited uniformly. Event subscription is
/// optional; the default implementations report [`BridgeError::EventsUnsupported`].
pub trait Module: Send + Sync {
    /// Start a call of `method`. Returns `None` when no such method exists.
    fn call(&self, method: &str, params: Vec<Value>) -> Option<MethodFuture>;

    /// Subscribe `handler` to `event`. The returned value is forwarded to the
    /// guest as the subscription result.
    fn add_event_listener(&self, event: &str, handler: EventHandler) -> Result<Value> {
        let _ = (event, handler);
        Err(BridgeError::EventsUnsupported)
    }

    /// Unsubscribe `handler` from `event`.
    ///
    /// `handler` is `None` when the bridge holds no callback for the removal;
    /// implementations must tolerate that.
    fn remove_event_listener(&self, event: &str, handler: Option<&EventHandler>) -> Result<Value> {
        let _ = (event, handler);
        Err(BridgeError::EventsUnsupported)
    }

    /// Method and event names, for introspection.
    fn describe(&self) -> ModuleInfo {
        ModuleInfo::default()
    }
}

/// Names a module exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
    pub methods: Vec<String>,
    pub events: Vec<String>,
}

/// One module of the tree, with its location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    pub package: String,
    pub module: String,
    pub methods: Vec<String>,
    pub events: Vec<String>,
}

/// Named modules grouped under one package.
#[derive(Clone, Default)]
pub struct Package {
    modules: BTreeMap<String, Arc<dyn Module>>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Package::insert`].
    pub fn module(mut self, name: impl Into<String>, module: impl Module + 'static) -> Self {
        self.insert(name, Arc::new(module));
        self
    }

    /// Register or replace a module.
    pub fn insert(&mut self, name: impl Into<String>, module: Arc<dyn Module>) {
        self.modules.insert(name.into(), module);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules.get(name).cloned()
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.modules.keys()).finish()
    }
}

/// Every package the host exposes, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct PackageTree {
    packages: BTreeMap<String, Package>,
}

impl PackageTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`PackageTree::insert`].
    pub fn package(mut self, name: impl Into<String>, package: Package) -> Self {
        self.insert(name, package);
        self
    }

    /// Register or replace a package.
    pub fn insert(&mut self, name: impl Into<String>, package: Package) {
        self.packages.insert(name.into(), package);
    }

    pub fn get(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    /// Resolve `package.module`, naming the missing level on failure.
    pub fn resolve(&self, package: &str, module: &str) -> Result<Arc<dyn Module>> {
        let found = self
            .packages
            .get(package)
            .ok_or_else(|| BridgeError::PackageNotFound(package.to_string()))?;

        found
            .get(module)
            .ok_or_else(|| BridgeError::ModuleNotFound {
                package: package.to_string(),
                module: module.to_string(),
            })
    }

    /// Flat listing of every module, ordered by package then module name.
    pub fn describe(&self) -> Vec<ModuleDescriptor> {
        self.packages
            .iter()
            .flat_map(|(package_name, package)| {
                package.modules.iter().map(move |(module_name, module)| {
                    let info = module.describe();
                    ModuleDescriptor {
                        package: package_name.clone(),
                        module: module_name.clone(),
                        methods: info.methods,
                        events: info.events,
                    }
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
