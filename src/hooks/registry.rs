//! Table of hooks addressable by id

use super::builtin::{IdentityHook, ServerDefaultsHook};
use super::Hook;
use crate::error::ComposeError;
use crate::output::AppBundle;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: BTreeMap<String, Arc<dyn Hook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the hooks compiled into this binary
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(IdentityHook));
        registry.register(Arc::new(ServerDefaultsHook));
        registry
    }

    /// Register a hook, replacing any previous hook with the same id
    pub fn register(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.insert(hook.id().to_string(), hook);
    }

    pub fn get(&self, id: &str) -> Result<&Arc<dyn Hook>, ComposeError> {
        self.hooks
            .get(id)
            .ok_or_else(|| ComposeError::UnknownHook(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.hooks.contains_key(id)
    }

    pub fn apply(&self, id: &str, bundle: AppBundle) -> Result<AppBundle, ComposeError> {
        let hook = self.get(id)?;
        debug!(hook = id, "Applying hook");
        Ok(hook.apply(bundle))
    }

    pub fn hooks(&self) -> impl Iterator<Item = &Arc<dyn Hook>> {
        self.hooks.values()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.hooks.keys().map(String::as_str).collect()
    }
}
