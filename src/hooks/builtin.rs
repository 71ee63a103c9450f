//! Hooks shipped with the binary

use super::Hook;
use crate::output::AppBundle;

pub struct IdentityHook;

impl Hook for IdentityHook {
    fn id(&self) -> &str {
        "identity"
    }

    fn description(&self) -> &str {
        "Returns the bundle unchanged"
    }

    fn apply(&self, bundle: AppBundle) -> AppBundle {
        bundle
    }
}

/// Fills unset server sizing fields with conservative defaults
pub struct ServerDefaultsHook;

impl ServerDefaultsHook {
    pub const CONCURRENCY: u32 = 80;
    pub const CPU: f64 = 1.0;
    pub const MEMORY_MIB: u32 = 512;
    pub const TIMEOUT_SECONDS: u32 = 60;
    pub const MIN_INSTANCES: u32 = 0;
    pub const MAX_INSTANCES: u32 = 100;
}

impl Hook for ServerDefaultsHook {
    fn id(&self) -> &str {
        "server-defaults"
    }

    fn description(&self) -> &str {
        "Fills unset server concurrency, cpu, memory, timeout and instance bounds"
    }

    fn apply(&self, mut bundle: AppBundle) -> AppBundle {
        if let Some(server) = bundle.server.as_mut() {
            server.concurrency.get_or_insert(Self::CONCURRENCY);
            server.cpu.get_or_insert(Self::CPU);
            server.memory.get_or_insert(Self::MEMORY_MIB);
            server.timeout_seconds.get_or_insert(Self::TIMEOUT_SECONDS);
            server.min_instances.get_or_insert(Self::MIN_INSTANCES);
            server.max_instances.get_or_insert(Self::MAX_INSTANCES);
        }
        bundle
    }
}

/// Hook backed by a plain function, for integrations registering their own transforms
pub struct FnHook {
    id: String,
    description: String,
    transform: fn(AppBundle) -> AppBundle,
}

impl FnHook {
    pub fn new(id: impl Into<String>, transform: fn(AppBundle) -> AppBundle) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            transform,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl Hook for FnHook {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&self, bundle: AppBundle) -> AppBundle {
        (self.transform)(bundle)
    }
}
