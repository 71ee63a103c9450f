//! Bundle transforms addressed by stable id
//!
//! Hooks are compiled in and registered in a [`HookRegistry`]. Only the hook id and
//! the bundle JSON cross into an isolated build stage, where the same binary looks
//! the id up again and applies it.

pub mod builtin;
pub mod exec;
pub mod registry;

use crate::output::AppBundle;

pub use builtin::{FnHook, IdentityHook, ServerDefaultsHook};
pub use exec::{execute_request, HookRequest};
pub use registry::HookRegistry;

/// A pure `AppBundle -> AppBundle` transform
pub trait Hook: Send + Sync {
    /// Stable id used to address the hook across process boundaries
    fn id(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn apply(&self, bundle: AppBundle) -> AppBundle;
}
