//! Runtime discovery over a registry of runtimes

use crate::error::{ComposeError, DiscoveryKind};
use crate::fs::FileSystem;
use crate::stack::runtime::{DiscoveryContext, RuntimeRegistry, RuntimeSpec};
use crate::stack::FrameworkCatalog;
use std::time::Instant;
use tracing::{debug, info};

/// Find the single runtime matching `fs` and let it analyse the codebase.
///
/// Returns `Ok(None)` when no runtime matches. Two or more matches are fatal.
pub fn discover(
    fs: &dyn FileSystem,
    catalog: &FrameworkCatalog,
    registry: &RuntimeRegistry,
    ctx: &DiscoveryContext,
) -> Result<Option<RuntimeSpec>, ComposeError> {
    let start = Instant::now();

    let matched: Vec<_> = registry
        .runtimes()
        .iter()
        .filter(|runtime| runtime.matches(fs))
        .collect();

    debug!(
        root = %fs.root().display(),
        matched = ?matched.iter().map(|r| r.id().to_string()).collect::<Vec<_>>(),
        "Runtime match"
    );

    let runtime = match matched.as_slice() {
        [] => return Ok(None),
        [runtime] => runtime,
        _ => {
            return Err(ComposeError::DiscoveryAmbiguous {
                kind: DiscoveryKind::Runtime,
                ids: matched.iter().map(|r| r.id().to_string()).collect(),
            })
        }
    };

    let spec = runtime.analyse_codebase(fs, catalog, ctx)?;

    info!(
        runtime = %runtime.id(),
        framework = spec.as_ref().and_then(|s| s.framework()).unwrap_or("none"),
        duration_ms = start.elapsed().as_millis() as u64,
        "Discovery completed"
    );

    Ok(spec)
}

/// Like [`discover`], but a codebase no runtime recognises is an error
pub fn discover_required(
    fs: &dyn FileSystem,
    catalog: &FrameworkCatalog,
    registry: &RuntimeRegistry,
    ctx: &DiscoveryContext,
) -> Result<RuntimeSpec, ComposeError> {
    discover(fs, catalog, registry, ctx)?.ok_or(ComposeError::DiscoveryNotFound {
        what: DiscoveryKind::Runtime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use crate::stack::{Runtime, RuntimeId};
    use std::sync::Arc;

    struct FixedRuntime {
        id: &'static str,
        file: &'static str,
    }

    impl Runtime for FixedRuntime {
        fn id(&self) -> RuntimeId {
            RuntimeId::Custom(self.id.to_string())
        }

        fn required_files(&self) -> &[&'static str] {
            std::slice::from_ref(&self.file)
        }

        fn analyse_codebase(
            &self,
            _fs: &dyn FileSystem,
            _catalog: &FrameworkCatalog,
            _ctx: &DiscoveryContext,
        ) -> Result<Option<RuntimeSpec>, ComposeError> {
            Ok(Some(RuntimeSpec::builder(self.id(), "scratch").build()))
        }
    }

    fn registry(runtimes: Vec<FixedRuntime>) -> RuntimeRegistry {
        let mut registry = RuntimeRegistry::new();
        for runtime in runtimes {
            registry.register(Arc::new(runtime));
        }
        registry
    }

    #[test]
    fn test_no_runtime_is_none() {
        let registry = registry(vec![FixedRuntime {
            id: "deno",
            file: "deno.json",
        }]);
        let result = discover(
            &MockFileSystem::new(),
            &FrameworkCatalog::default(),
            &registry,
            &DiscoveryContext::default(),
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_required_variant_reports_not_found() {
        let err = discover_required(
            &MockFileSystem::new(),
            &FrameworkCatalog::default(),
            &RuntimeRegistry::new(),
            &DiscoveryContext::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ComposeError::DiscoveryNotFound {
                what: DiscoveryKind::Runtime
            }
        ));
    }

    #[test]
    fn test_single_registered_runtime_analyses() {
        let registry = registry(vec![FixedRuntime {
            id: "deno",
            file: "deno.json",
        }]);
        let fs = MockFileSystem::with_files([("deno.json", "{}")]);

        let spec = discover(
            &fs,
            &FrameworkCatalog::default(),
            &registry,
            &DiscoveryContext::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(spec.id().as_str(), "deno");
    }

    #[test]
    fn test_two_runtimes_are_ambiguous() {
        let registry = registry(vec![
            FixedRuntime {
                id: "deno",
                file: "package.json",
            },
            FixedRuntime {
                id: "bun",
                file: "package.json",
            },
        ]);
        let fs = MockFileSystem::with_files([("package.json", "{}")]);

        let err = discover(
            &fs,
            &FrameworkCatalog::default(),
            &registry,
            &DiscoveryContext::default(),
        )
        .unwrap_err();

        match err {
            ComposeError::DiscoveryAmbiguous { kind, ids } => {
                assert_eq!(kind, DiscoveryKind::Runtime);
                assert_eq!(ids, vec!["deno", "bun"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
