//! Narrows the catalog to at most one framework for a codebase

use super::FrameworkSpec;
use crate::error::{ComposeError, DiscoveryKind};
use crate::fs::FileSystem;
use crate::stack::{DependencyMap, RuntimeId};
use std::collections::HashSet;
use tracing::debug;

/// Select the single framework matching `runtime`, `dependencies` and the files on `fs`.
///
/// Filters apply in order: runtime, required dependencies (all present by name),
/// required files (every entry satisfied by at least one alternative). Frameworks
/// embedded by another survivor are then dropped. Returns `Ok(None)` when nothing
/// survives and `DiscoveryAmbiguous` when more than one does.
pub fn match_framework<'a>(
    runtime: &RuntimeId,
    fs: &dyn FileSystem,
    catalog: &'a [FrameworkSpec],
    dependencies: &DependencyMap,
) -> Result<Option<&'a FrameworkSpec>, ComposeError> {
    let candidates: Vec<&FrameworkSpec> = catalog
        .iter()
        .filter(|spec| &spec.runtime == runtime)
        .filter(|spec| {
            spec.required_dependencies
                .iter()
                .all(|dep| dependencies.contains_key(&dep.name))
        })
        .filter(|spec| spec.required_files.iter().all(|file| file.is_satisfied(fs)))
        .collect();

    debug!(
        runtime = %runtime,
        candidates = ?candidates.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
        "Framework candidates before embedding removal"
    );

    let embedded: HashSet<&str> = candidates
        .iter()
        .flat_map(|spec| spec.embeds_frameworks.iter().map(String::as_str))
        .collect();

    let mut survivors: Vec<&FrameworkSpec> = candidates
        .into_iter()
        .filter(|spec| !embedded.contains(spec.id.as_str()))
        .collect();

    match survivors.len() {
        0 => Ok(None),
        1 => Ok(survivors.pop()),
        _ => Err(ComposeError::DiscoveryAmbiguous {
            kind: DiscoveryKind::Framework,
            ids: survivors.iter().map(|spec| spec.id.clone()).collect(),
        }),
    }
}
