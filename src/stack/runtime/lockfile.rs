//! Lossy dependency reconstruction from npm and yarn lockfiles
//!
//! Neither reader is a resolver. The npm reader adds the declared dependencies of
//! each direct dependency's installed node, one level deep. The yarn reader scans
//! quoted `"name@version":` entry headers line by line without parsing the
//! rest of the lockfile grammar.

use crate::error::ComposeError;
use crate::stack::DependencyMap;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub const NPM_LOCKFILE: &str = "package-lock.json";
pub const YARN_LOCKFILE: &str = "yarn.lock";

fn yarn_header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^"(@?[^@"]+)@([^"]+)":"#).expect("yarn header pattern is valid")
    })
}

fn resolution_error(lockfile: &str, reason: impl Into<String>) -> ComposeError {
    ComposeError::DependencyResolution {
        lockfile: lockfile.to_string(),
        reason: reason.into(),
    }
}

/// Union of `packages["node_modules/<name>"].dependencies` for every direct dependency.
///
/// Only the first level below each direct dependency is visited.
pub fn npm_transitive_dependencies(
    content: &str,
    direct: &DependencyMap,
) -> Result<DependencyMap, ComposeError> {
    let lock: Value =
        serde_json::from_str(content).map_err(|e| resolution_error(NPM_LOCKFILE, e.to_string()))?;

    let packages = lock
        .get("packages")
        .and_then(Value::as_object)
        .ok_or_else(|| resolution_error(NPM_LOCKFILE, "missing \"packages\" map"))?;

    let mut resolved = DependencyMap::new();
    for name in direct.keys() {
        let declared = packages
            .get(&format!("node_modules/{}", name))
            .and_then(|node| node.get("dependencies"))
            .and_then(Value::as_object);

        if let Some(declared) = declared {
            for (dep, version) in declared {
                if let Some(version) = version.as_str() {
                    resolved.insert(dep.clone(), version.to_string());
                }
            }
        }
    }

    Ok(resolved)
}

/// Every `"name@version":` header in a yarn lockfile, as `name -> version`
pub fn parse_yarn_lockfile(content: &str) -> DependencyMap {
    let pattern = yarn_header_pattern();

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let caps = pattern.captures(line)?;
            Some((caps[1].to_string(), caps[2].to_string()))
        })
        .collect()
}
