//! `package.json` model

use crate::error::ComposeError;
use crate::stack::DependencyMap;
use serde::Deserialize;
use std::collections::BTreeMap;

pub const MANIFEST_FILE: &str = "package.json";

/// The subset of `package.json` discovery reads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dependencies: DependencyMap,
    #[serde(default)]
    pub dev_dependencies: DependencyMap,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
    #[serde(default)]
    pub engines: BTreeMap<String, String>,
}

impl PackageJson {
    pub fn parse(content: &str) -> Result<Self, ComposeError> {
        serde_json::from_str(content).map_err(|e| ComposeError::Manifest {
            path: MANIFEST_FILE.to_string(),
            reason: e.to_string(),
        })
    }

    /// Direct and dev dependencies; a dev entry wins on a name clash
    pub fn direct_dependencies(&self) -> DependencyMap {
        let mut deps = self.dependencies.clone();
        deps.extend(
            self.dev_dependencies
                .iter()
                .map(|(name, version)| (name.clone(), version.clone())),
        );
        deps
    }

    /// Named script, ignoring blank entries
    pub fn script(&self, name: &str) -> Option<&str> {
        self.scripts
            .get(name)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn node_engine(&self) -> Option<&str> {
        self.engines.get("node").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_manifest() {
        let pkg = PackageJson::parse(
            r#"{
                "name": "demo",
                "dependencies": {"express": "^4.18.2"},
                "devDependencies": {"typescript": "^5.0.0"},
                "scripts": {"start": "node index.js", "build": ""},
                "engines": {"node": ">=18"}
            }"#,
        )
        .unwrap();

        assert_eq!(pkg.name.as_deref(), Some("demo"));
        assert_eq!(pkg.script("start"), Some("node index.js"));
        assert_eq!(pkg.script("build"), None);
        assert_eq!(pkg.node_engine(), Some(">=18"));
    }

    #[test]
    fn test_missing_sections_default_empty() {
        let pkg = PackageJson::parse("{}").unwrap();
        assert!(pkg.direct_dependencies().is_empty());
        assert!(pkg.scripts.is_empty());
        assert!(pkg.node_engine().is_none());
    }

    #[test]
    fn test_dev_dependencies_override_direct() {
        let pkg = PackageJson::parse(
            r#"{
                "dependencies": {"a": "1.0.0", "b": "2.0.0"},
                "devDependencies": {"a": "1.5.0"}
            }"#,
        )
        .unwrap();

        let deps = pkg.direct_dependencies();
        assert_eq!(deps.get("a").map(String::as_str), Some("1.5.0"));
        assert_eq!(deps.get("b").map(String::as_str), Some("2.0.0"));
    }

    #[test]
    fn test_invalid_json_is_manifest_error() {
        let err = PackageJson::parse("{not json").unwrap_err();
        assert!(matches!(err, ComposeError::Manifest { .. }));
    }
}
