//! Framework catalog loading

use super::FrameworkSpec;
use crate::error::ComposeError;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

const BUILTIN_CATALOG: &str = include_str!("frameworks.yaml");

/// Immutable list of known frameworks, loaded once per run
#[derive(Debug, Clone, Default)]
pub struct FrameworkCatalog {
    specs: Vec<FrameworkSpec>,
}

impl FrameworkCatalog {
    pub fn new(specs: Vec<FrameworkSpec>) -> Result<Self, ComposeError> {
        let mut seen = HashSet::new();
        for spec in &specs {
            if spec.id.trim().is_empty() {
                return Err(ComposeError::Catalog(
                    "framework id must not be empty".to_string(),
                ));
            }
            if !seen.insert(spec.id.as_str()) {
                return Err(ComposeError::Catalog(format!(
                    "duplicate framework id '{}'",
                    spec.id
                )));
            }
        }
        Ok(Self { specs })
    }

    /// Catalog compiled into the binary
    pub fn builtin() -> Result<Self, ComposeError> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    /// Parse a YAML (or JSON, which YAML accepts) list of framework specs
    pub fn from_yaml(content: &str) -> Result<Self, ComposeError> {
        let specs: Vec<FrameworkSpec> = serde_yaml::from_str(content)?;
        Self::new(specs)
    }

    pub fn load(path: &Path) -> Result<Self, ComposeError> {
        let content = fs::read_to_string(path).map_err(|e| ComposeError::io(path, e))?;
        let catalog = Self::from_yaml(&content)?;
        debug!(
            path = %path.display(),
            frameworks = catalog.len(),
            "Loaded framework catalog"
        );
        Ok(catalog)
    }

    pub fn specs(&self) -> &[FrameworkSpec] {
        &self.specs
    }

    pub fn get(&self, id: &str) -> Option<&FrameworkSpec> {
        self.specs.iter().find(|spec| spec.id == id)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
