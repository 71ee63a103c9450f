//! In-sandbox side of the hook protocol
//!
//! The host writes a [`HookRequest`] to a scratch file; inside the hook stage
//! `appcompose hook-exec <request> <output>` reads it, applies the named hook
//! and writes the resulting bundle to `<output>`.

use super::HookRegistry;
use crate::error::ComposeError;
use crate::output::AppBundle;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Message sent across the stage boundary: a hook id and the bundle to apply it to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookRequest {
    pub hook: String,
    pub bundle: AppBundle,
}

impl HookRequest {
    pub fn new(hook: impl Into<String>, bundle: AppBundle) -> Self {
        Self {
            hook: hook.into(),
            bundle,
        }
    }

    pub fn to_json(&self) -> Result<String, ComposeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<(), ComposeError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ComposeError::io(parent, e))?;
        }
        fs::write(path, self.to_json()?).map_err(|e| ComposeError::io(path, e))
    }

    pub fn read(path: &Path) -> Result<Self, ComposeError> {
        let content = fs::read_to_string(path).map_err(|e| ComposeError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Apply the request at `request_path` and write the new bundle to `output_path`,
/// creating its directory when absent.
pub fn execute_request(
    registry: &HookRegistry,
    request_path: &Path,
    output_path: &Path,
) -> Result<AppBundle, ComposeError> {
    let request = HookRequest::read(request_path)?;
    let bundle = registry.apply(&request.hook, request.bundle)?;

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).map_err(|e| ComposeError::io(parent, e))?;
    }
    fs::write(output_path, bundle.to_json()?).map_err(|e| ComposeError::io(output_path, e))?;

    info!(
        hook = %request.hook,
        output = %output_path.display(),
        "Hook executed"
    );
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{Hook, ServerDefaultsHook};
    use tempfile::TempDir;

    #[test]
    fn test_request_embeds_bundle_literally() {
        let json = HookRequest::new("identity", AppBundle::new())
            .to_json()
            .unwrap();
        assert_eq!(json, r#"{"hook":"identity","bundle":{"version":"v1alpha"}}"#);
    }

    #[test]
    fn test_round_trip_matches_direct_application() {
        let temp = TempDir::new().unwrap();
        let request_path = temp.path().join("adapters/req.json");
        let output_path = temp.path().join("app/.appcompose/bundle.json");

        let bundle = AppBundle::with_start_command(vec!["npm".into(), "start".into()]);
        HookRequest::new("server-defaults", bundle.clone())
            .write(&request_path)
            .unwrap();

        let registry = HookRegistry::with_builtins();
        let returned = execute_request(&registry, &request_path, &output_path).unwrap();

        let on_disk =
            AppBundle::from_json(&fs::read_to_string(&output_path).unwrap()).unwrap();
        let direct = ServerDefaultsHook.apply(bundle);
        assert_eq!(on_disk, direct);
        assert_eq!(returned, direct);
    }

    #[test]
    fn test_unknown_hook_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let request_path = temp.path().join("req.json");
        let output_path = temp.path().join("out/bundle.json");

        HookRequest::new("nope", AppBundle::new())
            .write(&request_path)
            .unwrap();

        let err = execute_request(&HookRegistry::with_builtins(), &request_path, &output_path)
            .unwrap_err();
        assert!(matches!(err, ComposeError::UnknownHook(_)));
        assert!(!output_path.exists());
    }
}
