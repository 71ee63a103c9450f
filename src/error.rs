//! Error types for discovery and pipeline execution

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// What a discovery step was trying to pin down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryKind {
    Runtime,
    Framework,
}

impl fmt::Display for DiscoveryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryKind::Runtime => write!(f, "runtime"),
            DiscoveryKind::Framework => write!(f, "framework"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ComposeError {
    /// Two or more candidates survived matching
    #[error("More than one {kind} matched the codebase: {}", .ids.join(", "))]
    DiscoveryAmbiguous { kind: DiscoveryKind, ids: Vec<String> },

    /// Nothing matched; callers decide whether that is fatal
    #[error("Unable to determine the {what} for the application")]
    DiscoveryNotFound { what: DiscoveryKind },

    #[error(
        "Unsupported engine version '{requested}'. Supported major versions: {}",
        .supported.join(", ")
    )]
    UnsupportedEngineVersion {
        requested: String,
        supported: Vec<String>,
    },

    /// Lockfile missing or malformed. Logged, never propagated out of discovery.
    #[error("Failed to resolve dependencies from {lockfile}: {reason}")]
    DependencyResolution { lockfile: String, reason: String },

    #[error("Invalid manifest {path}: {reason}")]
    Manifest { path: String, reason: String },

    #[error("Invalid framework catalog: {0}")]
    Catalog(String),

    #[error("Unknown hook '{0}'")]
    UnknownHook(String),

    #[error("Stage '{0}' is already defined in this pipeline")]
    DuplicateStage(String),

    #[error("Pipeline has no stage to derive '{0}' from")]
    EmptyPipeline(String),

    #[error("Export requires an image reference (set APPCOMPOSE_IMAGE or --image)")]
    MissingImage,

    #[error("Stage {stage} failed: `{command}` {status}{}", render_pipeline(.pipeline))]
    ProcessFailure {
        stage: String,
        command: String,
        status: String,
        pipeline: Option<String>,
    },

    #[error("Stage {stage} did not produce a bundle at {}: {reason}", .path.display())]
    BundleExportFailure {
        stage: String,
        path: PathBuf,
        reason: String,
    },

    /// A host work directory would be swept into the image by the build context copy
    #[error(
        "{} lies inside the build context {} and would be copied into the image",
        .path.display(),
        .root.display()
    )]
    WorkDirInsideContext { path: PathBuf, root: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn render_pipeline(pipeline: &Option<String>) -> String {
    match pipeline {
        Some(text) => format!("\n--- pipeline ---\n{}", text.trim_end()),
        None => String::new(),
    }
}

impl ComposeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ComposeError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the caller is expected to recover (fallback or log) rather than abort
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ComposeError::DiscoveryNotFound { .. } | ComposeError::DependencyResolution { .. }
        )
    }
}
