//! AppBundle schema
//!
//! The bundle is the only value that crosses the boundary between the host and
//! an isolated hook stage. It is passed by value: each hook receives a snapshot
//! and returns a new one.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

/// Protocol tag, fixed for the lifetime of this schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleVersion {
    #[default]
    #[serde(rename = "v1alpha")]
    V1Alpha,
}

impl fmt::Display for BundleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleVersion::V1Alpha => write!(f, "v1alpha"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppBundle {
    pub version: BundleVersion,
    /// Deployable server, absent for static output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
}

impl AppBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle whose server starts with `cmd`
    pub fn with_start_command(cmd: Vec<String>) -> Self {
        Self {
            version: BundleVersion::V1Alpha,
            server: Some(ServerConfig::new(StartCommand {
                cmd,
                dir: None,
                runtime: None,
            })),
        }
    }

    pub fn has_server(&self) -> bool {
        self.server.is_some()
    }

    /// Start command argv, when a server with a non-empty command is declared
    pub fn start_command(&self) -> Option<&[String]> {
        self.server
            .as_ref()
            .map(|server| server.start.cmd.as_slice())
            .filter(|cmd| !cmd.is_empty())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub start: StartCommand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<u32>,
    /// vCPUs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    /// MiB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_instances: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<u32>,
}

impl ServerConfig {
    pub fn new(start: StartCommand) -> Self {
        Self {
            start,
            concurrency: None,
            cpu: None,
            memory: None,
            timeout_seconds: None,
            min_instances: None,
            max_instances: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartCommand {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub cmd: Vec<String>,
    /// Working directory inside the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
}
