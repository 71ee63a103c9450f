//! Node.js package managers

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Yarn,
}

impl PackageManager {
    pub fn name(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
        }
    }

    /// Lockfile whose presence selects this manager
    pub fn lockfile(&self) -> &'static str {
        match self {
            PackageManager::Npm => super::lockfile::NPM_LOCKFILE,
            PackageManager::Yarn => super::lockfile::YARN_LOCKFILE,
        }
    }

    /// `npm ci` needs a lockfile; without one npm falls back to `npm install`
    pub fn install_command(&self, has_lockfile: bool) -> String {
        match (self, has_lockfile) {
            (PackageManager::Npm, true) => "npm ci".to_string(),
            (PackageManager::Npm, false) => "npm install".to_string(),
            (PackageManager::Yarn, _) => "yarn install".to_string(),
        }
    }

    /// Command that puts the manager itself on PATH before installing
    pub fn bootstrap_command(&self) -> Option<String> {
        match self {
            PackageManager::Npm => None,
            PackageManager::Yarn => Some("npm install --global yarn".to_string()),
        }
    }

    pub fn run_script(&self, script: &str) -> String {
        format!("{} run {}", self.name(), script)
    }

    /// Token that resolves locally installed binaries without a global install
    pub fn binary_runner(&self) -> &'static str {
        "npx"
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        npm_with_lock = { PackageManager::Npm, true, "npm ci" },
        npm_without_lock = { PackageManager::Npm, false, "npm install" },
        yarn_with_lock = { PackageManager::Yarn, true, "yarn install" },
        yarn_without_lock = { PackageManager::Yarn, false, "yarn install" },
    )]
    fn test_install_command(pm: PackageManager, has_lock: bool, expected: &str) {
        assert_eq!(pm.install_command(has_lock), expected);
    }

    #[test]
    fn test_bootstrap_only_for_yarn() {
        assert_eq!(PackageManager::Npm.bootstrap_command(), None);
        assert_eq!(
            PackageManager::Yarn.bootstrap_command().as_deref(),
            Some("npm install --global yarn")
        );
    }

    #[test]
    fn test_run_script() {
        assert_eq!(PackageManager::Yarn.run_script("build"), "yarn run build");
        assert_eq!(PackageManager::Npm.run_script("start"), "npm run start");
    }
}
