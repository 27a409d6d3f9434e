//! Orchestration settings
//!
//! Settings that control queue expansion and execution policy: which running
//! applications to stop before a build, whether sibling target groups abort
//! on the first error, and how deploy requests interact with builds.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Which currently-running launched processes must be stopped before a
/// build starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StopPolicy {
    /// Never stop anything
    #[default]
    None,
    /// Stop every running launched process
    All,
    /// Stop processes owned by one of the projects about to be built
    SameProject,
    /// Stop processes whose running executable lives under a candidate
    /// build directory of the projects about to be built
    SameBuildDir,
    /// Stop the process whose target executable matches the starting run
    /// configuration; degrades to `SameBuildDir` without a run context
    SameApp,
}

/// Whether a deploy request implies building first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BuildBeforeRunMode {
    /// Deploy without building
    Off,
    /// Build only the application's project
    AppOnly,
    /// Build the whole project tree
    #[default]
    WholeProject,
}

/// Orchestration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildSettings {
    /// Stop-before-build policy
    pub stop_before_build: StopPolicy,

    /// Ask the user before stopping running applications
    pub prompt_to_stop: bool,

    /// Abort all sibling target groups on the first failed step
    pub abort_all_on_error: bool,

    /// Build mode implied by a deploy request
    pub build_before_deploy: BuildBeforeRunMode,

    /// Deploy before running an application
    pub deploy_before_run: bool,

    /// Propagate the Deploy purpose to dependencies when building with
    /// dependencies
    pub deploy_project_dependencies: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            stop_before_build: StopPolicy::None,
            prompt_to_stop: true,
            abort_all_on_error: true,
            build_before_deploy: BuildBeforeRunMode::WholeProject,
            deploy_before_run: true,
            deploy_project_dependencies: false,
        }
    }
}

impl BuildSettings {
    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::ReadFile {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml(&content)
    }
}
