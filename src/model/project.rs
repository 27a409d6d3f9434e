//! Projects, targets, configurations, and the project model trait
//!
//! Long-lived entities owned by the surrounding project model. The engine
//! reads them as immutable snapshots (`Arc<Project>`); the queue it builds
//! from them never outlives one orchestration cycle.

use std::path::PathBuf;
use std::sync::Arc;

use super::kit::Kit;
use super::step::StepList;
use super::{ConfigId, ProjectId, TargetId};

/// A concrete, selectable build configuration of a target
///
/// Owns one step list per supported purpose: Build and Clean.
#[derive(Debug, Clone)]
pub struct BuildConfiguration {
    pub id: ConfigId,
    pub display_name: String,
    /// Directory build artifacts land in; used by the same-build-dir stop
    /// policy
    pub build_directory: PathBuf,
    pub build_steps: StepList,
    pub clean_steps: StepList,
}

/// A concrete, selectable deploy configuration of a target
#[derive(Debug, Clone)]
pub struct DeployConfiguration {
    pub id: ConfigId,
    pub display_name: String,
    pub deploy_steps: StepList,
}

/// A (project, toolchain/device context) binding
#[derive(Debug, Clone)]
pub struct Target {
    pub id: TargetId,
    pub display_name: String,
    pub kit: Kit,
    pub build_configurations: Vec<BuildConfiguration>,
    /// Index into `build_configurations`
    pub active_build_configuration: Option<usize>,
    pub deploy_configurations: Vec<DeployConfiguration>,
    /// Index into `deploy_configurations`
    pub active_deploy_configuration: Option<usize>,
}

impl Target {
    pub fn active_build_configuration(&self) -> Option<&BuildConfiguration> {
        self.active_build_configuration
            .and_then(|i| self.build_configurations.get(i))
    }

    pub fn active_deploy_configuration(&self) -> Option<&DeployConfiguration> {
        self.active_deploy_configuration
            .and_then(|i| self.deploy_configurations.get(i))
    }
}

/// A named build unit
#[derive(Debug, Clone)]
pub struct Project {
    pub id: ProjectId,
    pub display_name: String,
    /// True when no valid configuration is selected; such a project is
    /// skipped with a notice instead of failing the queue
    pub needs_configuration: bool,
    pub targets: Vec<Target>,
    /// Index into `targets`
    pub active_target: Option<usize>,
}

impl Project {
    pub fn active_target(&self) -> Option<&Target> {
        self.active_target.and_then(|i| self.targets.get(i))
    }
}

/// The surrounding project model
///
/// Supplies project snapshots and dependency order. Implemented by the
/// host; the engine never mutates it.
pub trait ProjectModel: Send + Sync {
    /// All open projects
    fn projects(&self) -> Vec<Arc<Project>>;

    /// Look up one project by id
    fn project(&self, id: &ProjectId) -> Option<Arc<Project>>;

    /// Full session build order: topological, stable, dependents after
    /// dependencies
    fn build_order(&self) -> Vec<Arc<Project>>;

    /// Transitive dependencies of `root` in build order, `root` last
    fn dependency_order(&self, root: &ProjectId) -> Vec<Arc<Project>>;
}
