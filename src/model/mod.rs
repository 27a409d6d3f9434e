//! Domain data model and collaborator traits
//!
//! The surrounding project model owns projects, targets, and configurations;
//! this module defines the snapshot types the engine reads and the traits
//! external collaborators (build systems, step recipes, run controls)
//! implement.
//!
//! # Submodules
//!
//! - [`project`] - Projects, targets, configurations, and the project model
//! - [`step`] - Steps, step lists, purposes, and the recipe trait
//! - [`kit`] - Toolchain/device bindings
//! - [`run_control`] - Launched-process handles and the run registry

pub mod kit;
pub mod project;
pub mod run_control;
pub mod step;

use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id! {
    /// Session-stable identity of a project
    ProjectId
}
string_id! {
    /// Identity of a (project, toolchain/device context) binding
    TargetId
}
string_id! {
    /// Identity of a concrete build or deploy configuration
    ConfigId
}
string_id! {
    /// Identity of a step within a configuration
    StepId
}
string_id! {
    /// Identity of a launched run control
    RunControlId
}

pub use kit::{DeviceType, Kit};
pub use project::{
    BuildConfiguration, DeployConfiguration, Project, ProjectModel, Target,
};
pub use run_control::{RunConfigHandle, RunControlHandle, RunningProcessRegistry};
pub use step::{BuildSystemHandle, Purpose, Step, StepList, StepRecipe};
