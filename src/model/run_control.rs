//! Launched-process handles
//!
//! The process-execution layer owns launched applications; the engine only
//! needs to enumerate them, ask them to stop, and await their termination
//! when a stop-before-build policy matches.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::kit::DeviceType;
use super::{ProjectId, RunControlId};

/// One launched application under the host's control
pub trait RunControlHandle: Send + Sync {
    fn id(&self) -> RunControlId;

    /// Human-readable name for stop prompts
    fn display_name(&self) -> String;

    /// Project that launched this process
    fn project(&self) -> ProjectId;

    /// Path of the running executable
    fn executable(&self) -> PathBuf;

    /// Path of the build product this run control was launched for; may
    /// differ from `executable` for wrapped or interpreted launches
    fn target_executable(&self) -> PathBuf;

    /// Device class the process runs on
    fn device_type(&self) -> DeviceType;

    fn is_running(&self) -> bool;

    /// Ask the process to stop; termination is awaited separately
    fn initiate_stop(&self);

    /// Resolves once the process has terminated
    fn wait_for_stop(&self) -> BoxFuture<'static, ()>;
}

/// Enumeration of currently-launched run controls
pub trait RunningProcessRegistry: Send + Sync {
    fn run_controls(&self) -> Vec<Arc<dyn RunControlHandle>>;
}

/// The run configuration a build was requested for
///
/// Carried through `potentially_build_for_run_config` and used by the
/// same-app stop policy.
#[derive(Debug, Clone)]
pub struct RunConfigHandle {
    pub project: ProjectId,
    /// Build product the run configuration launches
    pub target_executable: PathBuf,
}
