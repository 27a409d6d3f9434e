//! Stop-before-build policy evaluation
//!
//! Before a queue that contains a Build purpose starts, the configured
//! policy decides which currently-running launched processes must be
//! halted first. The evaluator batches one confirmation prompt, asks the
//! matched processes to stop, and awaits their termination; a canceled
//! wait aborts the whole queue operation before anything is enqueued.

use std::sync::Arc;

use futures::future::{join_all, BoxFuture};

use crate::model::{DeviceType, RunConfigHandle, RunControlHandle, RunControlId, RunningProcessRegistry};
use crate::settings::StopPolicy;

use super::queue::{build_configs_for_selection, targets_for_selection, BuildRequest, ConfigSelection};

/// Outcome of the pre-queue evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Queueing may proceed
    Proceed,
    /// The user canceled the wait; the queue operation must be aborted
    Canceled,
}

/// Outcome of awaiting process termination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Stopped,
    Canceled,
}

/// User-facing interaction points of the stop flow
///
/// The host implements this against its UI; [`AutoConfirm`] is the
/// non-interactive default.
pub trait StopInteraction: Send + Sync {
    /// One batched "stop these applications?" question
    fn confirm_stop(&self, names: &[String]) -> BoxFuture<'static, bool>;

    /// Wait for the given processes to terminate; may be canceled by the
    /// user
    fn wait_for_stop(
        &self,
        controls: Vec<Arc<dyn RunControlHandle>>,
    ) -> BoxFuture<'static, WaitOutcome>;
}

/// Non-interactive interaction: always confirms, waits until every process
/// reports termination.
#[derive(Debug, Default)]
pub struct AutoConfirm;

impl StopInteraction for AutoConfirm {
    fn confirm_stop(&self, _names: &[String]) -> BoxFuture<'static, bool> {
        Box::pin(async { true })
    }

    fn wait_for_stop(
        &self,
        controls: Vec<Arc<dyn RunControlHandle>>,
    ) -> BoxFuture<'static, WaitOutcome> {
        Box::pin(async move {
            join_all(controls.iter().map(|rc| rc.wait_for_stop())).await;
            WaitOutcome::Stopped
        })
    }
}

fn matches_same_build_dir(
    rc: &dyn RunControlHandle,
    requests: &[BuildRequest],
    selection: ConfigSelection,
) -> bool {
    if rc.device_type() != DeviceType::Desktop {
        return false;
    }
    let executable = rc.executable();
    requests.iter().any(|request| {
        targets_for_selection(&request.project, selection)
            .into_iter()
            .filter(|t| t.kit.device_type == DeviceType::Desktop)
            .any(|t| {
                build_configs_for_selection(t, selection)
                    .into_iter()
                    .any(|bc| executable.starts_with(&bc.build_directory))
            })
    })
}

fn is_stoppable(
    rc: &Arc<dyn RunControlHandle>,
    policy: StopPolicy,
    requests: &[BuildRequest],
    selection: ConfigSelection,
    for_run_config: Option<&RunConfigHandle>,
    starter: Option<&RunControlId>,
) -> bool {
    // A run control that itself triggered this build is never asked to
    // stop itself.
    if starter.is_some_and(|id| *id == rc.id()) {
        return false;
    }
    if !rc.is_running() {
        return false;
    }

    match policy {
        StopPolicy::None => false,
        StopPolicy::All => true,
        StopPolicy::SameProject => requests
            .iter()
            .any(|request| request.project.id == rc.project()),
        StopPolicy::SameBuildDir => matches_same_build_dir(rc.as_ref(), requests, selection),
        StopPolicy::SameApp => match for_run_config {
            Some(run_config) => rc.target_executable() == run_config.target_executable,
            None => false,
        },
    }
}

/// Evaluate the policy against the running processes and stop the matches
///
/// Returns [`StopOutcome::Canceled`] only when the user cancels the
/// termination wait; declining the confirmation prompt proceeds without
/// stopping anything.
pub async fn evaluate(
    policy: StopPolicy,
    prompt: bool,
    requests: &[BuildRequest],
    selection: ConfigSelection,
    for_run_config: Option<&RunConfigHandle>,
    starter: Option<&RunControlId>,
    registry: &dyn RunningProcessRegistry,
    interaction: &dyn StopInteraction,
) -> StopOutcome {
    if policy == StopPolicy::None {
        return StopOutcome::Proceed;
    }

    // Without a run context the same-app policy can still protect the
    // build directory.
    let effective = if policy == StopPolicy::SameApp && for_run_config.is_none() {
        StopPolicy::SameBuildDir
    } else {
        policy
    };

    let to_stop: Vec<Arc<dyn RunControlHandle>> = registry
        .run_controls()
        .into_iter()
        .filter(|rc| is_stoppable(rc, effective, requests, selection, for_run_config, starter))
        .collect();

    if to_stop.is_empty() {
        return StopOutcome::Proceed;
    }

    if prompt {
        let names: Vec<String> = to_stop.iter().map(|rc| rc.display_name()).collect();
        if !interaction.confirm_stop(&names).await {
            tracing::debug!("user declined to stop running applications");
            return StopOutcome::Proceed;
        }
    }

    for rc in &to_stop {
        tracing::info!(name = %rc.display_name(), "stopping application before build");
        rc.initiate_stop();
    }

    match interaction.wait_for_stop(to_stop).await {
        WaitOutcome::Stopped => StopOutcome::Proceed,
        WaitOutcome::Canceled => StopOutcome::Canceled,
    }
}
