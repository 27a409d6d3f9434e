//! The build manager facade
//!
//! Public entry points for build/clean/rebuild/deploy requests, the
//! queue/pending-queue state machine, and the wiring between stop policy,
//! queue expansion, active counters, parse gate, and scheduler. One
//! `BuildManager` is constructed by the host at startup; all public
//! operations return a status instead of an error, and every terminal
//! condition surfaces as a [`BuildEvent`].

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::events::{BuildEvent, Diagnostic, EventSender, OutputFormat};
use crate::model::{
    ConfigId, ProjectId, ProjectModel, Purpose, RunConfigHandle, RunControlId,
    RunningProcessRegistry, TargetId,
};
use crate::settings::{BuildBeforeRunMode, BuildSettings, StopPolicy};

use super::counters::ActiveCounters;
use super::parse_gate;
use super::queue::{self, BuildItem, BuildRequest, ConfigSelection, Expansion};
use super::scheduler::{build_tree, AbortPolicy, RunOutcome, Scheduler};
use super::stop::{self, StopInteraction, StopOutcome};

/// Result of a queue request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    /// The operation was aborted before anything was enqueued
    Aborted,
    /// Nothing to do; reported as immediate success
    Empty,
    /// Number of items enqueued
    Queued(usize),
}

/// Result of `potentially_build_for_run_config`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildForRunConfigStatus {
    /// Queueing failed or was aborted; the run must not proceed
    BuildFailed,
    /// A build/deploy is in flight for the run's project
    Building,
    /// Nothing to build; the run may start immediately
    NotBuilding,
}

#[derive(Default)]
struct QueueState {
    queue: Vec<BuildItem>,
    pending: Vec<BuildItem>,
    running: bool,
    deploying: bool,
    cancel: Option<CancellationToken>,
}

struct Inner {
    settings: BuildSettings,
    model: Arc<dyn ProjectModel>,
    registry: Arc<dyn RunningProcessRegistry>,
    interaction: Arc<dyn StopInteraction>,
    events: EventSender,
    counters: Mutex<ActiveCounters>,
    state: Mutex<QueueState>,
}

/// The build orchestration facade
pub struct BuildManager {
    inner: Arc<Inner>,
}

impl BuildManager {
    /// Construct the manager and hand back the event stream
    pub fn new(
        settings: BuildSettings,
        model: Arc<dyn ProjectModel>,
        registry: Arc<dyn RunningProcessRegistry>,
        interaction: Arc<dyn StopInteraction>,
    ) -> (Self, mpsc::UnboundedReceiver<BuildEvent>) {
        let (events, rx) = EventSender::channel();
        let inner = Arc::new(Inner {
            settings,
            model,
            registry,
            interaction,
            events,
            counters: Mutex::new(ActiveCounters::new()),
            state: Mutex::new(QueueState::default()),
        });
        (Self { inner }, rx)
    }

    // --- Entry points -----------------------------------------------------

    /// Build the active configuration of one project, without dependencies
    pub async fn build_project(&self, project: &ProjectId) -> QueueOutcome {
        self.request_single(project, &[Purpose::Build]).await
    }

    /// Clean the active configuration of one project, without dependencies
    pub async fn clean_project(&self, project: &ProjectId) -> QueueOutcome {
        self.request_single(project, &[Purpose::Clean]).await
    }

    /// Clean, then build one project, without dependencies
    pub async fn rebuild_project(&self, project: &ProjectId) -> QueueOutcome {
        self.request_single(project, &[Purpose::Clean, Purpose::Build])
            .await
    }

    /// Build a project and its dependencies in dependency order
    pub async fn build_project_with_dependencies(
        &self,
        project: &ProjectId,
        selection: ConfigSelection,
        starter: Option<RunControlId>,
    ) -> QueueOutcome {
        let requests = self.dependent_requests(project, &[Purpose::Build]);
        self.queue_requests(requests, selection, None, starter).await
    }

    /// Clean a project and its dependencies in dependency order
    pub async fn clean_project_with_dependencies(
        &self,
        project: &ProjectId,
        selection: ConfigSelection,
    ) -> QueueOutcome {
        let requests = self.dependent_requests(project, &[Purpose::Clean]);
        self.queue_requests(requests, selection, None, None).await
    }

    /// Rebuild a project and its dependencies in dependency order
    pub async fn rebuild_project_with_dependencies(
        &self,
        project: &ProjectId,
        selection: ConfigSelection,
    ) -> QueueOutcome {
        let requests = self.dependent_requests(project, &[Purpose::Clean, Purpose::Build]);
        self.queue_requests(requests, selection, None, None).await
    }

    /// Build the given projects in session build order
    pub async fn build_projects(
        &self,
        projects: &[ProjectId],
        selection: ConfigSelection,
    ) -> QueueOutcome {
        let requests = queue::ordered_requests(self.inner.model.as_ref(), projects, &[Purpose::Build]);
        self.queue_requests(requests, selection, None, None).await
    }

    /// Clean the given projects in session build order
    pub async fn clean_projects(
        &self,
        projects: &[ProjectId],
        selection: ConfigSelection,
    ) -> QueueOutcome {
        let requests = queue::ordered_requests(self.inner.model.as_ref(), projects, &[Purpose::Clean]);
        self.queue_requests(requests, selection, None, None).await
    }

    /// Clean, then build the given projects in session build order
    pub async fn rebuild_projects(
        &self,
        projects: &[ProjectId],
        selection: ConfigSelection,
    ) -> QueueOutcome {
        let requests = queue::ordered_requests(
            self.inner.model.as_ref(),
            projects,
            &[Purpose::Clean, Purpose::Build],
        );
        self.queue_requests(requests, selection, None, None).await
    }

    /// Deploy the given projects, building first if settings say so
    pub async fn deploy_projects(&self, projects: &[ProjectId]) -> QueueOutcome {
        let mut purposes = Vec::new();
        if self.inner.settings.build_before_deploy != BuildBeforeRunMode::Off {
            purposes.push(Purpose::Build);
        }
        purposes.push(Purpose::Deploy);
        let requests = queue::ordered_requests(self.inner.model.as_ref(), projects, &purposes);
        self.queue_requests(requests, ConfigSelection::Active, None, None)
            .await
    }

    /// Queue whatever a run request needs before launching
    ///
    /// Builds unless a build is already in flight, deploys unless a deploy
    /// is already in flight, honoring the deploy-before-run settings.
    pub async fn potentially_build_for_run_config(
        &self,
        run_config: &RunConfigHandle,
        starter: Option<RunControlId>,
    ) -> BuildForRunConfigStatus {
        let mut purposes = Vec::new();
        if self.inner.settings.deploy_before_run {
            if !self.is_building()
                && self.inner.settings.build_before_deploy != BuildBeforeRunMode::Off
            {
                purposes.push(Purpose::Build);
            }
            if !self.is_deploying() {
                purposes.push(Purpose::Deploy);
            }
        }

        let requests = self.dependent_requests(&run_config.project, &purposes);
        let outcome = self
            .queue_requests(requests, ConfigSelection::Active, Some(run_config), starter)
            .await;

        match outcome {
            QueueOutcome::Aborted => BuildForRunConfigStatus::BuildFailed,
            QueueOutcome::Queued(_) => BuildForRunConfigStatus::Building,
            QueueOutcome::Empty => {
                if self.is_building_project(&run_config.project) {
                    BuildForRunConfigStatus::Building
                } else {
                    BuildForRunConfigStatus::NotBuilding
                }
            }
        }
    }

    /// Cancel the running queue and discard all pending work
    pub fn cancel(&self) {
        let token = {
            let state = self.inner.state.lock().expect("queue state poisoned");
            if !state.running {
                return;
            }
            state.cancel.clone()
        };
        if let Some(token) = token {
            tracing::info!("canceling build queue");
            token.cancel();
        }
    }

    /// Cancel the queue if the given project is currently building
    ///
    /// Called by the host before a project is removed from the session.
    /// Cancelling everything is heavy-handed but safe.
    pub fn project_about_to_be_removed(&self, project: &ProjectId) {
        let building = self
            .inner
            .counters
            .lock()
            .expect("counters poisoned")
            .is_building_project(project);
        if building {
            self.cancel();
        }
    }

    // --- Queries ----------------------------------------------------------

    /// True while anything is queued or pending, even before the first
    /// step starts
    pub fn is_building(&self) -> bool {
        let state = self.inner.state.lock().expect("queue state poisoned");
        !state.queue.is_empty() || !state.pending.is_empty()
    }

    /// True while any queued purpose is Deploy
    pub fn is_deploying(&self) -> bool {
        self.inner.state.lock().expect("queue state poisoned").deploying
    }

    pub fn is_building_project(&self, id: &ProjectId) -> bool {
        self.inner
            .counters
            .lock()
            .expect("counters poisoned")
            .is_building_project(id)
    }

    pub fn is_building_target(&self, id: &TargetId) -> bool {
        self.inner
            .counters
            .lock()
            .expect("counters poisoned")
            .is_building_target(id)
    }

    pub fn is_building_configuration(&self, id: &ConfigId) -> bool {
        self.inner
            .counters
            .lock()
            .expect("counters poisoned")
            .is_building_configuration(id)
    }

    // --- Internals --------------------------------------------------------

    fn dependent_requests(&self, project: &ProjectId, purposes: &[Purpose]) -> Vec<BuildRequest> {
        queue::requests_with_dependencies(
            self.inner.model.as_ref(),
            project,
            purposes,
            self.inner.settings.deploy_project_dependencies,
        )
    }

    async fn request_single(&self, project: &ProjectId, purposes: &[Purpose]) -> QueueOutcome {
        let requests = match self.inner.model.project(project) {
            Some(project) => vec![BuildRequest {
                project,
                purposes: purposes.to_vec(),
            }],
            None => {
                tracing::warn!(%project, "request for unknown project");
                Vec::new()
            }
        };
        self.queue_requests(requests, ConfigSelection::Active, None, None)
            .await
    }

    async fn queue_requests(
        &self,
        requests: Vec<BuildRequest>,
        selection: ConfigSelection,
        for_run_config: Option<&RunConfigHandle>,
        starter: Option<RunControlId>,
    ) -> QueueOutcome {
        let inner = &self.inner;

        // Stop-before-build applies only when the main request builds.
        let main_builds = requests
            .last()
            .is_some_and(|r| r.purposes.contains(&Purpose::Build));
        if inner.settings.stop_before_build != StopPolicy::None && main_builds {
            let outcome = stop::evaluate(
                inner.settings.stop_before_build,
                inner.settings.prompt_to_stop,
                &requests,
                selection,
                for_run_config,
                starter.as_ref(),
                inner.registry.as_ref(),
                inner.interaction.as_ref(),
            )
            .await;
            if outcome == StopOutcome::Canceled {
                tracing::info!("build aborted while waiting for applications to stop");
                return QueueOutcome::Aborted;
            }
        }

        let Expansion { items, preamble } = queue::expand(&requests, selection);

        if items.is_empty() {
            let idle = {
                let state = inner.state.lock().expect("queue state poisoned");
                state.queue.is_empty() && state.pending.is_empty()
            };
            if idle {
                inner.events.queue_finished(true);
            }
            return QueueOutcome::Empty;
        }

        let count = items.len();
        let deploys = items.iter().any(|i| i.purpose == Purpose::Deploy);

        // Counters reflect pending work too, so occupancy queries are
        // truthful the moment the request is accepted.
        {
            let mut counters = inner.counters.lock().expect("counters poisoned");
            for item in items.iter().filter(|i| i.enabled) {
                if counters.increment(item) {
                    inner.events.build_state_changed(item.project.clone());
                }
            }
        }

        let spawn_token = {
            let mut state = inner.state.lock().expect("queue state poisoned");
            state.deploying = state.deploying || deploys;
            if state.running {
                state.pending.extend(items);
                None
            } else {
                state.queue = items;
                state.running = true;
                let token = CancellationToken::new();
                state.cancel = Some(token.clone());
                Some(token)
            }
        };

        if let Some(token) = spawn_token {
            // The preamble belongs to the queue that is about to start;
            // requests chained onto a running queue drop it.
            for line in &preamble {
                inner.events.output(line.clone(), OutputFormat::NormalMessage);
            }
            let inner = Arc::clone(&self.inner);
            tokio::spawn(run_loop(inner, token));
        }
        QueueOutcome::Queued(count)
    }
}

/// Drains the queue, then any promoted pending queues, on a spawned task.
async fn run_loop(inner: Arc<Inner>, token: CancellationToken) {
    loop {
        let items = {
            let state = inner.state.lock().expect("queue state poisoned");
            state.queue.clone()
        };
        let started = Instant::now();

        let outcome = run_one_queue(&inner, &items, &token).await;

        // Cleanup: release counters for every item of this queue, run or
        // not, and clear the drained queue.
        let mut internal_error = false;
        {
            let mut counters = inner.counters.lock().expect("counters poisoned");
            let mut state = inner.state.lock().expect("queue state poisoned");
            state.queue.clear();
            for item in items.iter().filter(|i| i.enabled) {
                match counters.decrement(item) {
                    Ok(true) => inner.events.build_state_changed(item.project.clone()),
                    Ok(false) => {}
                    Err(error) => {
                        tracing::error!(%error, "internal counter error; failing the run");
                        internal_error = true;
                    }
                }
            }
        }

        inner.events.output(
            format_elapsed(started.elapsed()),
            OutputFormat::NormalMessage,
        );

        if token.is_cancelled() {
            // Explicit cancel also discards pending work. Pending must be
            // taken and the running flag cleared in one critical section:
            // a request that wins the lock in between would append to a
            // pending queue no task will ever drain.
            let pending = {
                let mut state = inner.state.lock().expect("queue state poisoned");
                state.running = false;
                state.deploying = false;
                state.cancel = None;
                std::mem::take(&mut state.pending)
            };
            {
                let mut counters = inner.counters.lock().expect("counters poisoned");
                for item in pending.iter().filter(|i| i.enabled) {
                    match counters.decrement(item) {
                        Ok(true) => inner.events.build_state_changed(item.project.clone()),
                        Ok(false) => {}
                        Err(error) => {
                            tracing::error!(%error, "internal counter error during cancel");
                        }
                    }
                }
            }
            inner
                .events
                .output("Canceled build/deployment.", OutputFormat::ErrorMessage);
            inner.events.queue_finished(false);
            return;
        }

        let success = outcome == RunOutcome::Success && !internal_error;
        inner.events.queue_finished(success);

        let promoted = {
            let mut state = inner.state.lock().expect("queue state poisoned");
            if state.pending.is_empty() {
                state.running = false;
                state.deploying = false;
                state.cancel = None;
                false
            } else {
                state.queue = std::mem::take(&mut state.pending);
                true
            }
        };
        if !promoted {
            return;
        }
    }
}

async fn run_one_queue(
    inner: &Arc<Inner>,
    items: &[BuildItem],
    token: &CancellationToken,
) -> RunOutcome {
    // Parse precondition: no step runs while an involved build system is
    // still recomputing its project model.
    let systems = parse_gate::build_systems_of(items);
    if !systems.is_empty() {
        let gate = tokio::select! {
            () = token.cancelled() => return RunOutcome::Canceled,
            ok = parse_gate::await_parsing(&systems) => ok,
        };
        if !gate {
            inner.events.diagnostic(Diagnostic::error(
                "Project parsing failed; no build steps were started.",
            ));
            return RunOutcome::Failed;
        }
    }

    let policy = if inner.settings.abort_all_on_error {
        AbortPolicy::StopOnError
    } else {
        AbortPolicy::ContinueOnError
    };
    let total = items.iter().filter(|i| i.enabled).count();
    let tree = build_tree(items, policy);
    let mut scheduler = Scheduler::new(inner.events.clone(), token.clone(), total);
    scheduler.run(tree).await
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("Elapsed time: {:02}:{:02}.", secs / 60, secs % 60)
}
