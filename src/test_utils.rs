//! Shared fixtures for unit tests
//!
//! Fake collaborators and small builders for queued items, projects, and
//! project models. Compiled only for tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::sync::watch;

use crate::core::queue::BuildItem;
use crate::events::StepContext;
use crate::model::{
    BuildConfiguration, BuildSystemHandle, ConfigId, DeployConfiguration, DeviceType, Kit,
    Project, ProjectId, ProjectModel, Purpose, RunControlHandle, RunControlId,
    RunningProcessRegistry, Step, StepId, StepList, StepRecipe, Target, TargetId,
};

// --- Recipes ---------------------------------------------------------------

struct NoopRecipe;

impl StepRecipe for NoopRecipe {
    fn run(&self, _ctx: StepContext) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Shared execution log scripted recipes append their step name to
#[derive(Debug, Clone, Default)]
pub struct ScriptLog(Arc<Mutex<Vec<String>>>);

impl ScriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: &str) {
        self.0.lock().unwrap().push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct ScriptedRecipe {
    log: ScriptLog,
    name: String,
    result: Result<(), String>,
}

impl StepRecipe for ScriptedRecipe {
    fn run(&self, _ctx: StepContext) -> BoxFuture<'static, anyhow::Result<()>> {
        let log = self.log.clone();
        let name = self.name.clone();
        let result = self.result.clone();
        Box::pin(async move {
            log.push(&name);
            result.map_err(|message| anyhow::anyhow!(message))
        })
    }
}

// --- Queued items ----------------------------------------------------------

fn step(name: &str, enabled: bool, recipe: Arc<dyn StepRecipe>) -> Step {
    Step {
        id: StepId::from(name),
        display_name: name.to_string(),
        enabled,
        recipe,
        build_system: None,
    }
}

fn item_from_step(step: Step, project: &str, target: &str, config: &str) -> BuildItem {
    let enabled = step.enabled;
    BuildItem {
        step,
        enabled,
        list_name: "Build".to_string(),
        purpose: Purpose::Build,
        project: ProjectId::from(project),
        project_name: project.to_string(),
        target: TargetId::from(target),
        target_name: target.to_string(),
        config: ConfigId::from(config),
        kit: Kit::desktop(format!("{target}-kit")),
    }
}

/// One queued item with a no-op recipe
pub fn build_item(
    project: &str,
    target: &str,
    config: &str,
    step_name: &str,
    enabled: bool,
) -> BuildItem {
    item_from_step(
        step(step_name, enabled, Arc::new(NoopRecipe)),
        project,
        target,
        config,
    )
}

/// One queued item bound to a build system handle
pub fn build_item_with_system(name: &str, system: Arc<dyn BuildSystemHandle>) -> BuildItem {
    let mut item = build_item(
        name,
        &format!("{name}-t1"),
        &format!("{name}-t1-debug"),
        "compile",
        true,
    );
    item.step.build_system = Some(system);
    item
}

/// One queued item whose recipe logs its step name, then returns `result`
pub fn scripted_item(
    log: &ScriptLog,
    project: &str,
    target: &str,
    step_name: &str,
    result: Result<(), &str>,
) -> BuildItem {
    let recipe = ScriptedRecipe {
        log: log.clone(),
        name: step_name.to_string(),
        result: result.map_err(str::to_string),
    };
    item_from_step(
        step(step_name, true, Arc::new(recipe)),
        project,
        target,
        &format!("{target}-cfg"),
    )
}

// --- Projects --------------------------------------------------------------

/// Step declaration for fixture targets
#[derive(Debug, Clone)]
pub struct StepSpec {
    pub name: String,
    pub enabled: bool,
}

impl StepSpec {
    pub fn enabled(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
        }
    }

    pub fn disabled(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: false,
        }
    }
}

fn step_list(purpose: Purpose, specs: &[StepSpec]) -> StepList {
    let mut list = StepList::new(purpose);
    for spec in specs {
        list.steps
            .push(step(&spec.name, spec.enabled, Arc::new(NoopRecipe)));
    }
    list
}

/// One desktop target with the given build steps
///
/// Non-empty build steps get one "clean" and one "deploy" step alongside;
/// an empty spec yields a target with nothing to do for any purpose. The
/// single build configuration's directory is `/builds/<name>`.
pub fn target_with_steps(name: &str, specs: &[StepSpec]) -> Target {
    let (clean, deploy) = if specs.is_empty() {
        (Vec::new(), Vec::new())
    } else {
        (
            vec![StepSpec::enabled("clean")],
            vec![StepSpec::enabled("deploy")],
        )
    };

    Target {
        id: TargetId::from(format!("{name}-t1").as_str()),
        display_name: format!("{name}-t1"),
        kit: Kit::desktop(format!("{name}-kit")),
        build_configurations: vec![BuildConfiguration {
            id: ConfigId::from(format!("{name}-t1-debug").as_str()),
            display_name: "Debug".to_string(),
            build_directory: PathBuf::from(format!("/builds/{name}")),
            build_steps: step_list(Purpose::Build, specs),
            clean_steps: step_list(Purpose::Clean, &clean),
        }],
        active_build_configuration: Some(0),
        deploy_configurations: vec![DeployConfiguration {
            id: ConfigId::from(format!("{name}-t1-deploy").as_str()),
            display_name: "Deploy".to_string(),
            deploy_steps: step_list(Purpose::Deploy, &deploy),
        }],
        active_deploy_configuration: Some(0),
    }
}

/// Declarative fixture project
#[derive(Debug, Clone)]
pub struct ProjectSpec {
    pub name: String,
    pub step_names: Vec<String>,
    pub deps: Vec<String>,
    pub needs_configuration: bool,
    /// Additional build configurations cloned from the first one
    pub extra_build_configs: usize,
}

impl ProjectSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            step_names: Vec::new(),
            deps: Vec::new(),
            needs_configuration: false,
            extra_build_configs: 0,
        }
    }

    pub fn steps(mut self, names: &[&str]) -> Self {
        self.step_names = names.iter().map(|n| (*n).to_string()).collect();
        self
    }

    pub fn depends_on(mut self, deps: &[&str]) -> Self {
        self.deps = deps.iter().map(|d| (*d).to_string()).collect();
        self
    }
}

/// One single-target project from a [`ProjectSpec`]
pub fn project_with_steps(spec: ProjectSpec) -> Arc<Project> {
    let step_specs: Vec<StepSpec> = spec.step_names.iter().map(|n| StepSpec::enabled(n)).collect();
    let mut target = target_with_steps(&spec.name, &step_specs);

    for i in 0..spec.extra_build_configs {
        let mut config = target.build_configurations[0].clone();
        config.id = ConfigId::from(format!("{}-t1-extra{i}", spec.name).as_str());
        config.display_name = format!("Extra {i}");
        config.build_directory = PathBuf::from(format!("/builds/{}/extra{i}", spec.name));
        target.build_configurations.push(config);
    }

    Arc::new(Project {
        id: ProjectId::from(spec.name.as_str()),
        display_name: spec.name.clone(),
        needs_configuration: spec.needs_configuration,
        targets: vec![target],
        active_target: Some(0),
    })
}

/// In-memory project model with explicit dependency edges
pub struct FixtureModel {
    projects: Vec<Arc<Project>>,
    deps: HashMap<ProjectId, Vec<ProjectId>>,
}

impl FixtureModel {
    fn visit(&self, id: &ProjectId, seen: &mut Vec<ProjectId>, out: &mut Vec<Arc<Project>>) {
        if seen.contains(id) {
            return;
        }
        seen.push(id.clone());
        if let Some(deps) = self.deps.get(id) {
            for dep in deps {
                self.visit(dep, seen, out);
            }
        }
        if let Some(project) = self.projects.iter().find(|p| p.id == *id) {
            out.push(Arc::clone(project));
        }
    }
}

impl ProjectModel for FixtureModel {
    fn projects(&self) -> Vec<Arc<Project>> {
        self.projects.clone()
    }

    fn project(&self, id: &ProjectId) -> Option<Arc<Project>> {
        self.projects.iter().find(|p| p.id == *id).cloned()
    }

    fn build_order(&self) -> Vec<Arc<Project>> {
        let mut seen = Vec::new();
        let mut out = Vec::new();
        for project in &self.projects {
            self.visit(&project.id, &mut seen, &mut out);
        }
        out
    }

    fn dependency_order(&self, root: &ProjectId) -> Vec<Arc<Project>> {
        let mut seen = Vec::new();
        let mut out = Vec::new();
        self.visit(root, &mut seen, &mut out);
        out
    }
}

/// Build a [`FixtureModel`] from project specs
pub fn fixture_model(specs: &[ProjectSpec]) -> Arc<FixtureModel> {
    let projects = specs.iter().map(|s| project_with_steps(s.clone())).collect();
    let deps = specs
        .iter()
        .map(|s| {
            (
                ProjectId::from(s.name.as_str()),
                s.deps.iter().map(|d| ProjectId::from(d.as_str())).collect(),
            )
        })
        .collect();
    Arc::new(FixtureModel { projects, deps })
}

// --- Fake collaborators ----------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct ParseState {
    parsing: bool,
    completions: usize,
    last_result: bool,
}

/// Build system fake with script-controlled parse state
///
/// Parse state lives in one watch channel so `parsing_finished` can
/// resolve immediately with the last result when no parse is in flight,
/// as the trait requires.
pub struct FakeBuildSystem {
    state: watch::Sender<ParseState>,
}

impl FakeBuildSystem {
    fn with_parsing(parsing: bool) -> Self {
        Self {
            state: watch::channel(ParseState {
                parsing,
                completions: 0,
                last_result: true,
            })
            .0,
        }
    }

    pub fn idle() -> Self {
        Self::with_parsing(false)
    }

    pub fn parsing() -> Self {
        Self::with_parsing(true)
    }

    pub fn start_parsing(&self) {
        self.state.send_modify(|s| s.parsing = true);
    }

    pub fn finish_parsing(&self, success: bool) {
        self.state.send_modify(|s| {
            s.parsing = false;
            s.completions += 1;
            s.last_result = success;
        });
    }
}

impl BuildSystemHandle for FakeBuildSystem {
    fn is_parsing(&self) -> bool {
        self.state.borrow().parsing
    }

    fn parsing_finished(&self) -> BoxFuture<'static, bool> {
        let mut rx = self.state.subscribe();
        let seen = rx.borrow().completions;
        Box::pin(async move {
            loop {
                {
                    let state = rx.borrow_and_update();
                    if state.completions != seen || !state.parsing {
                        return state.last_result;
                    }
                }
                if rx.changed().await.is_err() {
                    return false;
                }
            }
        })
    }
}

/// Run control fake recording stop requests
pub struct FakeRunControl {
    pub id: String,
    pub project: String,
    pub executable: PathBuf,
    pub target_executable: PathBuf,
    pub device_type: DeviceType,
    running: AtomicBool,
    stop_requested: AtomicBool,
}

impl FakeRunControl {
    fn new(id: &str, project: &str, running: bool) -> Self {
        Self {
            id: id.to_string(),
            project: project.to_string(),
            executable: PathBuf::from(format!("/proc/{id}")),
            target_executable: PathBuf::from(format!("/proc/{id}")),
            device_type: DeviceType::Desktop,
            running: AtomicBool::new(running),
            stop_requested: AtomicBool::new(false),
        }
    }

    pub fn running(id: &str, project: &str) -> Self {
        Self::new(id, project, true)
    }

    pub fn stopped(id: &str, project: &str) -> Self {
        Self::new(id, project, false)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }
}

impl RunControlHandle for FakeRunControl {
    fn id(&self) -> RunControlId {
        RunControlId::from(self.id.as_str())
    }

    fn display_name(&self) -> String {
        self.id.clone()
    }

    fn project(&self) -> ProjectId {
        ProjectId::from(self.project.as_str())
    }

    fn executable(&self) -> PathBuf {
        self.executable.clone()
    }

    fn target_executable(&self) -> PathBuf {
        self.target_executable.clone()
    }

    fn device_type(&self) -> DeviceType {
        self.device_type
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn initiate_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    fn wait_for_stop(&self) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}

/// Registry fake over a fixed set of run controls
pub struct FakeRegistry {
    pub controls: Vec<Arc<FakeRunControl>>,
}

impl FakeRegistry {
    pub fn new(controls: Vec<FakeRunControl>) -> Self {
        Self {
            controls: controls.into_iter().map(Arc::new).collect(),
        }
    }
}

impl RunningProcessRegistry for FakeRegistry {
    fn run_controls(&self) -> Vec<Arc<dyn RunControlHandle>> {
        self.controls
            .iter()
            .map(|rc| Arc::clone(rc) as Arc<dyn RunControlHandle>)
            .collect()
    }
}
