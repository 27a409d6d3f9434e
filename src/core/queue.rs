//! Request ordering and expansion into queued items
//!
//! Turns a set of (project, purposes) requests into the flat, ordered list
//! of immutable step snapshots the scheduler consumes, honoring dependency
//! order, configuration selection, and skip rules for unconfigured
//! projects.

use std::sync::Arc;

use crate::model::{
    BuildConfiguration, ConfigId, Kit, Project, ProjectId, ProjectModel, Purpose, Step, StepList,
    Target, TargetId,
};

/// Which targets/configurations of a project participate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSelection {
    /// Only the active target and its active configuration
    Active,
    /// Every target and every configuration of the requested kind
    All,
}

/// One (project, purposes) request
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub project: Arc<Project>,
    pub purposes: Vec<Purpose>,
}

/// The queued, immutable unit the scheduler consumes
///
/// Snapshots everything the scheduler and the failure diagnostics need, so
/// a queued run never reads back into the mutable project model.
#[derive(Debug, Clone)]
pub struct BuildItem {
    pub step: Step,
    /// Enabled flag at queue time
    pub enabled: bool,
    /// Display name of the owning step list ("Build", "Clean", "Deploy")
    pub list_name: String,
    pub purpose: Purpose,
    pub project: ProjectId,
    pub project_name: String,
    pub target: TargetId,
    pub target_name: String,
    pub config: ConfigId,
    /// Kit snapshot for failure hints
    pub kit: Kit,
}

/// Result of expanding requests into a queue
#[derive(Debug, Default)]
pub struct Expansion {
    pub items: Vec<BuildItem>,
    /// Diagnostics to print before the first step (skipped projects,
    /// unprepared build devices); not errors
    pub preamble: Vec<String>,
}

pub(crate) fn targets_for_selection(
    project: &Project,
    selection: ConfigSelection,
) -> Vec<&Target> {
    match selection {
        ConfigSelection::All => project.targets.iter().collect(),
        ConfigSelection::Active => project.active_target().into_iter().collect(),
    }
}

pub(crate) fn build_configs_for_selection(
    target: &Target,
    selection: ConfigSelection,
) -> Vec<&BuildConfiguration> {
    match selection {
        ConfigSelection::All => target.build_configurations.iter().collect(),
        ConfigSelection::Active => target.active_build_configuration().into_iter().collect(),
    }
}

/// Order the given projects by the session build order, dropping unknown
/// ids and keeping one request per project.
pub fn ordered_requests(
    model: &dyn ProjectModel,
    projects: &[ProjectId],
    purposes: &[Purpose],
) -> Vec<BuildRequest> {
    model
        .build_order()
        .into_iter()
        .filter(|p| projects.contains(&p.id))
        .map(|project| BuildRequest {
            project,
            purposes: purposes.to_vec(),
        })
        .collect()
}

/// Expand `root` into its transitive dependencies in build order, root
/// last. Dependencies additionally deploy when the main request builds and
/// policy propagates deployment to dependencies.
pub fn requests_with_dependencies(
    model: &dyn ProjectModel,
    root: &ProjectId,
    purposes: &[Purpose],
    propagate_deploy: bool,
) -> Vec<BuildRequest> {
    let mut dep_purposes = purposes.to_vec();
    if propagate_deploy
        && dep_purposes.contains(&Purpose::Build)
        && !dep_purposes.contains(&Purpose::Deploy)
    {
        dep_purposes.push(Purpose::Deploy);
    }

    let mut requests: Vec<BuildRequest> = model
        .dependency_order(root)
        .into_iter()
        .map(|project| BuildRequest {
            project,
            purposes: dep_purposes.clone(),
        })
        .collect();

    // The root itself keeps exactly what was asked for.
    if let Some(last) = requests.last_mut() {
        if last.project.id == *root {
            last.purposes = purposes.to_vec();
        }
    }
    requests
}

fn push_list(items: &mut Vec<BuildItem>, list: &StepList, project: &Project, target: &Target, config: &ConfigId) {
    if list.is_empty() {
        return;
    }
    for step in &list.steps {
        items.push(BuildItem {
            step: step.clone(),
            enabled: step.enabled,
            list_name: list.purpose.display_name().to_string(),
            purpose: list.purpose,
            project: project.id.clone(),
            project_name: project.display_name.clone(),
            target: target.id.clone(),
            target_name: target.display_name.clone(),
            config: config.clone(),
            kit: target.kit.clone(),
        });
    }
}

/// Expand ordered requests into the flat queue
///
/// Unconfigured projects contribute a preamble notice and no items; an
/// empty step list contributes nothing. An overall empty result means
/// "nothing to build" and the caller reports immediate success.
pub fn expand(requests: &[BuildRequest], selection: ConfigSelection) -> Expansion {
    let mut expansion = Expansion::default();

    for request in requests {
        if request.project.needs_configuration {
            tracing::info!(project = %request.project.id, "skipping unconfigured project");
            expansion.preamble.push(format!(
                "The project {} is not configured, skipping it.",
                request.project.display_name
            ));
        }
    }

    for request in requests {
        for target in targets_for_selection(&request.project, selection) {
            if target.kit.device_ready {
                continue;
            }
            if build_configs_for_selection(target, selection).is_empty() {
                continue;
            }
            expansion.preamble.push(format!(
                "The build device failed to prepare for the build of {} ({}).",
                request.project.display_name, target.display_name
            ));
        }
    }

    for request in requests {
        let project = &request.project;
        if project.needs_configuration {
            continue;
        }

        for purpose in &request.purposes {
            for target in targets_for_selection(project, selection) {
                match purpose {
                    Purpose::Build => {
                        for bc in build_configs_for_selection(target, selection) {
                            push_list(&mut expansion.items, &bc.build_steps, project, target, &bc.id);
                        }
                    }
                    Purpose::Clean => {
                        for bc in build_configs_for_selection(target, selection) {
                            push_list(&mut expansion.items, &bc.clean_steps, project, target, &bc.id);
                        }
                    }
                    Purpose::Deploy => {
                        if let Some(dc) = target.active_deploy_configuration() {
                            push_list(&mut expansion.items, &dc.deploy_steps, project, target, &dc.id);
                        }
                    }
                }
            }
        }
    }

    expansion
}
