//! Execution tree construction and interpretation
//!
//! The queued items are shaped into an explicit tree of tagged variants:
//! a leaf per enabled step, a notice per banner or skipped step, and
//! groups carrying an abort policy. Items of one target form a
//! stop-on-error group so its steps run strictly sequentially; the
//! top-level group's policy decides whether a failing target stops its
//! siblings. One recursive async loop interprets the tree, which keeps
//! cancellation and progress accounting in a single place.

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::events::{Diagnostic, EventSender, OutputFormat, StepContext, StepEvents};

use super::queue::BuildItem;

/// How a group reacts to a failing child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortPolicy {
    StopOnError,
    ContinueOnError,
}

/// Node of the execution tree
#[derive(Debug)]
pub enum ExecNode {
    /// Run one step recipe
    Leaf(BuildItem),
    /// Print a status line; always succeeds
    Notice(String),
    /// Run children in order under an abort policy
    Group {
        policy: AbortPolicy,
        children: Vec<ExecNode>,
    },
}

/// Terminal state of a node or of the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed,
    Canceled,
}

/// Shape the flat queue into the execution tree
///
/// Contiguous runs of one target become a sequential stop-on-error group;
/// a project banner notice is inserted whenever the owning project
/// changes; disabled items become skip notices.
pub fn build_tree(items: &[BuildItem], policy: AbortPolicy) -> ExecNode {
    let mut top_level: Vec<ExecNode> = Vec::new();
    let mut target_children: Vec<ExecNode> = Vec::new();
    let mut last_target = None;
    let mut last_project = None;

    for item in items {
        if last_target.as_ref() != Some(&item.target) {
            if !target_children.is_empty() {
                top_level.push(ExecNode::Group {
                    policy: AbortPolicy::StopOnError,
                    children: std::mem::take(&mut target_children),
                });
            }
            last_target = Some(item.target.clone());
        }

        if last_project.as_ref() != Some(&item.project) {
            target_children.push(ExecNode::Notice(format!(
                "Running steps for project {}...",
                item.project_name
            )));
            last_project = Some(item.project.clone());
        }

        if item.enabled {
            target_children.push(ExecNode::Leaf(item.clone()));
        } else {
            target_children.push(ExecNode::Notice(format!(
                "Skipping disabled step {}.",
                item.step.display_name
            )));
        }
    }
    if !target_children.is_empty() {
        top_level.push(ExecNode::Group {
            policy: AbortPolicy::StopOnError,
            children: target_children,
        });
    }

    ExecNode::Group {
        policy,
        children: top_level,
    }
}

/// Interprets one execution tree, reporting progress and failures
pub struct Scheduler {
    events: EventSender,
    cancel: CancellationToken,
    completed: usize,
    total: usize,
}

impl Scheduler {
    /// `total` is the enabled-item count of the whole run, fixed up front.
    pub fn new(events: EventSender, cancel: CancellationToken, total: usize) -> Self {
        Self {
            events,
            cancel,
            completed: 0,
            total,
        }
    }

    pub async fn run(&mut self, tree: ExecNode) -> RunOutcome {
        self.run_node(tree).await
    }

    fn run_node<'a>(&'a mut self, node: ExecNode) -> BoxFuture<'a, RunOutcome> {
        Box::pin(async move {
            match node {
                ExecNode::Notice(text) => {
                    self.events.output(text, OutputFormat::NormalMessage);
                    RunOutcome::Success
                }
                ExecNode::Leaf(item) => self.run_step(item).await,
                ExecNode::Group { policy, children } => {
                    let mut failed = false;
                    for child in children {
                        if self.cancel.is_cancelled() {
                            return RunOutcome::Canceled;
                        }
                        match self.run_node(child).await {
                            RunOutcome::Canceled => return RunOutcome::Canceled,
                            RunOutcome::Failed => {
                                if policy == AbortPolicy::StopOnError {
                                    return RunOutcome::Failed;
                                }
                                failed = true;
                            }
                            RunOutcome::Success => {}
                        }
                    }
                    if failed {
                        RunOutcome::Failed
                    } else {
                        RunOutcome::Success
                    }
                }
            }
        })
    }

    async fn run_step(&mut self, item: BuildItem) -> RunOutcome {
        if self.cancel.is_cancelled() {
            return RunOutcome::Canceled;
        }

        tracing::debug!(step = %item.step.display_name, project = %item.project, "starting step");
        let ctx = StepContext {
            events: StepEvents::new(self.events.clone(), self.completed, self.total),
            cancel: self.cancel.child_token(),
        };
        let result = item.step.recipe.run(ctx).await;

        // A finished recipe occupies its progress slot whether it
        // succeeded or not.
        self.completed += 1;
        self.events.progress(
            self.completed as f64 * 100.0 / self.total.max(1) as f64,
            format!("Finished {} of {} steps", self.completed, self.total),
        );

        match result {
            Ok(()) => {
                if self.cancel.is_cancelled() {
                    RunOutcome::Canceled
                } else {
                    RunOutcome::Success
                }
            }
            Err(error) => {
                if self.cancel.is_cancelled() {
                    // A step torn down by cancellation is not a failure.
                    return RunOutcome::Canceled;
                }
                self.report_step_failure(&item, &error);
                RunOutcome::Failed
            }
        }
    }

    fn report_step_failure(&self, item: &BuildItem, error: &anyhow::Error) {
        tracing::warn!(
            step = %item.step.display_name,
            project = %item.project,
            %error,
            "step failed"
        );
        self.events.diagnostic(Diagnostic::error(format!(
            "Error while building/deploying project {} (kit: {})",
            item.project_name, item.target_name
        )));
        self.events.output(format!("{error:#}"), OutputFormat::Stderr);
        if !item.kit.validate().is_empty() {
            self.events.diagnostic(Diagnostic::warning(format!(
                "The kit {} has configuration issues which might be the root cause for this problem.",
                item.kit.display_name
            )));
        }
        self.events.diagnostic(Diagnostic::error(format!(
            "When executing step \"{}\"",
            item.step.display_name
        )));
    }
}
