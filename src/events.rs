//! Event channel published to the host
//!
//! Replaces in-process signal/slot wiring with one typed, in-order,
//! single-consumer channel. The host receives the [`BuildEvent`] stream
//! from the facade constructor and feeds its output pane, diagnostics list,
//! and progress bar from it.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::model::ProjectId;

/// Output stream classification for build output lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Orchestrator status message
    NormalMessage,
    /// Orchestrator error message
    ErrorMessage,
    /// Pass-through of a step's stdout
    Stdout,
    /// Pass-through of a step's stderr
    Stderr,
}

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Error,
    Warning,
}

/// Source location a diagnostic points at, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticLocation {
    pub file: PathBuf,
    pub line: u32,
}

/// One entry for the host's issues list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: Option<DiagnosticLocation>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            message: message.into(),
            location: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            message: message.into(),
            location: None,
        }
    }
}

/// Events the orchestration engine publishes
#[derive(Debug, Clone)]
pub enum BuildEvent {
    /// A project's active-counter crossed the 0/1 boundary
    BuildStateChanged { project: ProjectId },

    /// The build queue fully drained (success, failure, or cancellation)
    QueueFinished { success: bool },

    /// Aggregate progress over the whole run
    Progress { percent: f64, message: String },

    /// One line of build output
    Output { text: String, format: OutputFormat },

    /// One diagnostic for the issues list
    Diagnostic(Diagnostic),
}

/// Sending half of the event channel
///
/// Cloned freely into the scheduler and step contexts. Sending never fails
/// visibly; if the host dropped the receiver the event is discarded.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<BuildEvent>,
}

impl EventSender {
    /// Create the event channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BuildEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: BuildEvent) {
        let _ = self.tx.send(event);
    }

    pub fn output(&self, text: impl Into<String>, format: OutputFormat) {
        self.send(BuildEvent::Output {
            text: text.into(),
            format,
        });
    }

    /// Queue a diagnostic and stream it as error output
    pub fn diagnostic(&self, diagnostic: Diagnostic) {
        self.output(diagnostic.message.clone(), OutputFormat::Stderr);
        self.send(BuildEvent::Diagnostic(diagnostic));
    }

    pub fn progress(&self, percent: f64, message: impl Into<String>) {
        self.send(BuildEvent::Progress {
            percent,
            message: message.into(),
        });
    }

    pub fn build_state_changed(&self, project: ProjectId) {
        self.send(BuildEvent::BuildStateChanged { project });
    }

    pub fn queue_finished(&self, success: bool) {
        self.send(BuildEvent::QueueFinished { success });
    }
}

/// Event surface handed to one running step recipe
///
/// Scales the step's own progress reports into the whole-run percentage.
#[derive(Debug, Clone)]
pub struct StepEvents {
    tx: EventSender,
    completed_before: usize,
    total: usize,
}

impl StepEvents {
    pub(crate) fn new(tx: EventSender, completed_before: usize, total: usize) -> Self {
        Self {
            tx,
            completed_before,
            total,
        }
    }

    pub fn add_output(&self, text: impl Into<String>, format: OutputFormat) {
        self.tx.output(text, format);
    }

    pub fn add_diagnostic(&self, diagnostic: Diagnostic) {
        self.tx.diagnostic(diagnostic);
    }

    /// Report this step's own progress (0-100) with a status text
    pub fn progress(&self, step_percent: u8, text: impl Into<String>) {
        if self.total == 0 {
            return;
        }
        let done = self.completed_before as f64 * 100.0 + f64::from(step_percent.min(100));
        self.tx.progress(done / self.total as f64, text);
    }
}

/// Context a step recipe runs with
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Event surface for output, diagnostics, and progress
    pub events: StepEvents,
    /// Cooperative cancellation signal; a recipe should stop its external
    /// process and return when this fires
    pub cancel: CancellationToken,
}
