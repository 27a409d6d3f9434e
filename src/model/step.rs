//! Steps, step lists, and the recipe trait
//!
//! A step is the unit of queued work: a named, enable-able wrapper around
//! an executable recipe. Recipes are external collaborators (compilers,
//! deploy tools, composite operations); the engine only starts them,
//! forwards their events, and awaits their outcome.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::events::StepContext;

use super::StepId;

/// Why a step list exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    Build,
    Clean,
    Deploy,
}

impl Purpose {
    /// Displayed name for queued items of this purpose
    pub fn display_name(self) -> &'static str {
        match self {
            Purpose::Build => "Build",
            Purpose::Clean => "Clean",
            Purpose::Deploy => "Deploy",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Executable recipe of one step
///
/// `run` resolves when the step's external work finishes. A failure is
/// reported as an error whose rendering becomes the step's failure output.
/// Recipes observe `ctx.cancel` cooperatively: the scheduler never aborts
/// a dispatched recipe mid-flight.
pub trait StepRecipe: Send + Sync {
    fn run(&self, ctx: StepContext) -> BoxFuture<'static, anyhow::Result<()>>;
}

/// Handle to a build system that may be (re)parsing its project model
///
/// `parsing_finished` resolves at the completion of the in-flight parse,
/// reporting whether it succeeded. When no parse is in flight at call time
/// it must resolve immediately with the result of the last completed parse
/// (`true` if none has run yet): a parse may finish between an `is_parsing`
/// check and the call, and a future that only resolved on the *next*
/// completion would wait for a parse that never comes.
pub trait BuildSystemHandle: Send + Sync {
    fn is_parsing(&self) -> bool;
    fn parsing_finished(&self) -> BoxFuture<'static, bool>;
}

/// One unit of work bound to a project configuration
#[derive(Clone)]
pub struct Step {
    pub id: StepId,
    /// Human-readable step name
    pub display_name: String,
    /// Disabled steps are skipped but keep their ordinal slot
    pub enabled: bool,
    /// The executable recipe
    pub recipe: Arc<dyn StepRecipe>,
    /// Build system whose parse must settle before this step runs
    pub build_system: Option<Arc<dyn BuildSystemHandle>>,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("enabled", &self.enabled)
            .field("has_build_system", &self.build_system.is_some())
            .finish()
    }
}

/// Ordered steps for one (configuration, purpose) pair
#[derive(Debug, Clone)]
pub struct StepList {
    pub purpose: Purpose,
    pub steps: Vec<Step>,
}

impl StepList {
    pub fn new(purpose: Purpose) -> Self {
        Self {
            purpose,
            steps: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
