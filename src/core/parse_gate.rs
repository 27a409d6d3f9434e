//! Parse-precondition gate
//!
//! Build steps must not run against a project model that is mid-recompute.
//! The gate waits until none of the involved build systems are parsing,
//! re-checking the whole set after every completion because a finished
//! parse may itself trigger a new one. A failed parse short-circuits the
//! run before any step starts. The gate is not a step: it occupies no
//! progress slot.

use std::sync::Arc;

use crate::model::BuildSystemHandle;

use super::queue::BuildItem;

/// Unique build systems of the queued items, in first-seen order.
pub fn build_systems_of(items: &[BuildItem]) -> Vec<Arc<dyn BuildSystemHandle>> {
    let mut seen = Vec::new();
    let mut systems: Vec<Arc<dyn BuildSystemHandle>> = Vec::new();
    for item in items {
        if let Some(system) = &item.step.build_system {
            let ptr = Arc::as_ptr(system).cast::<()>() as usize;
            if !seen.contains(&ptr) {
                seen.push(ptr);
                systems.push(Arc::clone(system));
            }
        }
    }
    systems
}

/// Wait until no involved build system is parsing
///
/// Returns false as soon as any parse finishes unsuccessfully; the caller
/// treats this as the whole run failing before the first step. A parse
/// completing between the `is_parsing` check and the wait is covered by
/// the [`BuildSystemHandle`] contract: the wait then resolves immediately
/// with that parse's result.
pub async fn await_parsing(systems: &[Arc<dyn BuildSystemHandle>]) -> bool {
    'recheck: loop {
        for system in systems {
            if !system.is_parsing() {
                continue;
            }
            if !system.parsing_finished().await {
                return false;
            }
            // A finished parse may have kicked off another one elsewhere.
            continue 'recheck;
        }
        return true;
    }
}
