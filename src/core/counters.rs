//! Active-counter occupancy maps
//!
//! Reference counts keyed by project, target, and configuration, answering
//! "is this entity currently building" in O(1). Missing keys read as zero.
//! Only the 0->1 and 1->0 transitions of the project counter are reported
//! to the caller, which turns them into build-state-changed notifications.

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::CounterError;
use crate::model::{ConfigId, ProjectId, TargetId};

use super::queue::BuildItem;

/// Reference-counted occupancy maps
#[derive(Debug, Default)]
pub struct ActiveCounters {
    projects: HashMap<ProjectId, usize>,
    targets: HashMap<TargetId, usize>,
    configs: HashMap<ConfigId, usize>,
}

fn count_of<K: Eq + Hash>(map: &HashMap<K, usize>, key: &K) -> usize {
    map.get(key).copied().unwrap_or(0)
}

/// Returns true on the 0->1 transition.
fn bump<K: Eq + Hash + Clone>(map: &mut HashMap<K, usize>, key: &K) -> bool {
    let entry = map.entry(key.clone()).or_insert(0);
    *entry += 1;
    *entry == 1
}

/// Returns true on the 1->0 transition.
fn unbump<K: Eq + Hash + ToString>(
    map: &mut HashMap<K, usize>,
    key: &K,
) -> Result<bool, CounterError> {
    match map.get_mut(key) {
        Some(entry) if *entry > 0 => {
            *entry -= 1;
            Ok(*entry == 0)
        }
        _ => Err(CounterError::Underflow {
            entity: key.to_string(),
        }),
    }
}

impl ActiveCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one queued item; returns true if the owning project crossed
    /// 0->1 and a build-state-changed notification is due.
    pub fn increment(&mut self, item: &BuildItem) -> bool {
        bump(&mut self.configs, &item.config);
        bump(&mut self.targets, &item.target);
        bump(&mut self.projects, &item.project)
    }

    /// Release one queued item; returns true if the owning project crossed
    /// 1->0. Underflow means the engine double-released an item.
    pub fn decrement(&mut self, item: &BuildItem) -> Result<bool, CounterError> {
        unbump(&mut self.configs, &item.config)?;
        unbump(&mut self.targets, &item.target)?;
        unbump(&mut self.projects, &item.project)
    }

    pub fn is_building_project(&self, id: &ProjectId) -> bool {
        count_of(&self.projects, id) > 0
    }

    pub fn is_building_target(&self, id: &TargetId) -> bool {
        count_of(&self.targets, id) > 0
    }

    pub fn is_building_configuration(&self, id: &ConfigId) -> bool {
        count_of(&self.configs, id) > 0
    }

    pub fn project_count(&self, id: &ProjectId) -> usize {
        count_of(&self.projects, id)
    }
}
