//! Instance registry - live instance identities per tool kind
//!
//! One registry exists per process. It is built explicitly from settings and
//! handed to whoever allocates instances; there is no global instance count.
//! All operations take the same lock, so allocate/release/count calls coming
//! from the coordinator and from instance shutdown paths never lose updates.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use perch_types::{InstanceId, PerchSettings, ToolKind};
use thiserror::Error;

/// Errors returned by the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{tool} already has the maximum of {max} instances")]
    CapacityExceeded { tool: ToolKind, max: usize },
}

/// Process-wide table of live instance ids
#[derive(Debug)]
pub struct InstanceRegistry {
    limits: HashMap<ToolKind, usize>,
    live: Mutex<HashMap<ToolKind, BTreeSet<InstanceId>>>,
}

impl InstanceRegistry {
    /// Create a registry with explicit per-tool limits.
    /// Tools missing from `limits` use [`ToolKind::default_max_instances`].
    pub fn new(limits: impl IntoIterator<Item = (ToolKind, usize)>) -> Self {
        Self {
            limits: limits.into_iter().collect(),
            live: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &PerchSettings) -> Self {
        Self::new(settings.instance_limits())
    }

    fn live(&self) -> MutexGuard<'_, HashMap<ToolKind, BTreeSet<InstanceId>>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configured maximum for a tool kind
    pub fn max_instances(&self, tool: ToolKind) -> usize {
        self.limits
            .get(&tool)
            .copied()
            .unwrap_or_else(|| tool.default_max_instances())
    }

    /// Allocate the smallest unused positive id for `tool`
    pub fn allocate(&self, tool: ToolKind) -> Result<InstanceId, RegistryError> {
        let max = self.max_instances(tool);
        let mut live = self.live();
        let ids = live.entry(tool).or_default();
        if ids.len() >= max {
            return Err(RegistryError::CapacityExceeded { tool, max });
        }

        // Ids are kept sorted, so the first gap in 1, 2, 3, ... is the answer
        let mut candidate = 1u32;
        for id in ids.iter() {
            if id.get() != candidate {
                break;
            }
            candidate += 1;
        }
        let id = InstanceId::new(candidate).ok_or(RegistryError::CapacityExceeded { tool, max })?;
        ids.insert(id);
        tracing::debug!(%tool, %id, live = ids.len(), "Allocated instance id");
        Ok(id)
    }

    /// Mark a specific id as live (used when restoring persisted instances).
    /// Returns `Ok(false)` if the id was already live.
    pub fn claim(&self, tool: ToolKind, id: InstanceId) -> Result<bool, RegistryError> {
        let max = self.max_instances(tool);
        let mut live = self.live();
        let ids = live.entry(tool).or_default();
        if ids.contains(&id) {
            return Ok(false);
        }
        if ids.len() >= max {
            return Err(RegistryError::CapacityExceeded { tool, max });
        }
        ids.insert(id);
        Ok(true)
    }

    /// Remove an id from the live set. Releasing a dead id is a no-op.
    /// Returns whether the id was live.
    pub fn release(&self, tool: ToolKind, id: InstanceId) -> bool {
        let mut live = self.live();
        let removed = live.get_mut(&tool).is_some_and(|ids| ids.remove(&id));
        if removed {
            tracing::debug!(%tool, %id, "Released instance id");
        }
        removed
    }

    /// True iff `id` is the only live instance of `tool`
    pub fn is_sole(&self, tool: ToolKind, id: InstanceId) -> bool {
        self.live()
            .get(&tool)
            .is_some_and(|ids| ids.len() == 1 && ids.contains(&id))
    }

    pub fn is_live(&self, tool: ToolKind, id: InstanceId) -> bool {
        self.live().get(&tool).is_some_and(|ids| ids.contains(&id))
    }

    /// Number of live instances of `tool`
    pub fn count(&self, tool: ToolKind) -> usize {
        self.live().get(&tool).map_or(0, BTreeSet::len)
    }

    /// Number of live instances across all tool kinds
    pub fn total_count(&self) -> usize {
        self.live().values().map(BTreeSet::len).sum()
    }

    /// Live ids of `tool`, ascending
    pub fn live_ids(&self, tool: ToolKind) -> Vec<InstanceId> {
        self.live()
            .get(&tool)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new(std::iter::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn id(n: u32) -> InstanceId {
        InstanceId::new(n).unwrap()
    }

    #[test]
    fn allocates_smallest_free_id() {
        let registry = InstanceRegistry::default();
        assert_eq!(registry.allocate(ToolKind::Clock), Ok(id(1)));
        assert_eq!(registry.allocate(ToolKind::Clock), Ok(id(2)));
        assert_eq!(registry.allocate(ToolKind::Clock), Ok(id(3)));

        assert!(registry.release(ToolKind::Clock, id(2)));
        assert_eq!(registry.allocate(ToolKind::Clock), Ok(id(2)));
        assert_eq!(registry.allocate(ToolKind::Clock), Ok(id(4)));
    }

    #[test]
    fn ids_are_scoped_per_tool_kind() {
        let registry = InstanceRegistry::default();
        assert_eq!(registry.allocate(ToolKind::Clock), Ok(id(1)));
        assert_eq!(registry.allocate(ToolKind::Dice), Ok(id(1)));
        assert_eq!(registry.count(ToolKind::Clock), 1);
        assert_eq!(registry.total_count(), 2);
    }

    #[test]
    fn capacity_is_enforced_and_recycled() {
        let registry = InstanceRegistry::new([(ToolKind::Coin, 2)]);
        registry.allocate(ToolKind::Coin).unwrap();
        registry.allocate(ToolKind::Coin).unwrap();
        assert_eq!(
            registry.allocate(ToolKind::Coin),
            Err(RegistryError::CapacityExceeded {
                tool: ToolKind::Coin,
                max: 2
            })
        );

        registry.release(ToolKind::Coin, id(1));
        assert_eq!(registry.allocate(ToolKind::Coin), Ok(id(1)));
    }

    #[test]
    fn release_is_idempotent() {
        let registry = InstanceRegistry::default();
        let a = registry.allocate(ToolKind::Dice).unwrap();
        assert!(registry.release(ToolKind::Dice, a));
        assert!(!registry.release(ToolKind::Dice, a));
        assert!(!registry.release(ToolKind::Randomizer, a));
        assert_eq!(registry.count(ToolKind::Dice), 0);
    }

    #[test]
    fn sole_instance_detection() {
        let registry = InstanceRegistry::default();
        let a = registry.allocate(ToolKind::Clock).unwrap();
        assert!(registry.is_sole(ToolKind::Clock, a));

        let b = registry.allocate(ToolKind::Clock).unwrap();
        assert!(!registry.is_sole(ToolKind::Clock, a));
        assert!(!registry.is_sole(ToolKind::Clock, b));

        registry.release(ToolKind::Clock, a);
        assert!(registry.is_sole(ToolKind::Clock, b));
        assert!(!registry.is_sole(ToolKind::Clock, a));
    }

    #[test]
    fn claim_respects_capacity_and_existing_ids() {
        let registry = InstanceRegistry::new([(ToolKind::Spotlight, 2)]);
        assert_eq!(registry.claim(ToolKind::Spotlight, id(5)), Ok(true));
        assert_eq!(registry.claim(ToolKind::Spotlight, id(5)), Ok(false));
        assert_eq!(registry.allocate(ToolKind::Spotlight), Ok(id(1)));
        assert!(registry.claim(ToolKind::Spotlight, id(2)).is_err());
        assert_eq!(registry.live_ids(ToolKind::Spotlight), vec![id(1), id(5)]);
    }

    #[test]
    fn concurrent_allocation_never_duplicates() {
        let registry = Arc::new(InstanceRegistry::new([(ToolKind::Spotlight, 64)]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    (0..8)
                        .map(|_| registry.allocate(ToolKind::Spotlight).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<u32> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .map(InstanceId::get)
            .collect();
        all.sort_unstable();
        assert_eq!(all, (1..=64).collect::<Vec<_>>());
    }
}
