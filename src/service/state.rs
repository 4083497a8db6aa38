//! Shared service state.

use std::sync::Arc;

use crate::layout::LayoutConfig;
use crate::probe::ProbeConfig;
use crate::store::FamilyStore;
use crate::tree::FamilyTreeBuilder;

/// Shared service state.
///
/// Holds the record store and the tree builder configured for it. Cloning
/// is cheap; every clone shares the same store.
pub struct ServiceState<S: FamilyStore + 'static> {
    /// The record store.
    pub store: Arc<S>,
    /// Tree builder over `store`.
    pub builder: Arc<FamilyTreeBuilder<S>>,
    /// Probe limits the builder was created with.
    pub probe_config: ProbeConfig,
}

impl<S: FamilyStore + 'static> ServiceState<S> {
    /// Create service state with explicit layout and probe settings.
    pub fn new(store: S, layout: LayoutConfig, probe: ProbeConfig) -> Self {
        let store = Arc::new(store);
        Self {
            builder: Arc::new(FamilyTreeBuilder::new(Arc::clone(&store), layout, probe.clone())),
            store,
            probe_config: probe,
        }
    }

    /// Create service state with default layout and probe limits from the
    /// environment (`TREE_PROBE_DEPTH_CAP`, `TREE_PROBE_BUDGET_MS`).
    pub fn from_env(store: S) -> Self {
        let probe = ProbeConfig::from_env();
        tracing::info!(
            depth_cap = probe.depth_cap,
            budget_ms = probe.budget.as_millis() as u64,
            "Depth probe configured"
        );
        Self::new(store, LayoutConfig::default(), probe)
    }

    /// Layout parameters in use.
    pub fn layout_config(&self) -> &LayoutConfig {
        self.builder.layout_config()
    }
}

impl<S: FamilyStore + 'static> Clone for ServiceState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            builder: Arc::clone(&self.builder),
            probe_config: self.probe_config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryFamilyStore;
    use std::time::Duration;

    #[test]
    fn test_clones_share_store() {
        let state = ServiceState::new(
            InMemoryFamilyStore::new(),
            LayoutConfig::default(),
            ProbeConfig::new(5, Duration::from_millis(100)),
        );
        let clone = state.clone();

        assert!(Arc::ptr_eq(&state.store, &clone.store));
        assert_eq!(clone.probe_config.depth_cap, 5);
        assert_eq!(clone.layout_config().params_hash(), LayoutConfig::default().params_hash());
    }
}
