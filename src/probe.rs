//! Depth probing.
//!
//! Reports how many generations exist in each direction from a focus person
//! so the caller can bound its depth controls. The probe is capped and
//! time-bounded; hitting either limit yields a truncated best-effort result
//! instead of an error.
//!
//! ## Configuration
//!
//! - `TREE_PROBE_DEPTH_CAP`: Level cap, clamped to 20 (default: 20)
//! - `TREE_PROBE_BUDGET_MS`: Wall-clock budget for both directions together
//!   (default: 5000)

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use crate::store::FamilyStore;
use crate::traversal::Direction;
use crate::types::{DepthProbe, PersonId};
use crate::MAX_DEPTH_CAP;

/// Default wall-clock budget for one probe request.
pub const DEFAULT_PROBE_BUDGET: Duration = Duration::from_secs(5);

/// Limits for depth probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Maximum number of levels explored per direction.
    pub depth_cap: u32,
    /// Wall-clock budget shared by all directions of one probe request.
    pub budget: Duration,
}

impl ProbeConfig {
    /// Create a config, clamping the cap to the hard maximum.
    pub fn new(depth_cap: u32, budget: Duration) -> Self {
        Self {
            depth_cap: depth_cap.min(MAX_DEPTH_CAP),
            budget,
        }
    }

    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let depth_cap = std::env::var("TREE_PROBE_DEPTH_CAP")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(MAX_DEPTH_CAP);
        let budget = std::env::var("TREE_PROBE_BUDGET_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PROBE_BUDGET);
        Self::new(depth_cap, budget)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::new(MAX_DEPTH_CAP, DEFAULT_PROBE_BUDGET)
    }
}

/// Depth prober over a record store.
pub struct DepthProber<S: FamilyStore> {
    store: Arc<S>,
    config: ProbeConfig,
}

impl<S: FamilyStore + 'static> DepthProber<S> {
    /// Create a prober.
    pub fn new(store: Arc<S>, config: ProbeConfig) -> Self {
        Self { store, config }
    }

    /// Get the config.
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probe both directions under one shared budget.
    pub async fn probe_both(&self, focus_id: PersonId) -> (DepthProbe, DepthProbe) {
        let deadline = Instant::now() + self.config.budget;
        let ancestors = self.probe_until(focus_id, Direction::Ancestors, deadline).await;
        let descendants = self.probe_until(focus_id, Direction::Descendants, deadline).await;
        (ancestors, descendants)
    }

    /// Deepest level reachable from `focus_id` in one direction.
    ///
    /// Never fails: store errors and exhausted budgets both yield the
    /// deepest completed level, flagged as truncated.
    pub async fn probe(&self, focus_id: PersonId, direction: Direction) -> DepthProbe {
        self.probe_until(focus_id, direction, Instant::now() + self.config.budget).await
    }

    async fn probe_until(&self, focus_id: PersonId, direction: Direction, deadline: Instant) -> DepthProbe {
        let mut visited: BTreeSet<PersonId> = BTreeSet::from([focus_id]);
        let mut frontier: Vec<PersonId> = vec![focus_id];
        let mut depth = 0u32;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            // In-flight lookups are cut off at the deadline too.
            let outcome = if remaining.is_zero() {
                None
            } else {
                timeout(remaining, self.next_level(direction, &frontier, &mut visited))
                    .await
                    .ok()
            };

            let next = match outcome {
                None => {
                    warn!(
                        focus_id = %focus_id,
                        direction = %direction,
                        depth,
                        budget_ms = self.config.budget.as_millis() as u64,
                        "depth probe budget exhausted"
                    );
                    return DepthProbe::truncated(depth);
                }
                Some(Ok(next)) => next,
                Some(Err(e)) => {
                    warn!(
                        focus_id = %focus_id,
                        direction = %direction,
                        depth,
                        error = %e,
                        "depth probe lookup failed"
                    );
                    return DepthProbe::truncated(depth);
                }
            };

            if next.is_empty() {
                debug!(focus_id = %focus_id, direction = %direction, depth, "depth probe complete");
                return DepthProbe::exact(depth);
            }
            if depth == self.config.depth_cap {
                // Another level exists beyond the cap.
                return DepthProbe::truncated(depth);
            }
            frontier = next;
            depth += 1;
        }
    }

    async fn next_level(
        &self,
        direction: Direction,
        frontier: &[PersonId],
        visited: &mut BTreeSet<PersonId>,
    ) -> Result<Vec<PersonId>, S::Error> {
        let families = direction.families(self.store.as_ref(), frontier).await?;
        let mut next = Vec::new();
        for family in &families {
            for &id in direction.next_level(family) {
                if visited.insert(id) {
                    next.push(id);
                }
            }
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryFamilyStore;
    use crate::types::{FamilyId, FamilyRecord, PersonRecord, Sex};

    fn pid(id: i64) -> PersonId {
        PersonId::new(id)
    }

    /// Person i's parent is i+1, for i in 1..n.
    fn make_chain(n: i64) -> InMemoryFamilyStore {
        let mut store = InMemoryFamilyStore::new();
        for i in 1..=n {
            store.add_person(PersonRecord::new(pid(i), Sex::Unknown));
            if i < n {
                store.add_family(FamilyRecord::new(FamilyId::new(100 + i), vec![pid(i + 1)], vec![pid(i)]));
            }
        }
        store
    }

    fn build_chain(n: i64) -> Arc<InMemoryFamilyStore> {
        Arc::new(make_chain(n))
    }

    /// Store whose family lookups each take `delay`.
    struct SlowStore {
        inner: InMemoryFamilyStore,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl FamilyStore for SlowStore {
        type Error = <InMemoryFamilyStore as FamilyStore>::Error;

        async fn get_person(&self, id: PersonId) -> Result<Option<PersonRecord>, Self::Error> {
            self.inner.get_person(id).await
        }

        async fn get_people(&self, ids: &[PersonId]) -> Result<Vec<PersonRecord>, Self::Error> {
            self.inner.get_people(ids).await
        }

        async fn get_families_where_child(&self, ids: &[PersonId]) -> Result<Vec<FamilyRecord>, Self::Error> {
            tokio::time::sleep(self.delay).await;
            self.inner.get_families_where_child(ids).await
        }

        async fn get_families_where_member(&self, ids: &[PersonId]) -> Result<Vec<FamilyRecord>, Self::Error> {
            tokio::time::sleep(self.delay).await;
            self.inner.get_families_where_member(ids).await
        }
    }

    #[tokio::test]
    async fn test_exact_depths() {
        let prober = DepthProber::new(build_chain(5), ProbeConfig::default());

        assert_eq!(prober.probe(pid(1), Direction::Ancestors).await, DepthProbe::exact(4));
        assert_eq!(prober.probe(pid(1), Direction::Descendants).await, DepthProbe::exact(0));
        assert_eq!(prober.probe(pid(5), Direction::Descendants).await, DepthProbe::exact(4));
        assert_eq!(prober.probe(pid(3), Direction::Ancestors).await, DepthProbe::exact(2));
    }

    #[tokio::test]
    async fn test_cap_truncates_only_when_more_exists() {
        let prober = DepthProber::new(build_chain(10), ProbeConfig::new(3, DEFAULT_PROBE_BUDGET));
        assert_eq!(prober.probe(pid(1), Direction::Ancestors).await, DepthProbe::truncated(3));

        let exact = DepthProber::new(build_chain(4), ProbeConfig::new(3, DEFAULT_PROBE_BUDGET));
        assert_eq!(exact.probe(pid(1), Direction::Ancestors).await, DepthProbe::exact(3));
    }

    #[tokio::test]
    async fn test_cap_is_clamped() {
        let config = ProbeConfig::new(500, DEFAULT_PROBE_BUDGET);
        assert_eq!(config.depth_cap, MAX_DEPTH_CAP);

        let prober = DepthProber::new(build_chain(30), config);
        assert_eq!(prober.probe(pid(1), Direction::Ancestors).await, DepthProbe::truncated(20));
    }

    #[tokio::test]
    async fn test_zero_budget_is_truncated_not_error() {
        let prober = DepthProber::new(build_chain(5), ProbeConfig::new(20, Duration::ZERO));
        let probe = prober.probe(pid(1), Direction::Ancestors).await;
        assert!(probe.truncated);
        assert_eq!(probe.depth, 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_truncated() {
        let store = build_chain(5);
        store.set_unavailable(true);
        let prober = DepthProber::new(store, ProbeConfig::default());

        assert_eq!(prober.probe(pid(1), Direction::Ancestors).await, DepthProbe::truncated(0));
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let mut store = InMemoryFamilyStore::new();
        store.add_person(PersonRecord::new(pid(1), Sex::Unknown));
        store.add_person(PersonRecord::new(pid(2), Sex::Unknown));
        store.add_family(FamilyRecord::new(FamilyId::new(10), vec![pid(2)], vec![pid(1)]));
        store.add_family(FamilyRecord::new(FamilyId::new(11), vec![pid(1)], vec![pid(2)]));
        let prober = DepthProber::new(Arc::new(store), ProbeConfig::default());

        assert_eq!(prober.probe(pid(1), Direction::Ancestors).await, DepthProbe::exact(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_is_shared_and_bounds_slow_lookups() {
        let store = SlowStore {
            inner: make_chain(10),
            delay: Duration::from_millis(400),
        };
        let budget = Duration::from_secs(1);
        let prober = DepthProber::new(Arc::new(store), ProbeConfig::new(20, budget));

        let start = Instant::now();
        let (ancestors, descendants) = prober.probe_both(pid(1)).await;

        // Two lookups complete, the third is cut off at the deadline.
        assert_eq!(ancestors, DepthProbe::truncated(2));
        assert_eq!(descendants, DepthProbe::truncated(0));
        // Timer granularity is one millisecond.
        let elapsed = start.elapsed();
        assert!(elapsed >= budget && elapsed < budget + Duration::from_millis(10), "probe took {:?}", elapsed);
    }
}
