//! Bounded family-graph traversal.
//!
//! Expands level by level from a focus person, upward through the families
//! the frontier was born into and downward through the families the frontier
//! founded. Every level costs one batched family lookup plus at most one
//! batched person lookup, regardless of how many people the level holds.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::store::FamilyStore;
use crate::types::{
    DataWarning, DataWarningKind, Edge, FamilyId, FamilyRecord, FamilyUnit, PersonId, PersonNode,
    PersonRecord,
};
use crate::MAX_DEPTH_CAP;

/// Error type for tree operations.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Focus person not found.
    #[error("Person not found: {0}")]
    NotFound(PersonId),
    /// Depth out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Store error.
    #[error("Store error: {0}")]
    Store(String),
}

impl TreeError {
    /// Create a store error from any error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::Store(e.to_string())
    }
}

/// Direction of a traversal pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward parents (negative generations).
    Ancestors,
    /// Toward children (positive generations).
    Descendants,
}

impl Direction {
    /// Batched lookup of the families that link a frontier to the next level.
    pub(crate) async fn families<S: FamilyStore + ?Sized>(
        self,
        store: &S,
        frontier: &[PersonId],
    ) -> Result<Vec<FamilyRecord>, S::Error> {
        match self {
            Self::Ancestors => store.get_families_where_child(frontier).await,
            Self::Descendants => store.get_families_where_member(frontier).await,
        }
    }

    /// People a family contributes to the next level in this direction.
    pub(crate) fn next_level(self, family: &FamilyRecord) -> &[PersonId] {
        match self {
            Self::Ancestors => &family.partner_ids,
            Self::Descendants => &family.child_ids,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ancestors => write!(f, "ancestors"),
            Self::Descendants => write!(f, "descendants"),
        }
    }
}

/// Validate a requested depth and convert it to a level count.
pub fn validate_depth(name: &str, depth: i32) -> Result<u32, TreeError> {
    if depth < 0 {
        return Err(TreeError::InvalidArgument(format!(
            "{} must be >= 0, got {}",
            name, depth
        )));
    }
    let depth = depth as u32;
    if depth > MAX_DEPTH_CAP {
        return Err(TreeError::InvalidArgument(format!(
            "{} must be <= {}, got {}",
            name, MAX_DEPTH_CAP, depth
        )));
    }
    Ok(depth)
}

/// Unpositioned family graph around a focus person.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyGraph {
    /// The focus person.
    pub focus_id: PersonId,
    /// People, ordered by generation then discovery.
    pub nodes: Vec<PersonNode>,
    /// Partner→child edges in discovery order.
    pub edges: Vec<Edge>,
    /// Couples in discovery order.
    pub couples: Vec<FamilyUnit>,
    /// Data-quality warnings raised during traversal.
    pub warnings: Vec<DataWarning>,
}

impl FamilyGraph {
    /// Find a node by id.
    pub fn node(&self, id: PersonId) -> Option<&PersonNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Whether the graph contains a person.
    pub fn contains(&self, id: PersonId) -> bool {
        self.node(id).is_some()
    }
}

/// Accumulates the graph while both passes run.
#[derive(Default)]
struct Collector {
    generation: BTreeMap<PersonId, i32>,
    discovery: Vec<PersonId>,
    records: BTreeMap<PersonId, PersonRecord>,
    edges: Vec<Edge>,
    edge_keys: BTreeSet<(FamilyId, PersonId, PersonId)>,
    couples: Vec<FamilyUnit>,
    seen_families: BTreeSet<FamilyId>,
    warnings: Vec<DataWarning>,
}

impl Collector {
    fn place(&mut self, id: PersonId, generation: i32) {
        if self.generation.insert(id, generation).is_none() {
            self.discovery.push(id);
        }
    }

    fn add_edge(&mut self, family: &FamilyRecord, parent: PersonId, child: PersonId) {
        if self.edge_keys.insert((family.id, child, parent)) {
            self.edges.push(Edge::new(parent, child, family.id, family.family_type.relationship()));
        }
    }

    fn add_couple(&mut self, family: &FamilyRecord) {
        if self.seen_families.insert(family.id) {
            self.couples.push(family.to_unit());
        }
    }

    fn warn(
        &mut self,
        kind: DataWarningKind,
        family: FamilyId,
        person: Option<PersonId>,
        message: String,
    ) {
        self.warnings.push(DataWarning::new(kind, Some(family), person, message));
    }

    /// Check that a family can join the tree with its partners at `parent_gen`.
    fn accepts_partners(&mut self, family: &FamilyRecord, parent_gen: i32) -> bool {
        if family.partner_ids.is_empty() || family.partner_ids.len() > 2 {
            self.warn(
                DataWarningKind::MalformedFamily,
                family.id,
                None,
                format!("family has {} partners, skipping", family.partner_ids.len()),
            );
            return false;
        }
        if let Some(missing) = family.partner_ids.iter().find(|p| !self.records.contains_key(*p)) {
            self.warn(
                DataWarningKind::MissingPerson,
                family.id,
                Some(*missing),
                format!("partner {} not in store, skipping family", missing),
            );
            return false;
        }
        let conflict = family.partner_ids.iter().find_map(|p| {
            self.generation
                .get(p)
                .filter(|&&g| g != parent_gen)
                .map(|&g| (*p, g))
        });
        if let Some((partner, generation)) = conflict {
            self.warn(
                DataWarningKind::GenerationMismatch,
                family.id,
                Some(partner),
                format!(
                    "partner {} already placed at generation {}, family needs {}; skipping family",
                    partner, generation, parent_gen
                ),
            );
            return false;
        }
        true
    }

    fn into_graph(mut self, focus_id: PersonId) -> FamilyGraph {
        let mut nodes: Vec<PersonNode> = self
            .discovery
            .iter()
            .filter_map(|id| {
                let generation = self.generation[id];
                self.records.remove(id).map(|r| PersonNode::from_record(r, generation))
            })
            .collect();
        // Stable: discovery order within a generation is preserved.
        nodes.sort_by_key(|n| n.generation);

        FamilyGraph {
            focus_id,
            nodes,
            edges: self.edges,
            couples: self.couples,
            warnings: self.warnings,
        }
    }
}

/// Bounded traversal over a record store.
///
/// ## Algorithm
///
/// 1. Load the focus person (generation 0)
/// 2. Ancestor pass: for each level, one batched lookup of the families the
///    frontier are children of; their partners form the next frontier
/// 3. Descendant pass: for each level, one batched lookup of the families the
///    frontier are partners in; their children form the next frontier and
///    their other partners join the frontier's generation
/// 4. A person is expanded at most once per direction, so corrupt cycles
///    terminate within the depth bound
pub struct TreeTraversal<S: FamilyStore> {
    store: Arc<S>,
}

impl<S: FamilyStore + 'static> TreeTraversal<S> {
    /// Create a traversal over a store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Collect the family graph within the requested bounds.
    pub async fn traverse(
        &self,
        focus_id: PersonId,
        ancestor_depth: i32,
        descendant_depth: i32,
    ) -> Result<FamilyGraph, TreeError> {
        let ancestor_depth = validate_depth("ancestor_depth", ancestor_depth)?;
        let descendant_depth = validate_depth("descendant_depth", descendant_depth)?;

        let focus = self.store.get_person(focus_id).await
            .map_err(TreeError::from_store)?
            .ok_or(TreeError::NotFound(focus_id))?;

        let mut collector = Collector::default();
        collector.records.insert(focus_id, focus);
        collector.place(focus_id, 0);

        self.ancestor_pass(&mut collector, focus_id, ancestor_depth).await?;
        self.descendant_pass(&mut collector, focus_id, descendant_depth).await?;

        let graph = collector.into_graph(focus_id);
        debug!(
            focus_id = %focus_id,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            couples = graph.couples.len(),
            warnings = graph.warnings.len(),
            "traversal complete"
        );
        Ok(graph)
    }

    async fn ancestor_pass(
        &self,
        collector: &mut Collector,
        focus_id: PersonId,
        depth: u32,
    ) -> Result<(), TreeError> {
        let mut visited: BTreeSet<PersonId> = BTreeSet::from([focus_id]);
        let mut frontier: BTreeSet<PersonId> = BTreeSet::from([focus_id]);

        for level in 1..=depth as i32 {
            if frontier.is_empty() {
                break;
            }
            let families = self.expand(collector, Direction::Ancestors, &frontier, level).await?;
            let parent_gen = -level;
            let mut next = BTreeSet::new();

            for family in &families {
                if !collector.accepts_partners(family, parent_gen) {
                    continue;
                }
                collector.add_couple(family);
                for &partner in &family.partner_ids {
                    collector.place(partner, parent_gen);
                    if visited.insert(partner) {
                        next.insert(partner);
                    }
                }
                for &child in family.child_ids.iter().filter(|c| frontier.contains(*c)) {
                    for &partner in &family.partner_ids {
                        collector.add_edge(family, partner, child);
                    }
                }
            }
            frontier = next;
        }
        Ok(())
    }

    async fn descendant_pass(
        &self,
        collector: &mut Collector,
        focus_id: PersonId,
        depth: u32,
    ) -> Result<(), TreeError> {
        let mut visited: BTreeSet<PersonId> = BTreeSet::from([focus_id]);
        let mut frontier: BTreeSet<PersonId> = BTreeSet::from([focus_id]);

        for level in 1..=depth as i32 {
            if frontier.is_empty() {
                break;
            }
            let families = self.expand(collector, Direction::Descendants, &frontier, level).await?;
            let parent_gen = level - 1;
            let mut next = BTreeSet::new();

            for family in &families {
                if !collector.accepts_partners(family, parent_gen) {
                    continue;
                }
                collector.add_couple(family);
                // Spouses outside the frontier join its generation.
                for &partner in &family.partner_ids {
                    collector.place(partner, parent_gen);
                }

                for &child in &family.child_ids {
                    if !collector.records.contains_key(&child) {
                        collector.warn(
                            DataWarningKind::MissingPerson,
                            family.id,
                            Some(child),
                            format!("child {} not in store, skipping", child),
                        );
                        continue;
                    }
                    let placed = collector.generation.get(&child).copied();
                    match placed {
                        Some(g) if g != level => {
                            collector.warn(
                                DataWarningKind::GenerationMismatch,
                                family.id,
                                Some(child),
                                format!(
                                    "child {} already placed at generation {}, not {}; dropping link",
                                    child, g, level
                                ),
                            );
                            continue;
                        }
                        Some(_) => {}
                        None => collector.place(child, level),
                    }
                    if visited.insert(child) {
                        next.insert(child);
                    }
                    for &partner in &family.partner_ids {
                        collector.add_edge(family, partner, child);
                    }
                }
            }
            frontier = next;
        }
        Ok(())
    }

    /// Resolve one frontier level: one family lookup, then one person lookup
    /// for everyone those families reference that is not loaded yet.
    async fn expand(
        &self,
        collector: &mut Collector,
        direction: Direction,
        frontier: &BTreeSet<PersonId>,
        level: i32,
    ) -> Result<Vec<FamilyRecord>, TreeError> {
        let frontier_ids: Vec<PersonId> = frontier.iter().copied().collect();
        let families = direction.families(self.store.as_ref(), &frontier_ids).await
            .map_err(TreeError::from_store)?;

        let unknown: BTreeSet<PersonId> = families
            .iter()
            .flat_map(|f| f.partner_ids.iter().chain(f.child_ids.iter()))
            .filter(|id| !collector.records.contains_key(*id))
            .copied()
            .collect();

        if !unknown.is_empty() {
            let ids: Vec<PersonId> = unknown.into_iter().collect();
            let people = self.store.get_people(&ids).await
                .map_err(TreeError::from_store)?;
            for person in people {
                collector.records.insert(person.id, person);
            }
        }

        debug!(
            direction = %direction,
            level,
            frontier = frontier_ids.len(),
            families = families.len(),
            "expanded level"
        );
        Ok(families)
    }

    /// Get a reference to the store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryFamilyStore;
    use crate::types::Sex;

    fn pid(id: i64) -> PersonId {
        PersonId::new(id)
    }

    fn family(id: i64, partners: &[i64], children: &[i64]) -> FamilyRecord {
        FamilyRecord::new(
            FamilyId::new(id),
            partners.iter().map(|&p| pid(p)).collect(),
            children.iter().map(|&c| pid(c)).collect(),
        )
    }

    fn store_with(people: &[i64], families: Vec<FamilyRecord>) -> Arc<InMemoryFamilyStore> {
        let mut store = InMemoryFamilyStore::new();
        for &id in people {
            store.add_person(PersonRecord::new(pid(id), Sex::Unknown));
        }
        for f in families {
            store.add_family(f);
        }
        Arc::new(store)
    }

    /// Linear pedigree: person i's parents are the family (i+1) with partner i+1.
    fn build_chain(n: i64) -> Arc<InMemoryFamilyStore> {
        let people: Vec<i64> = (1..=n).collect();
        let families = (1..n).map(|i| family(100 + i, &[i + 1], &[i])).collect();
        store_with(&people, families)
    }

    fn generations(graph: &FamilyGraph) -> BTreeMap<i64, i32> {
        graph.nodes.iter().map(|n| (n.id.get(), n.generation)).collect()
    }

    #[tokio::test]
    async fn test_zero_depth_returns_focus_only() {
        let store = store_with(&[1, 2, 3], vec![family(10, &[2, 3], &[1])]);
        let traversal = TreeTraversal::new(store);

        let graph = traversal.traverse(pid(1), 0, 0).await.unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, pid(1));
        assert!(graph.edges.is_empty());
        assert!(graph.couples.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_bad_depths() {
        let traversal = TreeTraversal::new(build_chain(3));

        let err = traversal.traverse(pid(1), -1, 0).await.unwrap_err();
        assert!(matches!(err, TreeError::InvalidArgument(_)));

        let err = traversal.traverse(pid(1), 0, 21).await.unwrap_err();
        assert!(matches!(err, TreeError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_missing_focus_is_not_found() {
        let traversal = TreeTraversal::new(build_chain(3));
        let err = traversal.traverse(pid(99), 1, 1).await.unwrap_err();
        assert!(matches!(err, TreeError::NotFound(id) if id == pid(99)));
    }

    #[tokio::test]
    async fn test_ancestor_depth_bounds_generations() {
        let traversal = TreeTraversal::new(build_chain(10));
        let graph = traversal.traverse(pid(1), 3, 0).await.unwrap();

        let gens = generations(&graph);
        assert_eq!(gens.len(), 4);
        assert_eq!(gens[&4], -3);
        assert!(gens.values().all(|g| g.abs() <= 3));
    }

    #[tokio::test]
    async fn test_spouses_join_frontier_generation() {
        // 1 + 2 -> 3; 3 + 4 -> 5
        let store = store_with(
            &[1, 2, 3, 4, 5],
            vec![family(10, &[1, 2], &[3]), family(11, &[3, 4], &[5])],
        );
        let traversal = TreeTraversal::new(store);
        let graph = traversal.traverse(pid(1), 0, 2).await.unwrap();

        let gens = generations(&graph);
        assert_eq!(gens[&2], 0);
        assert_eq!(gens[&3], 1);
        assert_eq!(gens[&4], 1);
        assert_eq!(gens[&5], 2);
        assert_eq!(graph.couples.len(), 2);
    }

    #[tokio::test]
    async fn test_cyclic_parentage_terminates() {
        // 1's parent is 2, and 2's parent is 1.
        let store = store_with(&[1, 2], vec![family(10, &[2], &[1]), family(11, &[1], &[2])]);
        let traversal = TreeTraversal::new(Arc::clone(&store));

        let graph = traversal.traverse(pid(1), 20, 20).await.unwrap();
        let gens = generations(&graph);
        assert_eq!(gens.len(), 2);
        assert!(graph
            .warnings
            .iter()
            .any(|w| w.kind == DataWarningKind::GenerationMismatch));
        assert!(store.family_lookups() <= 40);
    }

    #[tokio::test]
    async fn test_missing_partner_skips_family() {
        // Partner 3 does not exist.
        let store = store_with(&[1, 2], vec![family(10, &[2, 3], &[1])]);
        let traversal = TreeTraversal::new(store);

        let graph = traversal.traverse(pid(1), 1, 0).await.unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.couples.is_empty());
        assert_eq!(graph.warnings.len(), 1);
        assert_eq!(graph.warnings[0].kind, DataWarningKind::MissingPerson);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = build_chain(3);
        let traversal = TreeTraversal::new(Arc::clone(&store));
        store.set_unavailable(true);

        let err = traversal.traverse(pid(1), 1, 1).await.unwrap_err();
        assert!(matches!(err, TreeError::Store(_)));
    }

    #[tokio::test]
    async fn test_one_family_lookup_per_level() {
        // Wide generation: focus 1 has 50 children, each with 1 child.
        let mut families = vec![family(1000, &[1], &(100..150).collect::<Vec<_>>())];
        for c in 100..150 {
            families.push(family(2000 + c, &[c], &[c + 1000]));
        }
        let mut people = vec![1];
        people.extend(100..150);
        people.extend(1100..1150);
        let store = store_with(&people, families);
        let traversal = TreeTraversal::new(Arc::clone(&store));

        let graph = traversal.traverse(pid(1), 0, 2).await.unwrap();
        assert_eq!(graph.nodes.len(), 101);
        assert_eq!(store.family_lookups(), 2);
        // focus + one batched person lookup per level
        assert_eq!(store.person_lookups(), 3);
    }
}
