//! Coordinate layout engine.
//!
//! ## Algorithm
//!
//! 1. Band by generation: `y = generation × (node_height + generation_gap)`
//! 2. Order each band into units (partner chains, then singles) and assign
//!    provisional x left to right
//! 3. Run [`CENTERING_PASSES`] passes, each one:
//!    - bottom-up: center every sibling group's parents over its children
//!    - top-down: shift every sibling group's children under its parents
//!    - after each band is touched, sweep it left to right restoring gaps
//! 4. Translate so the minimum x and y equal the margin
//! 5. Synthesize one junction per sibling group and route child edges
//!
//! Units move rigidly, so spouses never separate. Everything is keyed by
//! BTreeMaps and iterated in a fixed order; identical input yields
//! identical output.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::canonical::{canonical_hash_hex, quantize, COORDINATE_QUANTIZATION};
use crate::merge::{SiblingGroup, SiblingGroups};
use crate::types::{Edge, FamilyId, FamilyUnit, Junction, JunctionId, PersonId, PersonNode, Position};

use super::config::LayoutConfig;

/// Number of centering passes.
pub const CENTERING_PASSES: usize = 3;

/// Positions, junctions and routed edges for one tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeLayout {
    /// Top-left corner of each person's card.
    pub positions: BTreeMap<PersonId, Position>,
    /// Junctions, ascending by id.
    pub junctions: Vec<Junction>,
    /// Input edges, routed through junctions where a sibling group applies.
    pub edges: Vec<Edge>,
    family_junctions: BTreeMap<FamilyId, JunctionId>,
    params_hash: String,
}

impl TreeLayout {
    /// Position of a person.
    pub fn position(&self, id: PersonId) -> Option<Position> {
        self.positions.get(&id).copied()
    }

    /// Junction by id.
    pub fn junction(&self, id: JunctionId) -> Option<&Junction> {
        self.junctions.iter().find(|j| j.id == id)
    }

    /// Junction serving a family, including families merged into another group.
    pub fn junction_for_family(&self, family_id: FamilyId) -> Option<JunctionId> {
        self.family_junctions.get(&family_id).copied()
    }

    /// Hash of the parameters the layout was computed with.
    pub fn params_hash(&self) -> &str {
        &self.params_hash
    }

    /// Hash of all quantized positions and junctions.
    pub fn fingerprint(&self) -> String {
        #[derive(Serialize)]
        struct Quantized {
            nodes: Vec<(i64, i64, i64)>,
            junctions: Vec<(i64, i64, i64)>,
        }

        let q = |v: f64| quantize(v, COORDINATE_QUANTIZATION);
        let quantized = Quantized {
            nodes: self
                .positions
                .iter()
                .map(|(id, p)| (id.get(), q(p.x), q(p.y)))
                .collect(),
            junctions: self.junctions.iter().map(|j| (j.id.get(), q(j.x), q(j.y))).collect(),
        };
        canonical_hash_hex(&quantized)
    }
}

/// Layout engine.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    /// Create an engine.
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Get the config.
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lay out a tree.
    pub fn layout(
        &self,
        nodes: &[PersonNode],
        edges: &[Edge],
        couples: &[FamilyUnit],
        groups: &SiblingGroups,
    ) -> TreeLayout {
        let mut arrangement = Arrangement::initial(&self.config, nodes, couples);
        for _ in 0..CENTERING_PASSES {
            arrangement.center_parents(groups);
            arrangement.center_children(groups);
        }
        let positions = arrangement.normalized();

        let mut junctions = Vec::new();
        let mut family_junctions = BTreeMap::new();
        for group in groups.iter() {
            if let Some(junction) = self.junction(group, &positions) {
                for family_id in group.family_ids.iter().chain([&group.family_id]) {
                    family_junctions.insert(*family_id, junction.id);
                }
                junctions.push(junction);
            }
        }
        junctions.sort_by_key(|j| j.id);

        let edges: Vec<Edge> = edges
            .iter()
            .map(|edge| {
                groups
                    .route(edge)
                    .filter(|g| g.partner_ids.contains(&edge.parent_id))
                    .and_then(|g| family_junctions.get(&g.family_id))
                    .map(|&junction| edge.routed(junction))
                    .unwrap_or_else(|| edge.clone())
            })
            .collect();

        debug!(
            nodes = positions.len(),
            junctions = junctions.len(),
            passes = CENTERING_PASSES,
            "layout complete"
        );

        TreeLayout {
            positions,
            junctions,
            edges,
            family_junctions,
            params_hash: self.config.params_hash(),
        }
    }

    fn junction(&self, group: &SiblingGroup, positions: &BTreeMap<PersonId, Position>) -> Option<Junction> {
        let parents: Vec<Position> = group.partner_ids.iter().filter_map(|p| positions.get(p).copied()).collect();
        let child_ids: Vec<PersonId> = group
            .children
            .iter()
            .filter(|c| positions.contains_key(c))
            .copied()
            .collect();
        if parents.is_empty() || child_ids.is_empty() {
            return None;
        }

        let x = parents.iter().map(|p| p.x).sum::<f64>() / parents.len() as f64 + self.config.node_width / 2.0;
        let parent_y = parents.iter().map(|p| p.y).fold(f64::MIN, f64::max);
        Some(Junction {
            id: JunctionId::for_family(group.family_id),
            family_id: group.family_id,
            partner_ids: group.partner_ids.clone(),
            child_ids,
            x,
            y: parent_y + self.config.node_height + self.config.junction_drop,
        })
    }
}

/// Working state of the centering passes.
struct Arrangement<'a> {
    config: &'a LayoutConfig,
    generation: BTreeMap<PersonId, i32>,
    /// Units per band, in fixed left-to-right order.
    bands: BTreeMap<i32, Vec<Vec<PersonId>>>,
    unit_of: BTreeMap<PersonId, (i32, usize)>,
    x: BTreeMap<PersonId, f64>,
}

impl<'a> Arrangement<'a> {
    fn initial(config: &'a LayoutConfig, nodes: &[PersonNode], couples: &[FamilyUnit]) -> Self {
        let generation: BTreeMap<PersonId, i32> = nodes.iter().map(|n| (n.id, n.generation)).collect();
        let order: BTreeMap<PersonId, usize> = nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();

        let mut partners: BTreeMap<PersonId, Vec<PersonId>> = BTreeMap::new();
        for couple in couples {
            let [a, b] = couple.partner_ids[..] else { continue };
            if a == b || generation.get(&a).is_none() || generation.get(&a) != generation.get(&b) {
                continue;
            }
            for (from, to) in [(a, b), (b, a)] {
                let list = partners.entry(from).or_default();
                if !list.contains(&to) {
                    list.push(to);
                }
            }
        }

        let mut bands: BTreeMap<i32, Vec<Vec<PersonId>>> = BTreeMap::new();
        let mut placed = BTreeSet::new();
        for node in nodes {
            if placed.contains(&node.id) {
                continue;
            }
            let chain = partner_chain(node.id, &partners, &order);
            placed.extend(chain.iter().copied());
            bands.entry(node.generation).or_default().push(chain);
        }
        // Partner chains lead each band, singles follow; discovery order within each.
        for units in bands.values_mut() {
            units.sort_by_key(|unit| unit.len() < 2);
        }

        let mut unit_of = BTreeMap::new();
        let mut x = BTreeMap::new();
        for (&gen, units) in &bands {
            let mut cursor = 0.0;
            for (index, unit) in units.iter().enumerate() {
                for (i, id) in unit.iter().enumerate() {
                    if i > 0 {
                        cursor += config.node_width + config.partner_gap;
                    }
                    x.insert(*id, cursor);
                    unit_of.insert(*id, (gen, index));
                }
                cursor += config.node_width + config.sibling_gap;
            }
        }

        Self {
            config,
            generation,
            bands,
            unit_of,
            x,
        }
    }

    fn center_of(&self, ids: &[PersonId]) -> Option<f64> {
        let xs: Vec<f64> = ids.iter().filter_map(|id| self.x.get(id).copied()).collect();
        if xs.is_empty() {
            return None;
        }
        let min = xs.iter().copied().fold(f64::MAX, f64::min);
        let max = xs.iter().copied().fold(f64::MIN, f64::max);
        Some((min + max) / 2.0 + self.config.node_width / 2.0)
    }

    /// Generation of the group's parents and its laid-out children.
    fn group_members(&self, group: &SiblingGroup) -> Option<(i32, Vec<PersonId>)> {
        let parent_gen = group.partner_ids.iter().find_map(|p| self.generation.get(p).copied())?;
        let children: Vec<PersonId> = group
            .children
            .iter()
            .filter(|c| self.generation.get(c) == Some(&(parent_gen + 1)))
            .copied()
            .collect();
        (!children.is_empty()).then_some((parent_gen, children))
    }

    /// Pass (a): bottom-up, move parents over their children.
    ///
    /// Suppressed families never own a group, so every group takes part.
    fn center_parents(&mut self, groups: &SiblingGroups) {
        let gens: Vec<i32> = self.bands.keys().rev().copied().collect();
        for gen in gens {
            for group in groups.iter() {
                let Some((parent_gen, children)) = self.group_members(group) else { continue };
                if parent_gen != gen {
                    continue;
                }
                // Partner midpoint: couple center for two, card center for one.
                let parents = self.partner_center(&group.partner_ids);
                if let (Some(parents), Some(kids)) = (parents, self.center_of(&children)) {
                    self.shift_units(&group.partner_ids, kids - parents);
                }
            }
            self.sweep(gen);
        }
    }

    /// Pass (b): top-down, move each children block under its parents.
    fn center_children(&mut self, groups: &SiblingGroups) {
        let gens: Vec<i32> = self.bands.keys().copied().collect();
        for gen in gens {
            for group in groups.iter() {
                let Some((parent_gen, children)) = self.group_members(group) else { continue };
                if parent_gen != gen {
                    continue;
                }
                let parents = self.partner_center(&group.partner_ids);
                if let (Some(parents), Some(kids)) = (parents, self.center_of(&children)) {
                    self.shift_units(&children, parents - kids);
                }
            }
            self.sweep(gen + 1);
        }
    }

    fn partner_center(&self, partners: &[PersonId]) -> Option<f64> {
        let xs: Vec<f64> = partners.iter().filter_map(|id| self.x.get(id).copied()).collect();
        if xs.is_empty() {
            return None;
        }
        Some(xs.iter().sum::<f64>() / xs.len() as f64 + self.config.node_width / 2.0)
    }

    /// Shift every unit holding one of `ids`, each unit once.
    fn shift_units(&mut self, ids: &[PersonId], dx: f64) {
        if dx == 0.0 {
            return;
        }
        let units: BTreeSet<(i32, usize)> = ids.iter().filter_map(|id| self.unit_of.get(id).copied()).collect();
        for (gen, index) in units {
            self.shift_unit(gen, index, dx);
        }
    }

    fn shift_unit(&mut self, gen: i32, index: usize, dx: f64) {
        let Some(unit) = self.bands.get(&gen).and_then(|units| units.get(index)) else { return };
        for id in unit {
            if let Some(x) = self.x.get_mut(id) {
                *x += dx;
            }
        }
    }

    /// Push units right, in band order, until every gap is restored.
    fn sweep(&mut self, gen: i32) {
        let Some(count) = self.bands.get(&gen).map(Vec::len) else { return };
        let mut right_edge: Option<f64> = None;
        for index in 0..count {
            let unit = &self.bands[&gen][index];
            let (Some(&first), Some(&last)) = (unit.first(), unit.last()) else { continue };
            let left = self.x[&first];
            if let Some(edge) = right_edge {
                let min_left = edge + self.config.sibling_gap;
                if left < min_left {
                    self.shift_unit(gen, index, min_left - left);
                }
            }
            right_edge = Some(self.x[&last] + self.config.node_width);
        }
    }

    /// Final positions translated so min x and min y sit on the margin.
    fn normalized(&self) -> BTreeMap<PersonId, Position> {
        let band_height = self.config.band_height();
        let min_x = self.x.values().copied().fold(f64::MAX, f64::min);
        let min_gen = self.bands.keys().next().copied().unwrap_or(0);

        self.x
            .iter()
            .map(|(id, &x)| {
                let gen = self.generation[id];
                let y = (gen - min_gen) as f64 * band_height;
                (*id, Position::new(x - min_x + self.config.margin, y + self.config.margin))
            })
            .collect()
    }
}

/// Linearize the partner component containing `start`.
///
/// Walks depth-first from the earliest-discovered endpoint (a member with at
/// most one partner), or from the earliest member if the component is a ring.
fn partner_chain(
    start: PersonId,
    partners: &BTreeMap<PersonId, Vec<PersonId>>,
    order: &BTreeMap<PersonId, usize>,
) -> Vec<PersonId> {
    let neighbors = |id: &PersonId| partners.get(id).map(Vec::as_slice).unwrap_or(&[]);

    let mut component = BTreeSet::from([start]);
    let mut queue = vec![start];
    while let Some(id) = queue.pop() {
        for next in neighbors(&id) {
            if component.insert(*next) {
                queue.push(*next);
            }
        }
    }

    let rank = |id: &PersonId| order.get(id).copied().unwrap_or(usize::MAX);
    let root = component
        .iter()
        .filter(|id| neighbors(id).len() <= 1)
        .min_by_key(|id| rank(id))
        .or_else(|| component.iter().min_by_key(|id| rank(id)))
        .copied()
        .unwrap_or(start);

    let mut chain = Vec::with_capacity(component.len());
    let mut visited = BTreeSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        chain.push(id);
        for next in neighbors(&id).iter().rev() {
            if !visited.contains(next) {
                stack.push(*next);
            }
        }
    }
    chain
}
