//! Sibling-group merging for blended families.
//!
//! Genealogical data often splits one household across several family
//! records: a child recorded under a lone parent before the couple's own
//! record existed, or the same couple recorded twice. Rendering each record
//! separately would tear full and half siblings apart.
//!
//! The merger derives a lookup table keyed by [`PartnerSet`]: every couple's
//! group collects the children of its own family plus those of any family
//! whose partner set is a non-empty subset of the couple. Families whose
//! children render under another group are *suppressed* and skipped by the
//! layout's centering passes.
//!
//! ## Assignment (per child)
//!
//! A child qualifies under every couple it is recorded under and every
//! couple enclosing a lone-parent family it is recorded under. Among those
//! couples the one whose primary family id is lowest wins, and more than one
//! candidate raises an `AmbiguousMerge` warning. Only a child with no
//! qualifying couple stays under its lone-parent family.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::{DataWarning, DataWarningKind, Edge, FamilyId, FamilyUnit, PersonId};

/// Order-independent set of one or two partners.
///
/// Variant order makes lone parents sort before couples; within a variant,
/// sorting follows the partner ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartnerSet {
    /// One parent.
    SingleParent {
        /// The parent.
        a: PersonId,
    },
    /// Two partners, `a < b`.
    Couple {
        /// Lower partner id.
        a: PersonId,
        /// Higher partner id.
        b: PersonId,
    },
}

impl PartnerSet {
    /// Key for a partner list. `None` for zero or more than two distinct partners.
    pub fn from_partners(partners: &[PersonId]) -> Option<Self> {
        let distinct: BTreeSet<PersonId> = partners.iter().copied().collect();
        let mut it = distinct.into_iter();
        match (it.next(), it.next(), it.next()) {
            (Some(a), None, None) => Some(Self::SingleParent { a }),
            (Some(a), Some(b), None) => Some(Self::Couple { a, b }),
            _ => None,
        }
    }

    /// Whether this set has two partners.
    pub fn is_couple(&self) -> bool {
        matches!(self, Self::Couple { .. })
    }

    /// Whether a person is in the set.
    pub fn contains(&self, id: PersonId) -> bool {
        match *self {
            Self::SingleParent { a } => a == id,
            Self::Couple { a, b } => a == id || b == id,
        }
    }

    /// Whether every partner of `self` is in `other`.
    pub fn is_subset_of(&self, other: &PartnerSet) -> bool {
        match *self {
            Self::SingleParent { a } => other.contains(a),
            Self::Couple { a, b } => other.contains(a) && other.contains(b),
        }
    }

    /// Partners in ascending id order.
    pub fn members(&self) -> Vec<PersonId> {
        match *self {
            Self::SingleParent { a } => vec![a],
            Self::Couple { a, b } => vec![a, b],
        }
    }
}

/// Children rendered together under one couple or lone parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiblingGroup {
    /// Partner set the group hangs from.
    pub key: PartnerSet,
    /// Lowest family id recorded for exactly this partner set.
    pub family_id: FamilyId,
    /// Partners in the primary family's order.
    pub partner_ids: Vec<PersonId>,
    /// Every family that contributed a child, ascending.
    pub family_ids: Vec<FamilyId>,
    /// Children in first-recorded order.
    pub children: Vec<PersonId>,
}

impl SiblingGroup {
    /// Whether the group has exactly two partners.
    pub fn is_couple(&self) -> bool {
        self.key.is_couple()
    }
}

/// Derived sibling-group table for one tree.
#[derive(Debug, Clone, Default)]
pub struct SiblingGroups {
    groups: BTreeMap<PartnerSet, SiblingGroup>,
    child_group: BTreeMap<PersonId, PartnerSet>,
    suppressed: BTreeSet<FamilyId>,
    warnings: Vec<DataWarning>,
}

/// A family as seen by the merger.
struct Unit {
    key: PartnerSet,
    partner_ids: Vec<PersonId>,
    children: Vec<PersonId>,
}

impl SiblingGroups {
    /// Derive sibling groups from couples and the edges that carry children.
    pub fn build(couples: &[FamilyUnit], edges: &[Edge]) -> Self {
        let mut warnings = Vec::new();
        let units = collect_units(couples, edges, &mut warnings);

        // Lowest family id per partner set.
        let mut primary: BTreeMap<PartnerSet, FamilyId> = BTreeMap::new();
        for (&family_id, unit) in &units {
            primary.entry(unit.key).or_insert(family_id);
        }
        let couple_keys: Vec<PartnerSet> = primary.keys().filter(|k| k.is_couple()).copied().collect();

        // Families recording each child, in first-seen child order.
        let mut child_order: Vec<PersonId> = Vec::new();
        let mut child_families: BTreeMap<PersonId, Vec<FamilyId>> = BTreeMap::new();
        for (&family_id, unit) in &units {
            for &child in &unit.children {
                let families = child_families.entry(child).or_insert_with(|| {
                    child_order.push(child);
                    Vec::new()
                });
                families.push(family_id);
            }
        }

        let mut groups: BTreeMap<PartnerSet, SiblingGroup> = BTreeMap::new();
        let mut child_group = BTreeMap::new();
        for child in child_order {
            let families = &child_families[&child];
            let key = assign(child, families, &units, &couple_keys, &primary, &mut warnings);

            let group = groups.entry(key).or_insert_with(|| {
                let family_id = primary[&key];
                SiblingGroup {
                    key,
                    family_id,
                    partner_ids: units[&family_id].partner_ids.clone(),
                    family_ids: Vec::new(),
                    children: Vec::new(),
                }
            });
            group.children.push(child);
            for family_id in families {
                if units[family_id].key.is_subset_of(&key) && !group.family_ids.contains(family_id) {
                    group.family_ids.push(*family_id);
                }
            }
            child_group.insert(child, key);
        }

        let primaries: BTreeSet<FamilyId> = groups.values().map(|g| g.family_id).collect();
        let mut suppressed = BTreeSet::new();
        for group in groups.values_mut() {
            group.family_ids.sort();
            suppressed.extend(group.family_ids.iter().filter(|f| !primaries.contains(f)).copied());
        }
        Self {
            groups,
            child_group,
            suppressed,
            warnings,
        }
    }

    /// All groups in key order.
    pub fn iter(&self) -> impl Iterator<Item = &SiblingGroup> {
        self.groups.values()
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group for a partner set.
    pub fn get(&self, key: &PartnerSet) -> Option<&SiblingGroup> {
        self.groups.get(key)
    }

    /// Group a child renders in.
    pub fn group_of_child(&self, child: PersonId) -> Option<&SiblingGroup> {
        self.child_group.get(&child).and_then(|k| self.groups.get(k))
    }

    /// Group whose primary family is `family_id`.
    pub fn group_of_family(&self, family_id: FamilyId) -> Option<&SiblingGroup> {
        self.groups.values().find(|g| g.family_id == family_id)
    }

    /// Group an edge's child is drawn from, if the edge's family contributes to it.
    pub fn route(&self, edge: &Edge) -> Option<&SiblingGroup> {
        self.group_of_child(edge.child_id)
            .filter(|g| g.family_ids.contains(&edge.family_id))
    }

    /// Whether a family's children render under another family's group.
    pub fn is_suppressed(&self, family_id: FamilyId) -> bool {
        self.suppressed.contains(&family_id)
    }

    /// Families whose children render under another family's group.
    pub fn suppressed(&self) -> &BTreeSet<FamilyId> {
        &self.suppressed
    }

    /// Warnings raised while merging.
    pub fn warnings(&self) -> &[DataWarning] {
        &self.warnings
    }
}

/// Build the per-family view: couples first, then families known only from edges.
fn collect_units(
    couples: &[FamilyUnit],
    edges: &[Edge],
    warnings: &mut Vec<DataWarning>,
) -> BTreeMap<FamilyId, Unit> {
    let mut units: BTreeMap<FamilyId, Unit> = BTreeMap::new();
    for couple in couples {
        if units.contains_key(&couple.family_id) {
            continue;
        }
        match PartnerSet::from_partners(&couple.partner_ids) {
            Some(key) => {
                units.insert(
                    couple.family_id,
                    Unit {
                        key,
                        partner_ids: couple.partner_ids.clone(),
                        children: Vec::new(),
                    },
                );
            }
            None => warnings.push(DataWarning::new(
                DataWarningKind::MalformedFamily,
                Some(couple.family_id),
                None,
                format!("family has {} partners, not merged", couple.partner_ids.len()),
            )),
        }
    }

    // Families referenced by edges but missing a couple record.
    let mut orphan_parents: BTreeMap<FamilyId, Vec<PersonId>> = BTreeMap::new();
    for edge in edges {
        if !units.contains_key(&edge.family_id) {
            let parents = orphan_parents.entry(edge.family_id).or_default();
            if !parents.contains(&edge.parent_id) {
                parents.push(edge.parent_id);
            }
        }
    }
    for (family_id, parents) in orphan_parents {
        match PartnerSet::from_partners(&parents) {
            Some(key) => {
                warnings.push(DataWarning::new(
                    DataWarningKind::UnresolvedFamily,
                    Some(family_id),
                    None,
                    "edges reference a family with no couple record; using edge parents",
                ));
                units.insert(
                    family_id,
                    Unit {
                        key,
                        partner_ids: key.members(),
                        children: Vec::new(),
                    },
                );
            }
            None => warnings.push(DataWarning::new(
                DataWarningKind::MalformedFamily,
                Some(family_id),
                None,
                format!("edges name {} parents for one family, not merged", parents.len()),
            )),
        }
    }

    for edge in edges {
        if let Some(unit) = units.get_mut(&edge.family_id) {
            if !unit.children.contains(&edge.child_id) {
                unit.children.push(edge.child_id);
            }
        }
    }
    units
}

/// Pick the group a child renders in.
fn assign(
    child: PersonId,
    families: &[FamilyId],
    units: &BTreeMap<FamilyId, Unit>,
    couple_keys: &[PartnerSet],
    primary: &BTreeMap<PartnerSet, FamilyId>,
    warnings: &mut Vec<DataWarning>,
) -> PartnerSet {
    let mut couples = BTreeSet::new();
    let mut lone = BTreeSet::new();

    for family_id in families {
        let key = units[family_id].key;
        if key.is_couple() {
            couples.insert(key);
            continue;
        }
        let enclosing: Vec<PartnerSet> = couple_keys
            .iter()
            .filter(|c| key.is_subset_of(c))
            .copied()
            .collect();
        if enclosing.is_empty() {
            lone.insert(key);
        } else {
            couples.extend(enclosing);
        }
    }

    let by_primary = |keys: &BTreeSet<PartnerSet>| keys.iter().copied().min_by_key(|k| primary[k]);
    let chosen = by_primary(&couples).or_else(|| by_primary(&lone));

    if couples.len() > 1 || (couples.is_empty() && lone.len() > 1) {
        let pool = if couples.is_empty() { &lone } else { &couples };
        let candidates: Vec<String> = pool.iter().map(|k| primary[k].to_string()).collect();
        let chosen_family = chosen.map(|k| primary[&k]);
        warnings.push(DataWarning::new(
            DataWarningKind::AmbiguousMerge,
            chosen_family,
            Some(child),
            format!(
                "child {} qualifies for families [{}]; assigned to {}",
                child,
                candidates.join(", "),
                chosen_family.map(|f| f.to_string()).unwrap_or_default()
            ),
        ));
    }

    // Every family of the child yields at least one candidate.
    chosen.unwrap_or_else(|| units[&families[0]].key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: i64) -> PersonId {
        PersonId::new(id)
    }

    fn f(id: i64) -> FamilyId {
        FamilyId::new(id)
    }

    fn unit(id: i64, partners: &[i64]) -> FamilyUnit {
        FamilyUnit::new(f(id), partners.iter().map(|&x| p(x)).collect())
    }

    fn edges(family: i64, parents: &[i64], children: &[i64]) -> Vec<Edge> {
        children
            .iter()
            .flat_map(|&c| parents.iter().map(move |&pa| Edge::biological(p(pa), p(c), f(family))))
            .collect()
    }

    fn couple(a: i64, b: i64) -> PartnerSet {
        PartnerSet::from_partners(&[p(a), p(b)]).unwrap()
    }

    #[test]
    fn test_partner_set_is_order_independent() {
        assert_eq!(couple(2, 1), couple(1, 2));
        assert_eq!(PartnerSet::from_partners(&[p(3), p(3)]), Some(PartnerSet::SingleParent { a: p(3) }));
        assert_eq!(PartnerSet::from_partners(&[]), None);
        assert_eq!(PartnerSet::from_partners(&[p(1), p(2), p(3)]), None);

        let single = PartnerSet::SingleParent { a: p(2) };
        assert!(single.is_subset_of(&couple(1, 2)));
        assert!(!single.is_subset_of(&couple(1, 3)));
    }

    #[test]
    fn test_single_parent_children_merge_into_couple() {
        // (P1,P2) -> {A,B}; (P2) -> {C}
        let couples = vec![unit(1, &[1, 2]), unit(2, &[2])];
        let mut all = edges(1, &[1, 2], &[10, 11]);
        all.extend(edges(2, &[2], &[12]));

        let groups = SiblingGroups::build(&couples, &all);
        assert_eq!(groups.len(), 1);

        let group = groups.get(&couple(1, 2)).unwrap();
        assert_eq!(group.children, vec![p(10), p(11), p(12)]);
        assert_eq!(group.family_id, f(1));
        assert_eq!(group.family_ids, vec![f(1), f(2)]);
        assert!(groups.is_suppressed(f(2)));
        assert!(!groups.is_suppressed(f(1)));
        assert!(groups.warnings().is_empty());
    }

    #[test]
    fn test_earlier_single_parent_record_still_merges() {
        // The lone-parent record has the lower id.
        let couples = vec![unit(5, &[2]), unit(9, &[2, 1])];
        let mut all = edges(5, &[2], &[12]);
        all.extend(edges(9, &[2, 1], &[10]));

        let groups = SiblingGroups::build(&couples, &all);
        let group = groups.group_of_child(p(12)).unwrap();
        assert_eq!(group.family_id, f(9));
        assert_eq!(group.partner_ids, vec![p(2), p(1)]);
        assert_eq!(group.children, vec![p(12), p(10)]);
        assert!(groups.is_suppressed(f(5)));
    }

    #[test]
    fn test_lone_parent_without_couple_keeps_own_group() {
        let couples = vec![unit(3, &[7])];
        let all = edges(3, &[7], &[20, 21]);

        let groups = SiblingGroups::build(&couples, &all);
        let group = groups.group_of_family(f(3)).unwrap();
        assert_eq!(group.key, PartnerSet::SingleParent { a: p(7) });
        assert_eq!(group.children, vec![p(20), p(21)]);
        assert!(groups.suppressed().is_empty());
    }

    #[test]
    fn test_duplicate_couple_records_collapse() {
        let couples = vec![unit(4, &[1, 2]), unit(8, &[2, 1])];
        let mut all = edges(4, &[1, 2], &[10]);
        all.extend(edges(8, &[2, 1], &[11]));

        let groups = SiblingGroups::build(&couples, &all);
        assert_eq!(groups.len(), 1);
        let group = groups.get(&couple(1, 2)).unwrap();
        assert_eq!(group.family_id, f(4));
        assert_eq!(group.children, vec![p(10), p(11)]);
        assert!(groups.is_suppressed(f(8)));
    }

    #[test]
    fn test_disjoint_couples_tie_break_to_lowest_family() {
        // Child 30 recorded under two unrelated couples.
        let couples = vec![unit(7, &[3, 4]), unit(6, &[1, 2])];
        let mut all = edges(7, &[3, 4], &[30]);
        all.extend(edges(6, &[1, 2], &[30, 31]));

        let groups = SiblingGroups::build(&couples, &all);
        assert_eq!(groups.group_of_child(p(30)).unwrap().family_id, f(6));
        assert_eq!(groups.warnings().len(), 1);
        assert_eq!(groups.warnings()[0].kind, DataWarningKind::AmbiguousMerge);
        assert_eq!(groups.warnings()[0].family_id, Some(f(6)));

        // Edges of the losing family are not routed through the winner.
        let losing = Edge::biological(p(3), p(30), f(7));
        assert!(groups.route(&losing).is_none());
        let winning = Edge::biological(p(1), p(30), f(6));
        assert_eq!(groups.route(&winning).unwrap().family_id, f(6));
    }

    #[test]
    fn test_lone_parent_with_two_partners_is_ambiguous() {
        // 2 has partners 1 and 3; child 12 recorded under 2 alone.
        let couples = vec![unit(1, &[1, 2]), unit(2, &[2, 3]), unit(3, &[2])];
        let mut all = edges(1, &[1, 2], &[10]);
        all.extend(edges(2, &[2, 3], &[11]));
        all.extend(edges(3, &[2], &[12]));

        let groups = SiblingGroups::build(&couples, &all);
        assert_eq!(groups.group_of_child(p(12)).unwrap().family_id, f(1));
        assert!(groups.is_suppressed(f(3)));
        assert_eq!(groups.warnings().len(), 1);
    }

    #[test]
    fn test_subset_record_competes_with_direct_record() {
        // 12 is recorded under (2,3) directly and under 2 alone; (1,2) also exists.
        let couples = vec![unit(1, &[1, 2]), unit(2, &[2, 3]), unit(3, &[2])];
        let mut all = edges(1, &[1, 2], &[10]);
        all.extend(edges(2, &[2, 3], &[12]));
        all.extend(edges(3, &[2], &[12]));

        let groups = SiblingGroups::build(&couples, &all);
        assert_eq!(groups.group_of_child(p(12)).unwrap().family_id, f(1));
        assert_eq!(groups.warnings().len(), 1);
        assert_eq!(groups.warnings()[0].kind, DataWarningKind::AmbiguousMerge);
    }

    #[test]
    fn test_lone_parent_record_ties_to_lower_couple() {
        // (1,2) fam 5; 2 alone fam 6 -> {30}; unrelated (3,4) fam 9 -> {30}
        let couples = vec![unit(5, &[1, 2]), unit(6, &[2]), unit(9, &[3, 4])];
        let mut all = edges(5, &[1, 2], &[20]);
        all.extend(edges(6, &[2], &[30]));
        all.extend(edges(9, &[3, 4], &[30]));

        let groups = SiblingGroups::build(&couples, &all);
        let group = groups.group_of_child(p(30)).unwrap();
        assert_eq!(group.family_id, f(5));
        assert_eq!(group.children, vec![p(20), p(30)]);
        assert_eq!(group.family_ids, vec![f(5), f(6)]);
        assert!(groups.is_suppressed(f(6)));
        assert!(groups.iter().all(|g| !groups.is_suppressed(g.family_id)));

        assert_eq!(groups.warnings().len(), 1);
        assert_eq!(groups.warnings()[0].kind, DataWarningKind::AmbiguousMerge);
        assert_eq!(groups.warnings()[0].family_id, Some(f(5)));

        assert_eq!(groups.route(&Edge::biological(p(2), p(30), f(6))).unwrap().family_id, f(5));
        assert!(groups.route(&Edge::biological(p(3), p(30), f(9))).is_none());
    }

    #[test]
    fn test_family_without_couple_record_uses_edge_parents() {
        let couples = vec![];
        let all = edges(9, &[5], &[50]);

        let groups = SiblingGroups::build(&couples, &all);
        let group = groups.group_of_child(p(50)).unwrap();
        assert_eq!(group.partner_ids, vec![p(5)]);
        assert_eq!(groups.warnings()[0].kind, DataWarningKind::UnresolvedFamily);
    }
}
