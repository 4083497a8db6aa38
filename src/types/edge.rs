//! Parent→child edge types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::family::{FamilyId, Relationship};
use super::person::PersonId;

/// Identifier of a synthetic routing junction.
///
/// A junction belongs to exactly one sibling group and shares the numeric id
/// of that group's primary family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JunctionId(i64);

impl JunctionId {
    /// Junction of the sibling group whose primary family is `family_id`.
    pub const fn for_family(family_id: FamilyId) -> Self {
        Self(family_id.get())
    }

    /// Get the inner numeric id.
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for JunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "j{}", self.0)
    }
}

/// Edge in the family graph.
///
/// Represents one partner→child link recorded by one family.
/// Implements `Ord` for deterministic ordering: (family, child, parent).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Parent (source).
    pub parent_id: PersonId,
    /// Child (target).
    pub child_id: PersonId,
    /// Family that records the link.
    pub family_id: FamilyId,
    /// Biological or not.
    pub relationship: Relationship,
    /// Junction the edge is drawn from, once laid out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routed_source: Option<JunctionId>,
}

impl Edge {
    /// Create a new, unrouted edge.
    pub fn new(
        parent_id: PersonId,
        child_id: PersonId,
        family_id: FamilyId,
        relationship: Relationship,
    ) -> Self {
        Self {
            parent_id,
            child_id,
            family_id,
            relationship,
            routed_source: None,
        }
    }

    /// Create a biological edge.
    pub fn biological(parent_id: PersonId, child_id: PersonId, family_id: FamilyId) -> Self {
        Self::new(parent_id, child_id, family_id, Relationship::Biological)
    }

    /// Copy of this edge drawn from the given junction.
    pub fn routed(&self, junction: JunctionId) -> Self {
        Self {
            routed_source: Some(junction),
            ..self.clone()
        }
    }

    fn key(&self) -> (FamilyId, PersonId, PersonId) {
        (self.family_id, self.child_id, self.parent_id)
    }
}

// Canonical ordering: family, then child, then parent
impl PartialOrd for Edge {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Edge {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key()
            .cmp(&other.key())
            .then_with(|| self.relationship.cmp(&other.relationship))
            .then_with(|| self.routed_source.cmp(&other.routed_source))
    }
}
