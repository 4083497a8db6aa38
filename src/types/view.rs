//! Tree result types handed to the rendering surface.

use serde::{Deserialize, Serialize};

use super::edge::{Edge, JunctionId};
use super::family::{FamilyId, FamilyUnit};
use super::person::{PersonId, PersonNode};
use super::warning::DataWarning;

/// A point on the canvas. Origin top-left, y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate of the node's left edge.
    pub x: f64,
    /// Vertical coordinate of the node's top edge.
    pub y: f64,
}

impl Position {
    /// Create a position.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Synthetic zero-size branch point below a couple with children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    /// Junction identifier.
    pub id: JunctionId,
    /// Primary family of the sibling group the junction serves.
    pub family_id: FamilyId,
    /// Parents the junction hangs from.
    pub partner_ids: Vec<PersonId>,
    /// Children drawn from the junction.
    pub child_ids: Vec<PersonId>,
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// A person with its final position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedNode {
    /// The person.
    #[serde(flatten)]
    pub node: PersonNode,
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// A couple with the positions of its partners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedCouple {
    /// The couple record.
    #[serde(flatten)]
    pub unit: FamilyUnit,
    /// Partner positions, in `partner_ids` order.
    pub partner_positions: Vec<Position>,
    /// Junction the couple's children hang from, if it has any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub junction_id: Option<JunctionId>,
}

/// Maximum depth available in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DepthProbe {
    /// Deepest fully explored level.
    pub depth: u32,
    /// Whether the probe stopped at its cap or budget before exhausting the tree.
    pub truncated: bool,
}

impl DepthProbe {
    /// An exact probe result.
    pub const fn exact(depth: u32) -> Self {
        Self { depth, truncated: false }
    }

    /// A best-effort result that stopped early.
    pub const fn truncated(depth: u32) -> Self {
        Self { depth, truncated: true }
    }
}

/// Complete tree around a focus person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeView {
    /// The focus person.
    pub focus_id: PersonId,
    /// Deepest ancestor level available.
    pub max_ancestor_depth: DepthProbe,
    /// Deepest descendant level available.
    pub max_descendant_depth: DepthProbe,
    /// People with positions.
    pub nodes: Vec<PositionedNode>,
    /// Parent→child edges, routed through junctions where possible.
    pub edges: Vec<Edge>,
    /// Couples with partner positions.
    pub couples: Vec<PositionedCouple>,
    /// Edge-routing junctions.
    pub junctions: Vec<Junction>,
    /// Data-quality warnings raised while building the tree.
    pub warnings: Vec<DataWarning>,
    /// Hash of the layout parameters.
    pub layout_params_hash: String,
    /// Hash of all positions and junctions.
    pub layout_fingerprint: String,
    /// Result schema version.
    pub schema_version: String,
}

impl TreeView {
    /// Find a node by id.
    pub fn node(&self, id: PersonId) -> Option<&PositionedNode> {
        self.nodes.iter().find(|n| n.node.id == id)
    }

    /// Find a couple by family id.
    pub fn couple(&self, family_id: FamilyId) -> Option<&PositionedCouple> {
        self.couples.iter().find(|c| c.unit.family_id == family_id)
    }

    /// Number of people in the tree.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }
}
