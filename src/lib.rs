//! # pedigree-kernel
//!
//! Deterministic genealogical tree assembly and layout.
//!
//! The kernel answers one question:
//!
//! > Given a focus person and depth bounds, which relatives belong in the
//! > view, and where does each one go on the canvas?
//!
//! ## Core Contract
//!
//! 1. Collect every person within the requested generations, with one
//!    batched store lookup per level
//! 2. Report how deep the tree actually goes, capped and time-bounded
//! 3. Merge sibling groups split across family records
//! 4. Produce a generation-banded, centered layout with a **layout
//!    fingerprint** for downstream verification
//!
//! ## Architecture
//!
//! ```text
//! Focus → TreeTraversal → SiblingGroups → LayoutEngine → TreeView
//!              ↓               DepthProber ↗
//!        FamilyStore (Postgres or Memory)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same focus + same depths + same records → identical `layout_fingerprint`
//! - Families are processed in ascending id order
//! - Nodes are ordered by (generation, discovery)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod store;
pub mod traversal;
pub mod probe;
pub mod merge;
pub mod layout;
pub mod canonical;
pub mod tree;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use types::{
    DataWarning, DataWarningKind, DepthProbe, Edge, FamilyId, FamilyRecord, FamilyType,
    FamilyUnit, Junction, JunctionId, PersonId, PersonNode, PersonRecord, Position,
    PositionedCouple, PositionedNode, Relationship, Sex, TreeView,
};
pub use store::{FamilyStore, InMemoryFamilyStore};
#[cfg(feature = "postgres")]
pub use store::PostgresFamilyStore;
pub use traversal::{Direction, FamilyGraph, TreeError, TreeTraversal};
pub use probe::{DepthProber, ProbeConfig};
pub use merge::{PartnerSet, SiblingGroup, SiblingGroups};
pub use layout::{LayoutConfig, LayoutEngine, TreeLayout};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use tree::FamilyTreeBuilder;

/// Tree result schema version.
///
/// Increment on breaking changes to `TreeView` or its parts.
pub const TREE_SCHEMA_VERSION: &str = "1.0.0";

/// Hard upper bound on traversal and probe depth, per direction.
pub const MAX_DEPTH_CAP: u32 = 20;
