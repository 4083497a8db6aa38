//! Tree assembly.
//!
//! Runs the whole pipeline for one request and returns the view handed to
//! the rendering surface:
//!
//! ```text
//! focus → TreeTraversal → SiblingGroups → LayoutEngine → TreeView
//!       → DepthProber ───────────────────────────────────↗
//! ```

use std::sync::Arc;

use tracing::info;

use crate::layout::{LayoutConfig, LayoutEngine};
use crate::merge::SiblingGroups;
use crate::probe::{DepthProber, ProbeConfig};
use crate::store::FamilyStore;
use crate::traversal::{TreeError, TreeTraversal};
use crate::types::{PersonId, PositionedCouple, PositionedNode, TreeView};
use crate::TREE_SCHEMA_VERSION;

/// Builds positioned trees around a focus person.
pub struct FamilyTreeBuilder<S: FamilyStore> {
    traversal: TreeTraversal<S>,
    prober: DepthProber<S>,
    engine: LayoutEngine,
}

impl<S: FamilyStore + 'static> FamilyTreeBuilder<S> {
    /// Create a builder.
    pub fn new(store: Arc<S>, layout: LayoutConfig, probe: ProbeConfig) -> Self {
        Self {
            traversal: TreeTraversal::new(Arc::clone(&store)),
            prober: DepthProber::new(store, probe),
            engine: LayoutEngine::new(layout),
        }
    }

    /// Create a builder with default layout and probe settings.
    pub fn with_defaults(store: Arc<S>) -> Self {
        Self::new(store, LayoutConfig::default(), ProbeConfig::default())
    }

    /// Get the layout config.
    pub fn layout_config(&self) -> &LayoutConfig {
        self.engine.config()
    }

    /// Build the tree around `focus_id`.
    ///
    /// Fails only for an unknown focus person, an out-of-range depth, or a
    /// store failure during traversal. Data inconsistencies surface as
    /// warnings in the result.
    pub async fn build(
        &self,
        focus_id: PersonId,
        ancestor_depth: i32,
        descendant_depth: i32,
    ) -> Result<TreeView, TreeError> {
        let graph = self.traversal.traverse(focus_id, ancestor_depth, descendant_depth).await?;
        let (max_ancestor_depth, max_descendant_depth) = self.prober.probe_both(focus_id).await;

        let groups = SiblingGroups::build(&graph.couples, &graph.edges);
        let layout = self.engine.layout(&graph.nodes, &graph.edges, &graph.couples, &groups);

        let mut warnings = graph.warnings;
        warnings.extend(groups.warnings().iter().cloned());

        let nodes: Vec<PositionedNode> = graph
            .nodes
            .into_iter()
            .map(|node| {
                let position = layout.position(node.id).unwrap_or_default();
                PositionedNode {
                    node,
                    x: position.x,
                    y: position.y,
                }
            })
            .collect();

        let couples: Vec<PositionedCouple> = graph
            .couples
            .into_iter()
            .map(|unit| PositionedCouple {
                partner_positions: unit
                    .partner_ids
                    .iter()
                    .map(|p| layout.position(*p).unwrap_or_default())
                    .collect(),
                junction_id: layout.junction_for_family(unit.family_id),
                unit,
            })
            .collect();

        let view = TreeView {
            focus_id,
            max_ancestor_depth,
            max_descendant_depth,
            nodes,
            layout_fingerprint: layout.fingerprint(),
            layout_params_hash: layout.params_hash().to_string(),
            edges: layout.edges,
            couples,
            junctions: layout.junctions,
            warnings,
            schema_version: TREE_SCHEMA_VERSION.to_string(),
        };

        info!(
            focus_id = %focus_id,
            ancestor_depth,
            descendant_depth,
            nodes = view.nodes.len(),
            edges = view.edges.len(),
            couples = view.couples.len(),
            junctions = view.junctions.len(),
            warnings = view.warnings.len(),
            fingerprint = %view.layout_fingerprint,
            "tree built"
        );
        Ok(view)
    }
}
