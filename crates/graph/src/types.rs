use std::collections::HashMap;

use cadence_protocol::{DiscourseLink, RelationType, Segment};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::classify::DiscourseType;

/// Node in the relation graph
#[derive(Debug, Clone)]
pub struct SegmentNode {
    pub segment: Segment,

    /// Position in the utterance
    pub position: usize,
}

/// Edge in the relation graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEdge {
    pub relation: RelationType,

    /// Index into the original link list
    pub link_index: usize,
}

/// Validated, acyclic relation graph for one utterance.
#[derive(Debug, Clone)]
pub struct RelationGraph {
    pub(crate) graph: DiGraph<SegmentNode, LinkEdge>,
    pub(crate) index: HashMap<String, NodeIndex>,
    pub(crate) links: Vec<DiscourseLink>,
    pub(crate) root: NodeIndex,
    pub(crate) discourse_type: DiscourseType,
}

impl RelationGraph {
    /// Segments in utterance order
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        // petgraph keeps insertion order for node indices
        self.graph.node_weights().map(|node| &node.segment)
    }

    pub fn segment(&self, id: &str) -> Option<&Segment> {
        self.index
            .get(id)
            .and_then(|&idx| self.graph.node_weight(idx))
            .map(|node| &node.segment)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index
            .get(id)
            .and_then(|&idx| self.graph.node_weight(idx))
            .map(|node| node.position)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn links(&self) -> &[DiscourseLink] {
        &self.links
    }

    pub fn root(&self) -> &Segment {
        &self.graph[self.root].segment
    }

    pub fn discourse_type(&self) -> DiscourseType {
        self.discourse_type
    }

    /// Links leaving `id`, as `(link_index, target_id)`
    pub fn outgoing(&self, id: &str) -> Vec<(usize, &str)> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Links entering `id`, as `(link_index, source_id)`
    pub fn incoming(&self, id: &str) -> Vec<(usize, &str)> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<(usize, &str)> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<(usize, &str)> = self
            .graph
            .edges_directed(idx, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (edge.weight().link_index, self.graph[other].segment.id.as_str())
            })
            .collect();
        out.sort_by_key(|(link, _)| *link);
        out
    }

    /// Segments nothing else points at (ignoring alternation siblings)
    pub fn sources(&self) -> Vec<&Segment> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                !self
                    .graph
                    .edges_directed(idx, Direction::Incoming)
                    .any(|e| !e.weight().relation.is_sibling_option())
            })
            .map(|idx| &self.graph[idx].segment)
            .collect()
    }

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get edge count
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
