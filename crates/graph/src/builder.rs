use std::collections::HashMap;

use cadence_protocol::{DiscourseLink, Segment};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::classify::DiscourseClassifier;
use crate::cycles::find_cycle;
use crate::error::{GraphError, Result};
use crate::types::{LinkEdge, RelationGraph, SegmentNode};

/// Build a relation graph from one utterance's segments and links
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationGraphBuilder;

impl RelationGraphBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, segments: &[Segment], links: &[DiscourseLink]) -> Result<RelationGraph> {
        if segments.is_empty() {
            return Err(GraphError::Empty);
        }

        // Phase 1: one node per segment, in utterance order
        let mut graph: DiGraph<SegmentNode, LinkEdge> = DiGraph::new();
        let mut index: HashMap<String, NodeIndex> = HashMap::new();

        for (position, segment) in segments.iter().enumerate() {
            if index.contains_key(&segment.id) {
                return Err(GraphError::DuplicateSegment(segment.id.clone()));
            }
            if !(0.0..=1.0).contains(&segment.salience) || segment.salience.is_nan() {
                return Err(GraphError::InvalidSalience {
                    segment: segment.id.clone(),
                    salience: segment.salience.to_string(),
                });
            }
            let idx = graph.add_node(SegmentNode {
                segment: segment.clone(),
                position,
            });
            index.insert(segment.id.clone(), idx);
        }

        // Phase 2: one edge per link
        for (link_index, link) in links.iter().enumerate() {
            if !(0.0..=1.0).contains(&link.confidence) || link.confidence.is_nan() {
                return Err(GraphError::InvalidConfidence {
                    link: link_index,
                    confidence: link.confidence.to_string(),
                });
            }
            let from = lookup(&index, link_index, &link.source)?;
            let to = lookup(&index, link_index, &link.target)?;
            graph.add_edge(
                from,
                to,
                LinkEdge {
                    relation: link.relation,
                    link_index,
                },
            );
        }

        // Phase 3: reject cycles; alternation edges join siblings, not dependencies
        if let Some(cycle) = find_cycle(&graph, |edge| !edge.relation.is_sibling_option()) {
            let path: Vec<String> = cycle
                .into_iter()
                .map(|idx| graph[idx].segment.id.clone())
                .collect();
            log::warn!("Rejecting cyclic relation graph: {}", path.join(" -> "));
            return Err(GraphError::Cycle { path });
        }

        // Phase 4: root and discourse shape
        let root_position = segments
            .iter()
            .position(|s| s.is_main_point)
            .unwrap_or(0);
        let root = index[&segments[root_position].id];
        let discourse_type = DiscourseClassifier::classify(segments, links);

        log::info!(
            "Built relation graph: {} segments, {} links, root={}, type={}",
            graph.node_count(),
            graph.edge_count(),
            segments[root_position].id,
            discourse_type.as_str()
        );

        Ok(RelationGraph {
            graph,
            index,
            links: links.to_vec(),
            root,
            discourse_type,
        })
    }
}

fn lookup(index: &HashMap<String, NodeIndex>, link: usize, id: &str) -> Result<NodeIndex> {
    index
        .get(id)
        .copied()
        .ok_or_else(|| GraphError::UnknownSegment {
            link,
            segment: id.to_string(),
        })
}
