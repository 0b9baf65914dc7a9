use std::collections::HashMap;
use std::hash::Hash;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

struct Frame<K> {
    node: K,
    neighbors: Vec<K>,
    next: usize,
}

/// Depth-first cycle search with an explicit stack.
///
/// `nodes` fixes the visiting order (so the reported cycle is deterministic);
/// `neighbors` yields the successors of a node. Returns the first cycle found
/// as a closed path `[a, b, ..., a]`.
pub fn find_cycle_by<K, I, F>(nodes: I, mut neighbors: F) -> Option<Vec<K>>
where
    K: Clone + Eq + Hash,
    I: IntoIterator<Item = K>,
    F: FnMut(&K) -> Vec<K>,
{
    let mut marks: HashMap<K, Mark> = HashMap::new();

    for start in nodes {
        if marks.contains_key(&start) {
            continue;
        }

        let mut path: Vec<K> = vec![start.clone()];
        let mut stack = vec![Frame {
            neighbors: neighbors(&start),
            node: start.clone(),
            next: 0,
        }];
        marks.insert(start, Mark::InProgress);

        while let Some(frame) = stack.last_mut() {
            if frame.next < frame.neighbors.len() {
                let candidate = frame.neighbors[frame.next].clone();
                frame.next += 1;

                match marks.get(&candidate) {
                    Some(Mark::InProgress) => {
                        let from = path.iter().position(|n| *n == candidate).unwrap_or(0);
                        let mut cycle: Vec<K> = path[from..].to_vec();
                        cycle.push(candidate);
                        return Some(cycle);
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(candidate.clone(), Mark::InProgress);
                        path.push(candidate.clone());
                        let next_neighbors = neighbors(&candidate);
                        stack.push(Frame {
                            node: candidate,
                            neighbors: next_neighbors,
                            next: 0,
                        });
                    }
                }
            } else {
                let finished = frame.node.clone();
                stack.pop();
                path.pop();
                marks.insert(finished, Mark::Done);
            }
        }
    }

    None
}

/// Cycle search over a petgraph graph, following only edges accepted by
/// `follow`.
pub fn find_cycle<N, E, F>(graph: &DiGraph<N, E>, follow: F) -> Option<Vec<NodeIndex>>
where
    F: Fn(&E) -> bool,
{
    find_cycle_by(graph.node_indices(), |&node| {
        graph
            .edges(node)
            .filter(|edge| follow(edge.weight()))
            .map(|edge| edge.target())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn adjacency(edges: &[(&'static str, &'static str)]) -> BTreeMap<&'static str, Vec<&'static str>> {
        let mut map: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for &(from, to) in edges {
            map.entry(from).or_default().push(to);
            map.entry(to).or_default();
        }
        map
    }

    #[test]
    fn reports_closed_cycle_path() {
        let adj = adjacency(&[("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")]);
        let cycle = find_cycle_by(adj.keys().copied(), |n| adj[n].clone()).expect("cycle");
        assert_eq!(cycle, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let adj = adjacency(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        assert_eq!(find_cycle_by(adj.keys().copied(), |n| adj[n].clone()), None);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let adj = adjacency(&[("a", "a")]);
        let cycle = find_cycle_by(adj.keys().copied(), |n| adj[n].clone()).expect("cycle");
        assert_eq!(cycle, vec!["a", "a"]);
    }

    #[test]
    fn long_chain_does_not_overflow() {
        let n = 50_000usize;
        let cycle = find_cycle_by(0..n, |&i| if i + 1 < n { vec![i + 1] } else { vec![] });
        assert_eq!(cycle, None);

        let cycle = find_cycle_by(0..n, |&i| vec![(i + 1) % n]).expect("ring");
        assert_eq!(cycle.len(), n + 1);
        assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn petgraph_filter_skips_ignored_edges() {
        let mut graph: DiGraph<&str, bool> = DiGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        graph.add_edge(a, b, true);
        graph.add_edge(b, a, false);
        assert!(find_cycle(&graph, |_| true).is_some());
        assert!(find_cycle(&graph, |follow| *follow).is_none());
    }

    proptest! {
        #[test]
        fn forward_only_edges_never_cycle(edges in proptest::collection::vec((0usize..30, 0usize..30), 0..120)) {
            // Edges always point from a lower to a higher index: a DAG by construction.
            let mut adj: BTreeMap<usize, Vec<usize>> = (0..30).map(|i| (i, Vec::new())).collect();
            for (a, b) in edges {
                if a < b {
                    adj.entry(a).or_default().push(b);
                }
            }
            prop_assert_eq!(find_cycle_by(adj.keys().copied(), |n| adj[n].clone()), None);
        }

        #[test]
        fn back_edge_is_always_found(len in 2usize..40) {
            let cycle = find_cycle_by(0..len, |&i| vec![(i + 1) % len]).expect("cycle");
            prop_assert_eq!(cycle.len(), len + 1);
        }
    }
}
