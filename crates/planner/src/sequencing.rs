use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use cadence_graph::find_cycle_by;
use cadence_protocol::SegmentId;
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};

use crate::error::StructuralError;

/// How a temporal cue constrains two steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencingKind {
    /// "then": the second step waits for the first.
    Strict,
    /// "before" / "after": ordering without adjacency.
    Loose,
    /// "while" / "simultaneously": no edge, both may share a parallel group.
    Simultaneous,
}

/// Explicit ordering parsed from a temporal cue. `first` runs before
/// `second` whatever the surface word was ("B after A" arrives as A, B).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencingConstraint {
    #[serde(default)]
    pub id: Option<String>,
    pub first: SegmentId,
    pub second: SegmentId,
    pub cue: String,
    /// Overrides the configured reading of `cue`.
    #[serde(default)]
    pub kind: Option<SequencingKind>,
}

impl SequencingConstraint {
    pub fn new(first: impl Into<SegmentId>, second: impl Into<SegmentId>, cue: impl Into<String>) -> Self {
        Self {
            id: None,
            first: first.into(),
            second: second.into(),
            cue: cue.into(),
            kind: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn label(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{} {} {}", self.first, self.cue, self.second))
    }
}

/// `before` must finish before `after` starts. Indices are step indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingEdge {
    pub before: usize,
    pub after: usize,
    /// Constraint or relation that produced the edge.
    pub label: String,
}

/// Two steps that may run together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simultaneity {
    pub a: usize,
    pub b: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Run one after another; members of a group may run concurrently.
    pub groups: Vec<Vec<usize>>,
    /// Direct predecessors of each scheduled step.
    pub dependencies: BTreeMap<usize, BTreeSet<usize>>,
}

impl Schedule {
    pub fn has_parallel_group(&self) -> bool {
        self.groups.iter().any(|g| g.len() > 1)
    }

    pub fn flatten(&self) -> Vec<usize> {
        self.groups.iter().flatten().copied().collect()
    }

    pub fn group_of(&self, step: usize) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(&step))
    }
}

/// Merges relation-implied and explicit ordering into a grouped schedule.
pub struct SequencingEngine<'a> {
    step_ids: &'a [String],
}

impl<'a> SequencingEngine<'a> {
    pub fn new(step_ids: &'a [String]) -> Self {
        Self { step_ids }
    }

    /// Schedule `active` steps (given in utterance order, which is also the
    /// tie-break) under `edges` and `marks`.
    pub fn schedule(
        &self,
        active: &[usize],
        edges: &[OrderingEdge],
        marks: &[Simultaneity],
    ) -> Result<Schedule, StructuralError> {
        let rank: HashMap<usize, usize> = active.iter().enumerate().map(|(r, &s)| (s, r)).collect();

        let mut deps: BTreeMap<usize, BTreeSet<usize>> =
            active.iter().map(|&s| (s, BTreeSet::new())).collect();
        let mut successors: HashMap<usize, Vec<usize>> = HashMap::new();
        for edge in edges {
            for step in [edge.before, edge.after] {
                if !rank.contains_key(&step) {
                    return Err(StructuralError::UnknownStep(self.name(step)));
                }
            }
            if edge.before == edge.after {
                return Err(StructuralError::ConflictingSequence {
                    constraints: vec![edge.label.clone()],
                    steps: vec![self.name(edge.before)],
                });
            }
            if let Some(set) = deps.get_mut(&edge.after) {
                set.insert(edge.before);
            }
            successors.entry(edge.before).or_default().push(edge.after);
        }

        // Phase 1: the explicit and implied edges alone must be acyclic
        if self.topological(active, &rank, &deps).is_none() {
            return Err(self.cycle_error(active, edges, &successors));
        }

        // Phase 2: simultaneity between ordered steps is a contradiction
        for mark in marks {
            for step in [mark.a, mark.b] {
                if !rank.contains_key(&step) {
                    return Err(StructuralError::UnknownStep(self.name(step)));
                }
            }
            for (from, to) in [(mark.a, mark.b), (mark.b, mark.a)] {
                if let Some(path) = path_between(from, to, &successors) {
                    let mut constraints = vec![mark.label.clone()];
                    constraints.extend(self.edge_labels(&path, edges));
                    return Err(StructuralError::ConflictingSequence {
                        constraints,
                        steps: vec![self.name(mark.a), self.name(mark.b)],
                    });
                }
            }
        }

        // Phase 3: simultaneous steps wait for the union of their predecessors
        for class in simultaneity_classes(active, marks) {
            for (i, &a) in class.iter().enumerate() {
                for &b in &class[i + 1..] {
                    if path_between(a, b, &successors).is_some()
                        || path_between(b, a, &successors).is_some()
                    {
                        return Err(StructuralError::ConflictingSequence {
                            constraints: marks
                                .iter()
                                .filter(|m| class.contains(&m.a) || class.contains(&m.b))
                                .map(|m| m.label.clone())
                                .collect(),
                            steps: vec![self.name(a), self.name(b)],
                        });
                    }
                }
            }
            let union: BTreeSet<usize> = class
                .iter()
                .filter_map(|s| deps.get(s))
                .flatten()
                .copied()
                .collect();
            for step in &class {
                deps.insert(*step, union.clone());
            }
        }

        let order = self
            .topological(active, &rank, &deps)
            .ok_or_else(|| StructuralError::ConflictingSequence {
                constraints: marks.iter().map(|m| m.label.clone()).collect(),
                steps: active.iter().map(|&s| self.name(s)).collect(),
            })?;

        // Phase 4: identical predecessor sets share a group
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut group_of_deps: HashMap<&BTreeSet<usize>, usize> = HashMap::new();
        for &step in &order {
            let key = &deps[&step];
            match group_of_deps.get(key) {
                Some(&g) => groups[g].push(step),
                None => {
                    group_of_deps.insert(key, groups.len());
                    groups.push(vec![step]);
                }
            }
        }

        log::debug!(
            "Scheduled {} steps into {} groups ({} edges, {} simultaneity marks)",
            active.len(),
            groups.len(),
            edges.len(),
            marks.len()
        );

        Ok(Schedule {
            groups,
            dependencies: deps,
        })
    }

    /// Kahn's algorithm; ready steps leave in utterance order.
    fn topological(
        &self,
        active: &[usize],
        rank: &HashMap<usize, usize>,
        deps: &BTreeMap<usize, BTreeSet<usize>>,
    ) -> Option<Vec<usize>> {
        let mut remaining: HashMap<usize, usize> =
            deps.iter().map(|(&s, d)| (s, d.len())).collect();
        let mut dependents: HashMap<usize, Vec<usize>> = HashMap::new();
        for (&step, preds) in deps {
            for &pred in preds {
                dependents.entry(pred).or_default().push(step);
            }
        }

        let mut ready: BTreeSet<(usize, usize)> = remaining
            .iter()
            .filter(|(_, &n)| n == 0)
            .map(|(&s, _)| (rank[&s], s))
            .collect();
        let mut order = Vec::with_capacity(active.len());

        while let Some((_, step)) = ready.pop_first() {
            order.push(step);
            for &next in dependents.get(&step).map(Vec::as_slice).unwrap_or_default() {
                if let Some(n) = remaining.get_mut(&next) {
                    *n -= 1;
                    if *n == 0 {
                        ready.insert((rank[&next], next));
                    }
                }
            }
        }

        (order.len() == active.len()).then_some(order)
    }

    fn cycle_error(
        &self,
        active: &[usize],
        edges: &[OrderingEdge],
        successors: &HashMap<usize, Vec<usize>>,
    ) -> StructuralError {
        let cycle = find_cycle_by(active.iter().copied(), |s| {
            successors.get(s).cloned().unwrap_or_default()
        })
        .unwrap_or_default();
        let hops: Vec<(usize, usize)> = cycle.windows(2).map(|w| (w[0], w[1])).collect();
        let steps: Vec<String> = cycle
            .iter()
            .take(cycle.len().saturating_sub(1))
            .map(|&s| self.name(s))
            .collect();
        let constraints = self.edge_labels(&hops, edges);
        log::warn!(
            "Sequencing cycle over [{}] from [{}]",
            steps.join(", "),
            constraints.join(", ")
        );
        StructuralError::ConflictingSequence { constraints, steps }
    }

    fn edge_labels(&self, hops: &[(usize, usize)], edges: &[OrderingEdge]) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for &(before, after) in hops {
            for edge in edges.iter().filter(|e| e.before == before && e.after == after) {
                if !labels.contains(&edge.label) {
                    labels.push(edge.label.clone());
                }
            }
        }
        labels
    }

    fn name(&self, step: usize) -> String {
        self.step_ids
            .get(step)
            .cloned()
            .unwrap_or_else(|| format!("#{step}"))
    }
}

/// Shortest chain of hops from `from` to `to`, if one exists.
fn path_between(
    from: usize,
    to: usize,
    successors: &HashMap<usize, Vec<usize>>,
) -> Option<Vec<(usize, usize)>> {
    let mut parent: HashMap<usize, usize> = HashMap::new();
    let mut queue = VecDeque::from([from]);
    while let Some(node) = queue.pop_front() {
        for &next in successors.get(&node).map(Vec::as_slice).unwrap_or_default() {
            if next == from || parent.contains_key(&next) {
                continue;
            }
            parent.insert(next, node);
            if next == to {
                let mut hops = Vec::new();
                let mut cursor = to;
                while cursor != from {
                    let prev = parent[&cursor];
                    hops.push((prev, cursor));
                    cursor = prev;
                }
                hops.reverse();
                return Some(hops);
            }
            queue.push_back(next);
        }
    }
    None
}

/// Connected components of the simultaneity marks, members in utterance order.
fn simultaneity_classes(active: &[usize], marks: &[Simultaneity]) -> Vec<Vec<usize>> {
    let size = active
        .iter()
        .copied()
        .chain(marks.iter().flat_map(|m| [m.a, m.b]))
        .max()
        .map_or(0, |max| max + 1);
    let mut sets: UnionFind<usize> = UnionFind::new(size);
    for mark in marks {
        sets.union(mark.a, mark.b);
    }

    let mut classes: HashMap<usize, Vec<usize>> = HashMap::new();
    for &step in active {
        classes.entry(sets.find(step)).or_default().push(step);
    }
    let mut classes: Vec<Vec<usize>> = classes
        .into_values()
        .filter(|c| c.len() > 1)
        .map(|mut c| {
            c.sort_unstable();
            c
        })
        .collect();
    classes.sort_by_key(|c| c[0]);
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("step-{i}")).collect()
    }

    fn edge(before: usize, after: usize, label: &str) -> OrderingEdge {
        OrderingEdge {
            before,
            after,
            label: label.to_string(),
        }
    }

    #[test]
    fn chain_is_fully_sequential() {
        let ids = ids(3);
        let schedule = SequencingEngine::new(&ids)
            .schedule(&[0, 1, 2], &[edge(0, 1, "a"), edge(1, 2, "b")], &[])
            .unwrap();
        assert_eq!(schedule.groups, vec![vec![0], vec![1], vec![2]]);
        assert!(!schedule.has_parallel_group());
    }

    #[test]
    fn unconstrained_steps_share_one_group() {
        let ids = ids(3);
        let schedule = SequencingEngine::new(&ids)
            .schedule(&[0, 1, 2], &[], &[])
            .unwrap();
        assert_eq!(schedule.groups, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn explicit_constraint_reorders_against_utterance_order() {
        let ids = ids(3);
        // "do 2 before 0"
        let schedule = SequencingEngine::new(&ids)
            .schedule(&[0, 1, 2], &[edge(2, 0, "c1")], &[])
            .unwrap();
        assert_eq!(schedule.groups, vec![vec![1, 2], vec![0]]);
        assert_eq!(schedule.dependencies[&0], BTreeSet::from([2]));
    }

    #[test]
    fn opposing_constraints_are_reported_by_name() {
        let ids = ids(2);
        let err = SequencingEngine::new(&ids)
            .schedule(
                &[0, 1],
                &[edge(0, 1, "a before b"), edge(1, 0, "b before a")],
                &[],
            )
            .unwrap_err();
        assert_eq!(
            err,
            StructuralError::ConflictingSequence {
                constraints: vec!["a before b".into(), "b before a".into()],
                steps: vec!["step-0".into(), "step-1".into()],
            }
        );
    }

    #[test]
    fn simultaneity_joins_groups() {
        let ids = ids(3);
        // 0 then 1, while 2
        let schedule = SequencingEngine::new(&ids)
            .schedule(
                &[0, 1, 2],
                &[edge(0, 1, "then")],
                &[Simultaneity {
                    a: 1,
                    b: 2,
                    label: "while".into(),
                }],
            )
            .unwrap();
        assert_eq!(schedule.groups, vec![vec![0], vec![1, 2]]);
    }

    #[test]
    fn simultaneity_between_ordered_steps_conflicts() {
        let ids = ids(3);
        let err = SequencingEngine::new(&ids)
            .schedule(
                &[0, 1, 2],
                &[edge(0, 1, "then-1"), edge(1, 2, "then-2")],
                &[Simultaneity {
                    a: 2,
                    b: 0,
                    label: "while".into(),
                }],
            )
            .unwrap_err();
        assert_eq!(
            err,
            StructuralError::ConflictingSequence {
                constraints: vec!["while".into(), "then-1".into(), "then-2".into()],
                steps: vec!["step-2".into(), "step-0".into()],
            }
        );
    }

    #[test]
    fn edges_to_inactive_steps_are_rejected() {
        let ids = ids(3);
        let err = SequencingEngine::new(&ids)
            .schedule(&[0, 1], &[edge(0, 2, "x")], &[])
            .unwrap_err();
        assert_eq!(err, StructuralError::UnknownStep("step-2".into()));
    }

    fn dag() -> impl Strategy<Value = (usize, Vec<usize>, Vec<(usize, usize)>)> {
        (2usize..12).prop_flat_map(|n| {
            let perm = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
            let pairs = proptest::collection::vec((0..n, 0..n), 0..(n * 2));
            (Just(n), perm, pairs)
        })
        .prop_map(|(n, perm, pairs)| {
            // orient every pair along a hidden permutation so the graph is acyclic
            let edges = pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| {
                    let (pa, pb) = (perm[a], perm[b]);
                    if pa < pb {
                        (a, b)
                    } else {
                        (b, a)
                    }
                })
                .collect();
            (n, perm, edges)
        })
    }

    proptest! {
        #[test]
        fn acyclic_input_schedules_every_step_respecting_edges((n, _perm, pairs) in dag()) {
            let ids = ids(n);
            let active: Vec<usize> = (0..n).collect();
            let edges: Vec<OrderingEdge> = pairs
                .iter()
                .enumerate()
                .map(|(i, &(a, b))| edge(a, b, &format!("e{i}")))
                .collect();
            let schedule = SequencingEngine::new(&ids).schedule(&active, &edges, &[]).unwrap();

            let mut seen = schedule.flatten();
            seen.sort_unstable();
            prop_assert_eq!(seen, active);
            for e in &edges {
                prop_assert!(schedule.group_of(e.before) < schedule.group_of(e.after));
            }
        }

        #[test]
        fn back_edge_always_conflicts(n in 2usize..10) {
            let ids = ids(n);
            let active: Vec<usize> = (0..n).collect();
            let mut edges: Vec<OrderingEdge> =
                (0..n - 1).map(|i| edge(i, i + 1, &format!("e{i}"))).collect();
            edges.push(edge(n - 1, 0, "back"));
            let is_conflict = matches!(
                SequencingEngine::new(&ids).schedule(&active, &edges, &[]),
                Err(StructuralError::ConflictingSequence { .. })
            );
            prop_assert!(is_conflict);
        }
    }

    #[test]
    fn simultaneity_marks_merge_transitively() {
        let marks = vec![
            Simultaneity { a: 3, b: 1, label: "while".into() },
            Simultaneity { a: 1, b: 4, label: "meanwhile".into() },
            Simultaneity { a: 0, b: 2, label: "at the same time".into() },
        ];
        assert_eq!(
            simultaneity_classes(&[0, 1, 2, 3, 4, 5], &marks),
            vec![vec![0, 2], vec![1, 3, 4]]
        );
    }
}
