use cadence_protocol::{
    CompileWarning, ConflictKind, Constraint, ConstraintKind, EntityResolver, Goal, GoalAction,
    GoalConflict, PreserveMode, Severity,
};
use serde::Serialize;

use crate::targets::TargetKeys;
use crate::vocabulary::TimbralOpposites;

/// Conflicts found in one request plus any resolver downgrades along the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConflictScan {
    pub conflicts: Vec<GoalConflict>,
    pub warnings: Vec<CompileWarning>,
}

impl ConflictScan {
    pub fn hard_count(&self) -> usize {
        self.conflicts
            .iter()
            .filter(|c| c.severity.is_hard())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Pairwise goal/goal and goal/constraint conflict detection.
pub struct ConflictDetector<'a> {
    opposites: &'a TimbralOpposites,
    resolver: &'a dyn EntityResolver,
}

impl<'a> ConflictDetector<'a> {
    pub fn new(opposites: &'a TimbralOpposites, resolver: &'a dyn EntityResolver) -> Self {
        Self {
            opposites,
            resolver,
        }
    }

    /// Goal/goal conflicts followed by goal/constraint conflicts.
    pub fn scan(&self, goals: &[Goal], constraints: &[Constraint]) -> ConflictScan {
        let mut scan = ConflictScan {
            conflicts: self.goal_conflicts(goals),
            warnings: Vec::new(),
        };
        let targets = TargetKeys::new(self.resolver);
        scan.conflicts
            .extend(self.preserved_target_conflicts(goals, constraints, &targets));
        scan.warnings = targets.into_warnings();

        if !scan.is_empty() {
            log::debug!(
                "Conflict scan: {} conflicts ({} hard) across {} goals, {} constraints",
                scan.conflicts.len(),
                scan.hard_count(),
                goals.len(),
                constraints.len()
            );
        }
        scan
    }

    /// One conflict per unordered goal pair at most; order of `goals` only
    /// affects which goal is reported first.
    pub fn goal_conflicts(&self, goals: &[Goal]) -> Vec<GoalConflict> {
        let mut conflicts = Vec::new();
        for (i, first) in goals.iter().enumerate() {
            for second in &goals[i + 1..] {
                if let Some(conflict) = self.pair_conflict(first, second) {
                    conflicts.push(conflict);
                }
            }
        }
        conflicts
    }

    fn pair_conflict(&self, first: &Goal, second: &Goal) -> Option<GoalConflict> {
        match (&first.action, &second.action) {
            (
                GoalAction::Axis {
                    axis: a,
                    direction: da,
                    ..
                },
                GoalAction::Axis {
                    axis: b,
                    direction: db,
                    ..
                },
            ) if a.eq_ignore_ascii_case(b) && da.opposes(*db) => Some(GoalConflict {
                kind: ConflictKind::AxisDirection,
                first: first.id.clone(),
                second: second.id.clone(),
                severity: Severity::Hard,
                explanation: format!(
                    "'{}' and '{}' push {a} in opposite directions ({} vs {})",
                    first.describe(),
                    second.describe(),
                    da.as_str(),
                    db.as_str()
                ),
            }),
            (
                GoalAction::Timbral { descriptor: a, .. },
                GoalAction::Timbral { descriptor: b, .. },
            ) if self.opposites.are_opposites(a, b) => Some(GoalConflict {
                kind: ConflictKind::TimbralOpposite,
                first: first.id.clone(),
                second: second.id.clone(),
                severity: Severity::Hard,
                explanation: format!(
                    "'{}' and '{}' ask for opposite timbres ({a} vs {b})",
                    first.describe(),
                    second.describe()
                ),
            }),
            _ => None,
        }
    }

    fn preserved_target_conflicts(
        &self,
        goals: &[Goal],
        constraints: &[Constraint],
        targets: &TargetKeys<'_>,
    ) -> Vec<GoalConflict> {
        let mut conflicts = Vec::new();
        for goal in goals {
            let Some(goal_target) = goal.target.as_ref() else {
                continue;
            };
            for constraint in constraints {
                let ConstraintKind::Preserve { mode } = constraint.kind else {
                    continue;
                };
                if targets.key(goal_target) != targets.key(&constraint.target) {
                    continue;
                }
                let severity = if constraint.severity.is_hard() && mode == PreserveMode::Exact {
                    Severity::Hard
                } else {
                    Severity::Soft
                };
                conflicts.push(GoalConflict {
                    kind: ConflictKind::PreservedTarget,
                    first: goal.id.clone(),
                    second: constraint.id.clone(),
                    severity,
                    explanation: format!(
                        "'{}' edits {} which must stay {}",
                        goal.describe(),
                        constraint.target.text,
                        mode.as_str()
                    ),
                });
            }
        }
        conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_protocol::{AliasResolver, AxisDirection, EntityRef, NoResolver};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn table() -> TimbralOpposites {
        TimbralOpposites::from_pairs([("bright", "dark"), ("warm", "cold")])
    }

    fn axis(id: &str, axis: &str, direction: AxisDirection) -> Goal {
        Goal::axis(id, axis, direction, None)
    }

    #[test]
    fn opposite_axis_directions_conflict() {
        let opposites = table();
        let detector = ConflictDetector::new(&opposites, &NoResolver);
        let goals = vec![
            axis("g1", "brightness", AxisDirection::Increase),
            axis("g2", "brightness", AxisDirection::Decrease),
        ];
        let conflicts = detector.goal_conflicts(&goals);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::AxisDirection);
        assert_eq!(conflicts[0].severity, Severity::Hard);
        assert_eq!((conflicts[0].first.as_str(), conflicts[0].second.as_str()), ("g1", "g2"));
    }

    #[test]
    fn set_never_conflicts() {
        let opposites = table();
        let detector = ConflictDetector::new(&opposites, &NoResolver);
        let goals = vec![
            axis("g1", "width", AxisDirection::Set),
            axis("g2", "width", AxisDirection::Decrease),
            axis("g3", "height", AxisDirection::Increase),
        ];
        assert!(detector.goal_conflicts(&goals).is_empty());
    }

    #[test]
    fn declared_timbral_opposites_conflict() {
        let opposites = table();
        let detector = ConflictDetector::new(&opposites, &NoResolver);
        let goals = vec![
            Goal::timbral("g1", "bright", None),
            Goal::timbral("g2", "warm", None),
            Goal::timbral("g3", "Dark", None),
        ];
        let conflicts = detector.goal_conflicts(&goals);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::TimbralOpposite);
        assert_eq!(conflicts[0].second, "g3");
    }

    #[test]
    fn functional_preserve_on_other_target_is_clean() {
        let opposites = table();
        let detector = ConflictDetector::new(&opposites, &NoResolver);
        let goals = vec![Goal::timbral("g1", "bright", Some(EntityRef::named("layer")))];
        let constraints = vec![Constraint::preserve(
            "c1",
            EntityRef::named("melody"),
            PreserveMode::Functional,
            Severity::Hard,
        )];
        let scan = detector.scan(&goals, &constraints);
        assert_eq!(scan.hard_count(), 0);
        assert!(scan.conflicts.is_empty());
        // both references miss the null resolver
        assert_eq!(scan.warnings.len(), 2);
    }

    #[test]
    fn preserved_target_severity_follows_mode() {
        let opposites = table();
        let resolver = AliasResolver::new()
            .with_alias("lead", "track-1")
            .with_alias("the synth", "track-1");
        let detector = ConflictDetector::new(&opposites, &resolver);
        let goals = vec![Goal::axis(
            "g1",
            "gain",
            AxisDirection::Increase,
            Some(EntityRef::named("lead")),
        )];
        let exact = Constraint::preserve(
            "c1",
            EntityRef::named("the synth"),
            PreserveMode::Exact,
            Severity::Hard,
        );
        let functional = Constraint::preserve(
            "c2",
            EntityRef::named("synth"),
            PreserveMode::Functional,
            Severity::Hard,
        );
        let scan = detector.scan(&goals, &[exact, functional]);
        assert_eq!(scan.conflicts.len(), 2);
        assert_eq!(scan.conflicts[0].severity, Severity::Hard);
        assert_eq!(scan.conflicts[1].severity, Severity::Soft);
        assert!(scan.warnings.is_empty());
    }

    #[test]
    fn resolver_miss_warns_once_per_reference() {
        let opposites = table();
        let detector = ConflictDetector::new(&opposites, &NoResolver);
        let mut g1 = axis("g1", "gain", AxisDirection::Increase);
        g1.target = Some(EntityRef::named("Bass"));
        let mut g2 = axis("g2", "pan", AxisDirection::Increase);
        g2.target = Some(EntityRef::named("Bass"));
        let keep = Constraint::preserve(
            "c1",
            EntityRef::named("bass"),
            PreserveMode::Recognizable,
            Severity::Soft,
        );
        let scan = detector.scan(&[g1, g2], &[keep]);
        assert_eq!(scan.conflicts.len(), 2);
        assert!(scan.conflicts.iter().all(|c| c.severity == Severity::Soft));
        assert_eq!(scan.warnings.len(), 2);
    }

    proptest! {
        #[test]
        fn axis_conflicts_are_order_independent(
            swap in any::<bool>(),
            filler in 0usize..4,
        ) {
            let opposites = table();
            let detector = ConflictDetector::new(&opposites, &NoResolver);
            let mut goals: Vec<Goal> = (0..filler)
                .map(|i| axis(&format!("f{i}"), &format!("other{i}"), AxisDirection::Increase))
                .collect();
            let up = axis("up", "brightness", AxisDirection::Increase);
            let down = axis("down", "brightness", AxisDirection::Decrease);
            if swap {
                goals.insert(0, down);
                goals.push(up);
            } else {
                goals.insert(0, up);
                goals.push(down);
            }
            let conflicts = detector.goal_conflicts(&goals);
            prop_assert_eq!(conflicts.len(), 1);
            prop_assert_eq!(conflicts[0].kind, ConflictKind::AxisDirection);
        }
    }
}
