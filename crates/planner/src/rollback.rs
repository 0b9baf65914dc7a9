use cadence_protocol::{
    CompileWarning, PlanState, PlanTransition, RollbackRequirement, RollbackStrategy,
};
use serde::{Deserialize, Serialize};

use crate::error::RollbackError;

/// A previously compiled plan that a correction ("no, swap the reverb for a
/// delay instead") replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementTarget {
    pub plan_id: String,
    pub state: PlanState,
    /// Token the editor can invert to undo the plan exactly.
    #[serde(default)]
    pub undo_identity: Option<String>,
    /// Snapshot taken before the plan was applied.
    #[serde(default)]
    pub snapshot: Option<String>,
    /// The preview was rendered into the working state, not a scratch copy.
    #[serde(default)]
    pub preview_applied: bool,
    /// Plans compiled on top of this one.
    #[serde(default)]
    pub dependents: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ReplacementTarget {
    pub fn new(plan_id: impl Into<String>, state: PlanState) -> Self {
        Self {
            plan_id: plan_id.into(),
            state,
            undo_identity: None,
            snapshot: None,
            preview_applied: false,
            dependents: Vec::new(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_undo(mut self, undo_identity: impl Into<String>) -> Self {
        self.undo_identity = Some(undo_identity.into());
        self
    }

    #[must_use]
    pub fn with_snapshot(mut self, snapshot: impl Into<String>) -> Self {
        self.snapshot = Some(snapshot.into());
        self
    }

    #[must_use]
    pub fn with_dependents<I, S>(mut self, dependents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependents = dependents.into_iter().map(Into::into).collect();
        self
    }

    /// Human label for the replaced plan, whatever is known about it.
    pub fn describe(&self) -> String {
        match (&self.description, self.state) {
            (Some(text), state) if !text.trim().is_empty() => {
                format!("{} ({}, {})", text.trim(), self.plan_id, state.as_str())
            }
            (_, PlanState::Proposed) => format!("proposed plan {}", self.plan_id),
            (_, PlanState::Previewing) => format!("plan {} under preview", self.plan_id),
            (_, PlanState::Applied) => format!("applied plan {}", self.plan_id),
            (_, PlanState::Committed) => format!("committed plan {}", self.plan_id),
        }
    }
}

/// Decide how replacing `target` unwinds it.
pub fn analyze(target: &ReplacementTarget) -> RollbackRequirement {
    let label = target.describe();
    let base = RollbackRequirement {
        plan_id: target.plan_id.clone(),
        replaced_state: target.state,
        needs_rollback: false,
        rollback_possible: true,
        strategy: RollbackStrategy::None,
        exact: true,
        transition: PlanTransition::Discarded,
        cascade: target.dependents.clone(),
        warning: None,
    };

    let requirement = match target.state {
        PlanState::Proposed => base,
        PlanState::Previewing => RollbackRequirement {
            transition: if target.preview_applied {
                PlanTransition::Restored
            } else {
                PlanTransition::Cancelled
            },
            ..base
        },
        PlanState::Applied => {
            let (strategy, exact, possible, warning) =
                match (&target.undo_identity, &target.snapshot) {
                    (Some(undo), _) => (
                        RollbackStrategy::InversePatch {
                            undo_identity: undo.clone(),
                        },
                        true,
                        true,
                        None,
                    ),
                    (None, Some(snapshot)) => (
                        RollbackStrategy::SnapshotRestore {
                            snapshot: snapshot.clone(),
                        },
                        false,
                        true,
                        Some(format!(
                            "Restoring the snapshot of {label} also discards any edits made since it was taken"
                        )),
                    ),
                    (None, None) => (
                        RollbackStrategy::Manual {
                            instructions: format!(
                                "Undo {label} by hand before applying the replacement"
                            ),
                        },
                        false,
                        false,
                        Some(format!("{label} has no undo identity and no snapshot")),
                    ),
                };
            RollbackRequirement {
                needs_rollback: true,
                rollback_possible: possible,
                strategy,
                exact,
                transition: PlanTransition::RolledBack,
                warning,
                ..base
            }
        }
        PlanState::Committed => RollbackRequirement {
            needs_rollback: true,
            rollback_possible: false,
            strategy: RollbackStrategy::Manual {
                instructions: format!(
                    "{label} is committed; revert it from project history or apply the replacement as a new edit"
                ),
            },
            exact: false,
            transition: PlanTransition::Blocked,
            warning: Some(format!("Rollback of {label} is blocked by policy")),
            ..base
        },
    };

    log::debug!(
        "Replacement of {} ({}): {} via {}",
        requirement.plan_id,
        target.state.as_str(),
        if requirement.needs_rollback { "rollback" } else { "no rollback" },
        requirement.strategy.name()
    );
    requirement
}

/// Like [`analyze`], but a rollback that is needed and impossible is an error.
pub fn require(target: &ReplacementTarget) -> Result<RollbackRequirement, RollbackError> {
    let requirement = analyze(target);
    if !requirement.needs_rollback || requirement.rollback_possible {
        return Ok(requirement);
    }
    let instructions = match &requirement.strategy {
        RollbackStrategy::Manual { instructions } => instructions.clone(),
        other => format!("Roll back {} manually ({})", target.plan_id, other.name()),
    };
    Err(match target.state {
        PlanState::Committed => RollbackError::Blocked {
            plan_id: target.plan_id.clone(),
            instructions,
        },
        state => RollbackError::no_restore_point(&target.plan_id, state, instructions),
    })
}

/// Warning for plans that have to unwind along with the replaced one.
pub fn cascade_warning(requirement: &RollbackRequirement) -> Option<CompileWarning> {
    if requirement.cascade.is_empty() {
        return None;
    }
    Some(CompileWarning::CascadingRollback {
        plan_id: requirement.plan_id.clone(),
        dependents: requirement.cascade.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STATES: [PlanState; 4] = [
        PlanState::Proposed,
        PlanState::Previewing,
        PlanState::Applied,
        PlanState::Committed,
    ];

    #[test]
    fn proposed_needs_no_rollback() {
        let requirement = analyze(&ReplacementTarget::new("plan-1", PlanState::Proposed));
        assert!(!requirement.needs_rollback);
        assert_eq!(requirement.transition, PlanTransition::Discarded);
        assert_eq!(requirement.strategy, RollbackStrategy::None);
    }

    #[test]
    fn previewing_cancels_or_restores() {
        let target = ReplacementTarget::new("plan-1", PlanState::Previewing);
        assert_eq!(analyze(&target).transition, PlanTransition::Cancelled);

        let applied = ReplacementTarget {
            preview_applied: true,
            ..target
        };
        let requirement = analyze(&applied);
        assert_eq!(requirement.transition, PlanTransition::Restored);
        assert!(!requirement.needs_rollback);
    }

    #[test]
    fn applied_prefers_inverse_patch_then_snapshot_then_manual() {
        let base = ReplacementTarget::new("plan-7", PlanState::Applied);

        let exact = analyze(&base.clone().with_undo("undo-42").with_snapshot("snap-1"));
        assert_eq!(
            exact.strategy,
            RollbackStrategy::InversePatch {
                undo_identity: "undo-42".into()
            }
        );
        assert!(exact.exact && exact.rollback_possible && exact.warning.is_none());

        let snapshot = analyze(&base.clone().with_snapshot("snap-1"));
        assert_eq!(snapshot.strategy.name(), "snapshot_restore");
        assert!(!snapshot.exact && snapshot.rollback_possible);
        assert!(snapshot.warning.is_some());

        let manual = analyze(&base);
        assert_eq!(manual.strategy.name(), "manual");
        assert!(!manual.rollback_possible);
        assert_eq!(manual.transition, PlanTransition::RolledBack);
    }

    #[test]
    fn committed_is_blocked() {
        let target = ReplacementTarget::new("plan-2", PlanState::Committed).with_undo("undo-1");
        let requirement = analyze(&target);
        assert!(requirement.needs_rollback && !requirement.rollback_possible);
        assert_eq!(requirement.transition, PlanTransition::Blocked);

        let err = require(&target).unwrap_err();
        assert!(matches!(err, RollbackError::Blocked { .. }));
        assert_eq!(err.plan_id(), "plan-2");
    }

    #[test]
    fn require_reports_missing_restore_point() {
        let err = require(&ReplacementTarget::new("plan-3", PlanState::Applied)).unwrap_err();
        match err {
            RollbackError::NoRestorePoint { state, instructions, .. } => {
                assert_eq!(state, "applied");
                assert!(instructions.contains("by hand"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(require(&ReplacementTarget::new("plan-3", PlanState::Proposed)).is_ok());
    }

    #[test]
    fn dependents_always_cascade() {
        for state in STATES {
            let target =
                ReplacementTarget::new("plan-1", state).with_dependents(["plan-2", "plan-3"]);
            let requirement = analyze(&target);
            assert_eq!(requirement.cascade, vec!["plan-2", "plan-3"]);
            assert!(cascade_warning(&requirement).is_some());
        }
        let lone = analyze(&ReplacementTarget::new("plan-1", PlanState::Applied).with_undo("u"));
        assert_eq!(cascade_warning(&lone), None);
    }

    #[test]
    fn every_state_has_a_description() {
        for state in STATES {
            let plain = ReplacementTarget::new("plan-9", state);
            assert!(plain.describe().contains("plan-9"));
            let blank = ReplacementTarget {
                description: Some("  ".into()),
                ..plain.clone()
            };
            assert_eq!(blank.describe(), plain.describe());
        }
        let named = ReplacementTarget {
            description: Some("swap reverb for delay".into()),
            ..ReplacementTarget::new("plan-9", PlanState::Applied)
        };
        assert_eq!(named.describe(), "swap reverb for delay (plan-9, applied)");
    }
}
