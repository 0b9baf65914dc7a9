use cadence_planner::rollback::{analyze, require};
use cadence_planner::ReplacementTarget;
use cadence_protocol::{PlanState, PlanTransition, RollbackStrategy};
use proptest::prelude::*;

fn target_strategy() -> impl Strategy<Value = ReplacementTarget> {
    (
        prop_oneof![
            Just(PlanState::Proposed),
            Just(PlanState::Previewing),
            Just(PlanState::Applied),
            Just(PlanState::Committed),
        ],
        proptest::option::of("[a-z]{1,6}"),
        proptest::option::of("[a-z]{1,6}"),
        any::<bool>(),
        proptest::collection::vec("plan-[0-9]{1,3}", 0..3),
    )
        .prop_map(|(state, undo, snapshot, preview_applied, dependents)| ReplacementTarget {
            plan_id: "plan-0".to_string(),
            state,
            undo_identity: undo,
            snapshot,
            preview_applied,
            dependents,
            description: None,
        })
}

proptest! {
    #[test]
    fn proposed_never_needs_rollback(target in target_strategy()) {
        let target = ReplacementTarget { state: PlanState::Proposed, ..target };
        let requirement = analyze(&target);
        prop_assert!(!requirement.needs_rollback);
        prop_assert_eq!(requirement.transition, PlanTransition::Discarded);
        prop_assert!(require(&target).is_ok());
    }

    #[test]
    fn committed_is_never_rollbackable(target in target_strategy()) {
        let target = ReplacementTarget { state: PlanState::Committed, ..target };
        let requirement = analyze(&target);
        prop_assert!(!requirement.rollback_possible);
        prop_assert_eq!(requirement.transition, PlanTransition::Blocked);
        prop_assert!(require(&target).is_err());
    }

    #[test]
    fn exact_only_with_undo_identity(target in target_strategy()) {
        let requirement = analyze(&target);
        if requirement.needs_rollback && requirement.exact {
            let is_inverse_patch = matches!(
                requirement.strategy,
                RollbackStrategy::InversePatch { .. }
            );
            prop_assert!(is_inverse_patch);
            prop_assert!(target.undo_identity.is_some());
        }
        prop_assert_eq!(&requirement.cascade, &target.dependents);
        prop_assert_eq!(require(&target).is_err(), requirement.needs_rollback && !requirement.rollback_possible);
    }
}
