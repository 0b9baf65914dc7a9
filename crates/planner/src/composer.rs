use cadence_protocol::{
    CompositionOperator, CompositionType, ExecutionOrder, PlanStep, ValidationGate,
};

use crate::error::StructuralError;

/// Order, preview flag and validation gates produced by one operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub order: ExecutionOrder,
    pub preview_each: bool,
    pub gates: Vec<ValidationGate>,
}

/// Turns one composition operator over ordered constituents into an
/// execution order. `constituents` are step indices; operator indices point
/// into `constituents`.
pub struct PlanComposer;

impl PlanComposer {
    pub fn compose(
        operator: &CompositionOperator,
        constituents: &[usize],
        steps: &[PlanStep],
    ) -> Result<Composition, StructuralError> {
        let kind = operator.composition_type();
        if constituents.is_empty() {
            return Err(StructuralError::TooFewConstituents {
                composition: kind,
                needed: 1,
                got: 0,
            });
        }
        for &step in constituents {
            if step >= steps.len() {
                return Err(StructuralError::InvalidIndex {
                    composition: kind,
                    index: step,
                    len: steps.len(),
                });
            }
        }
        for index in operator.referenced_indices() {
            if index >= constituents.len() {
                return Err(StructuralError::InvalidIndex {
                    composition: kind,
                    index,
                    len: constituents.len(),
                });
            }
        }

        let composition = match operator {
            CompositionOperator::Sequential { .. } => Composition {
                order: ExecutionOrder::Sequential {
                    order: constituents.to_vec(),
                },
                preview_each: true,
                gates: Vec::new(),
            },
            CompositionOperator::Parallel | CompositionOperator::Concurrent { .. } => Composition {
                order: ExecutionOrder::Parallel {
                    groups: vec![constituents.to_vec()],
                },
                preview_each: false,
                gates: Vec::new(),
            },
            CompositionOperator::Alternative {
                user_choice,
                preference_order,
            } => Composition {
                order: ExecutionOrder::Choice {
                    options: constituents.to_vec(),
                    preference: preference_order
                        .as_ref()
                        .map(|order| order.iter().map(|&i| constituents[i]).collect()),
                    user_choice: *user_choice,
                },
                preview_each: true,
                gates: Vec::new(),
            },
            CompositionOperator::Conditional {
                condition_index,
                action_index,
            } => {
                if condition_index == action_index {
                    return Err(StructuralError::TooFewConstituents {
                        composition: CompositionType::Conditional,
                        needed: 2,
                        got: 1,
                    });
                }
                Composition {
                    order: ExecutionOrder::Conditional {
                        condition: constituents[*condition_index],
                        action: constituents[*action_index],
                    },
                    preview_each: true,
                    gates: Vec::new(),
                }
            }
            CompositionOperator::Contrastive {
                goal_index,
                constraint_indices,
                hard_constraint,
            } => {
                if constraint_indices.is_empty() {
                    return Err(StructuralError::TooFewConstituents {
                        composition: CompositionType::Contrastive,
                        needed: 2,
                        got: 1,
                    });
                }
                let goal = constituents[*goal_index];
                let mut order = vec![goal];
                let mut gates = Vec::with_capacity(constraint_indices.len());
                for &ci in constraint_indices {
                    let constraint_step = constituents[ci];
                    order.push(constraint_step);
                    gates.push(ValidationGate {
                        step: goal,
                        constraint_step,
                        constraint_id: Some(steps[constraint_step].segment.clone()),
                        hard: *hard_constraint,
                    });
                }
                Composition {
                    order: ExecutionOrder::Sequential { order },
                    preview_each: false,
                    gates,
                }
            }
        };

        debug_assert_eq!(composition.preview_each, kind.previews_each_step());
        Ok(composition)
    }
}
