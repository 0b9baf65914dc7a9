use cadence_protocol::{
    CompileWarning, CompositionOperator, CompositionType, DiscourseLink, RelationType, Segment,
    SegmentKind,
};
use serde::Serialize;

use crate::config::{CueReading, DiscourseConfig};
use crate::error::StructuralError;

/// Two readings closer than this count as equally strong.
const STRENGTH_EPSILON: f32 = 1e-6;

/// Result of mapping one link. Operator indices are positions in
/// `[source, target]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mapping {
    pub link_index: usize,
    pub relation: RelationType,
    pub operator: CompositionOperator,
    pub confidence: f32,
}

impl Mapping {
    pub fn composition(&self) -> CompositionType {
        self.operator.composition_type()
    }
}

/// Picks a relation reading for each link and derives its composition operator.
pub struct RelationMapper<'c> {
    config: &'c DiscourseConfig,
}

impl<'c> RelationMapper<'c> {
    pub fn new(config: &'c DiscourseConfig) -> Self {
        Self { config }
    }

    pub fn map(
        &self,
        link_index: usize,
        link: &DiscourseLink,
        source: &Segment,
        target: &Segment,
        warnings: &mut Vec<CompileWarning>,
    ) -> Result<Mapping, StructuralError> {
        let candidates = self.candidates(link);

        // strength desc, satisfiable first, then declaration order
        let mut ranked: Vec<(CueReading, Result<(), String>)> = candidates
            .into_iter()
            .map(|reading| {
                let verdict = self
                    .config
                    .relation(reading.relation)
                    .arguments
                    .check(source, target);
                (reading, verdict)
            })
            .collect();
        ranked.sort_by(|(a, va), (b, vb)| {
            b.strength
                .total_cmp(&a.strength)
                .then(vb.is_ok().cmp(&va.is_ok()))
                .then(a.relation.cmp(&b.relation))
        });

        let Some(winner_pos) = ranked.iter().position(|(_, verdict)| verdict.is_ok()) else {
            let reason = ranked
                .iter()
                .filter_map(|(reading, verdict)| {
                    verdict
                        .as_ref()
                        .err()
                        .map(|why| format!("{}: {why}", reading.relation))
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(StructuralError::UnsatisfiedArguments {
                link: link_index,
                from: link.source.clone(),
                to: link.target.clone(),
                cue: link
                    .cue
                    .clone()
                    .unwrap_or_else(|| link.relation.as_str().to_string()),
                reason,
            });
        };
        let winner = ranked[winner_pos].0;

        let ties: Vec<RelationType> = ranked
            .iter()
            .enumerate()
            .filter(|(pos, (reading, verdict))| {
                *pos != winner_pos
                    && verdict.is_ok()
                    && (reading.strength - winner.strength).abs() <= STRENGTH_EPSILON
            })
            .map(|(_, (reading, _))| reading.relation)
            .collect();
        if !ties.is_empty() {
            let cue = link.cue.clone().unwrap_or_default();
            log::debug!(
                "Cue '{cue}' is ambiguous: chose {} over {:?}",
                winner.relation,
                ties
            );
            warnings.push(CompileWarning::AmbiguousCue {
                cue,
                chosen: winner.relation,
                alternatives: ties,
            });
        }

        let profile = self.config.relation(winner.relation);
        if let Some(hinted) = link.composition {
            if hinted != profile.composition {
                warnings.push(CompileWarning::CompositionOverride {
                    source: link.source.clone(),
                    target: link.target.clone(),
                    hinted,
                    chosen: profile.composition,
                });
            }
        }

        let operator = build_operator(profile.composition, winner.relation, source, target);
        let confidence = (link.confidence * winner.strength).clamp(0.0, 1.0);
        log::debug!(
            "Link {link_index} {} -> {}: {} => {} (confidence {confidence:.2})",
            link.source,
            link.target,
            winner.relation,
            profile.composition
        );

        Ok(Mapping {
            link_index,
            relation: winner.relation,
            operator,
            confidence,
        })
    }

    /// Configured readings of the link's cue, or the tagged relation alone.
    fn candidates(&self, link: &DiscourseLink) -> Vec<CueReading> {
        let tagged = CueReading {
            relation: link.relation,
            strength: 1.0,
        };
        match link.cue.as_deref() {
            None => vec![tagged],
            Some(cue) => match self.config.cue_readings(cue) {
                Some(readings) => readings.to_vec(),
                None => {
                    log::debug!("Unknown cue '{cue}'; keeping tagged relation {}", link.relation);
                    vec![tagged]
                }
            },
        }
    }
}

fn build_operator(
    composition: CompositionType,
    relation: RelationType,
    source: &Segment,
    target: &Segment,
) -> CompositionOperator {
    match composition {
        CompositionType::Parallel => CompositionOperator::Parallel,
        CompositionType::Sequential => CompositionOperator::Sequential {
            strict: matches!(
                relation,
                RelationType::Narration | RelationType::Result | RelationType::Purpose
            ),
        },
        CompositionType::Concurrent => CompositionOperator::Concurrent {
            synchronized: relation == RelationType::Simultaneity,
        },
        CompositionType::Contrastive => {
            let (goal_index, constraint_index) = if source.kind() == SegmentKind::Constraint {
                (1, 0)
            } else {
                (0, 1)
            };
            let constraint = if goal_index == 0 { target } else { source };
            CompositionOperator::Contrastive {
                goal_index,
                constraint_indices: vec![constraint_index],
                hard_constraint: constraint
                    .as_constraint()
                    .map_or(true, |c| c.severity.is_hard()),
            }
        }
        CompositionType::Alternative => {
            let preference_order = if target.is_main_point && !source.is_main_point {
                Some(vec![1, 0])
            } else if source.is_main_point && !target.is_main_point {
                Some(vec![0, 1])
            } else {
                None
            };
            CompositionOperator::Alternative {
                user_choice: preference_order.is_none(),
                preference_order,
            }
        }
        CompositionType::Conditional => {
            // the action is the actionable end, the target when both are
            let (condition_index, action_index) =
                if target.kind().is_actionable() || !source.kind().is_actionable() {
                    (0, 1)
                } else {
                    (1, 0)
                };
            CompositionOperator::Conditional {
                condition_index,
                action_index,
            }
        }
    }
}
