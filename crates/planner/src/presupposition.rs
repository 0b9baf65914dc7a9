use cadence_protocol::{
    Collaborator, CompileWarning, GoalAction, HistoryLookupKind, HistoryQuery, HistoryStore,
    Particle, PlanEffect, Segment, SegmentContent, SegmentId, StepEffect,
};
use serde::{Deserialize, Serialize};

use crate::config::DiscourseConfig;

/// A presupposition particle attached to a segment ("brighten it *again*").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleMark {
    pub segment: SegmentId,
    /// Surface word; looked up in the particle table unless `particle` is set.
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub particle: Option<Particle>,
}

impl ParticleMark {
    pub fn new(segment: impl Into<SegmentId>, particle: Particle) -> Self {
        Self {
            segment: segment.into(),
            word: None,
            particle: Some(particle),
        }
    }

    pub fn word(segment: impl Into<SegmentId>, word: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            word: Some(word.into()),
            particle: None,
        }
    }

    pub fn resolve_particle(&self, config: &DiscourseConfig) -> Option<Particle> {
        self.particle
            .or_else(|| self.word.as_deref().and_then(|w| config.particle(w)))
    }
}

/// History lookup a particle needs, if any.
pub fn lookup_kind(particle: Particle) -> Option<HistoryLookupKind> {
    match particle {
        Particle::Again | Particle::Even => Some(HistoryLookupKind::PriorEdit),
        Particle::Back => Some(HistoryLookupKind::PriorState),
        Particle::Already => Some(HistoryLookupKind::CompletedEdit),
        Particle::Still | Particle::NoLonger | Particle::Yet => None,
    }
}

/// Turns particles into step effects, asking history where it must.
pub struct PresuppositionResolver<'a> {
    history: &'a dyn HistoryStore,
}

impl<'a> PresuppositionResolver<'a> {
    pub fn new(history: &'a dyn HistoryStore) -> Self {
        Self { history }
    }

    /// Effect of `particle` on the step compiled from `segment`. At most one
    /// history call; a miss yields `NoOp` and a warning.
    pub fn resolve(
        &self,
        particle: Particle,
        segment: &Segment,
        step: &str,
        warnings: &mut Vec<CompileWarning>,
    ) -> StepEffect {
        let effect = match lookup_kind(particle) {
            None => match particle {
                Particle::Still => PlanEffect::VerifyCurrentState,
                _ => PlanEffect::NoOp,
            },
            Some(kind) => {
                let query = history_query(segment);
                match self.history.find_prior(kind, &query) {
                    Some(record) => {
                        log::debug!(
                            "'{}' on {} matched history record {}",
                            particle.as_str(),
                            segment.id,
                            record.id
                        );
                        let record_id = record.id;
                        match particle {
                            Particle::Again => PlanEffect::RepeatPriorEdit { record_id },
                            Particle::Back => PlanEffect::UndoToPriorState { record_id },
                            Particle::Already => PlanEffect::SkipIfDone { record_id },
                            Particle::Even => PlanEffect::AmplifyExisting { record_id },
                            Particle::Still | Particle::NoLonger | Particle::Yet => PlanEffect::NoOp,
                        }
                    }
                    None => {
                        log::warn!(
                            "No prior {} found for '{}' on {}; treating as no-op",
                            query.action,
                            particle.as_str(),
                            segment.id
                        );
                        warnings.push(CompileWarning::LookupMiss {
                            collaborator: Collaborator::History,
                            reference: format!("{} {}", particle.as_str(), query.action),
                            fallback: "no_op".into(),
                        });
                        PlanEffect::NoOp
                    }
                }
            }
        };

        StepEffect {
            step: step.to_string(),
            particle,
            effect,
        }
    }
}

fn history_query(segment: &Segment) -> HistoryQuery {
    let (action, target, params) = match &segment.content {
        SegmentContent::Goal(goal) => {
            let params = match &goal.action {
                GoalAction::Operation { params, .. } => params.clone(),
                _ => serde_json::Value::Null,
            };
            (goal.action_key(), goal.target.clone(), params)
        }
        // commands share the operation key space with operation goals
        SegmentContent::Command(cmd) => (
            format!("operation:{}", cmd.verb),
            cmd.target.clone(),
            cmd.params.clone(),
        ),
        other => (other.kind().as_str().to_string(), None, serde_json::Value::Null),
    };
    HistoryQuery {
        segment: segment.id.clone(),
        action,
        target,
        params,
    }
}
