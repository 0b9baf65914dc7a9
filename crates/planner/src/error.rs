use cadence_graph::GraphError;
use cadence_protocol::{CompositionType, PlanState, ProtocolError};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlannerError>;

/// Fatal, per-command errors. A plan is never returned partially built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    #[error("Relation graph error: {0}")]
    Graph(GraphError),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("Constraint error: {0}")]
    Check(#[from] cadence_checker::CheckError),

    #[error("Plan failed validation: {0}")]
    InvalidPlan(#[from] ProtocolError),
}

impl From<GraphError> for PlannerError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Cycle { path } => Self::Structural(StructuralError::CyclicGraph { path }),
            other => Self::Graph(other),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("Relation graph contains a cycle: {}", path.join(" -> "))]
    CyclicGraph { path: Vec<String> },

    #[error("Link {link} ({from} -> {to}): no reading of {cue} fits the segments: {reason}")]
    UnsatisfiedArguments {
        link: usize,
        from: String,
        to: String,
        cue: String,
        reason: String,
    },

    #[error("Conflicting sequencing constraints [{}] over steps [{}]", constraints.join(", "), steps.join(", "))]
    ConflictingSequence {
        constraints: Vec<String>,
        steps: Vec<String>,
    },

    #[error("Unknown step or segment: {0}")]
    UnknownStep(String),

    #[error("{composition} composition references index {index} but only {len} constituents exist")]
    InvalidIndex {
        composition: CompositionType,
        index: usize,
        len: usize,
    },

    #[error("{composition} composition needs at least {needed} constituents, got {got}")]
    TooFewConstituents {
        composition: CompositionType,
        needed: usize,
        got: usize,
    },

    #[error("Unknown focus cue '{0}'")]
    UnknownFocusCue(String),

    #[error("Constraint id '{0}' uses the prefix reserved for focus-implied constraints")]
    ReservedConstraintId(String),

    #[error("Unknown sequencing cue '{0}'")]
    UnknownSequencingCue(String),
}

/// A replacement needs a rollback that cannot be carried out. Fatal to that
/// replacement only.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RollbackError {
    #[error("Plan {plan_id} is committed; rollback is blocked. {instructions}")]
    Blocked {
        plan_id: String,
        instructions: String,
    },

    #[error("Plan {plan_id} ({state}) has no undo identity or snapshot. {instructions}")]
    NoRestorePoint {
        plan_id: String,
        state: String,
        instructions: String,
    },
}

impl RollbackError {
    pub fn plan_id(&self) -> &str {
        match self {
            Self::Blocked { plan_id, .. } | Self::NoRestorePoint { plan_id, .. } => plan_id,
        }
    }

    pub(crate) fn no_restore_point(plan_id: &str, state: PlanState, instructions: String) -> Self {
        Self::NoRestorePoint {
            plan_id: plan_id.to_string(),
            state: state.as_str().to_string(),
            instructions,
        }
    }
}
