use std::collections::{BTreeSet, HashSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ProtocolError, Result};
use crate::segment::{EntityId, SegmentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepRole {
    /// Performs an edit.
    Action,
    /// Post-hoc gate: verifies a constraint against the result of another step.
    Validation,
    /// Evaluates the antecedent of a conditional.
    Condition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlanStep {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
    pub segment: SegmentId,
    pub role: StepRole,
}

impl PlanStep {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        segment: impl Into<SegmentId>,
        role: StepRole,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            depends_on: BTreeSet::new(),
            segment: segment.into(),
            role,
        }
    }

    #[must_use]
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOrderKind {
    Sequential,
    Parallel,
    Choice,
    Conditional,
}

/// How the steps of a plan are scheduled. Indices refer to `ExecutionPlan::steps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionOrder {
    Sequential {
        order: Vec<usize>,
    },
    /// Groups run one after another; steps inside a group may run concurrently.
    Parallel {
        groups: Vec<Vec<usize>>,
    },
    Choice {
        options: Vec<usize>,
        #[serde(default)]
        preference: Option<Vec<usize>>,
        user_choice: bool,
    },
    Conditional {
        condition: usize,
        action: usize,
    },
}

impl ExecutionOrder {
    pub fn kind(&self) -> ExecutionOrderKind {
        match self {
            Self::Sequential { .. } => ExecutionOrderKind::Sequential,
            Self::Parallel { .. } => ExecutionOrderKind::Parallel,
            Self::Choice { .. } => ExecutionOrderKind::Choice,
            Self::Conditional { .. } => ExecutionOrderKind::Conditional,
        }
    }

    /// Every step index the order mentions, in scheduling order.
    pub fn indices(&self) -> Vec<usize> {
        match self {
            Self::Sequential { order } => order.clone(),
            Self::Parallel { groups } => groups.iter().flatten().copied().collect(),
            Self::Choice {
                options,
                preference,
                ..
            } => options
                .iter()
                .chain(preference.iter().flatten())
                .copied()
                .collect(),
            Self::Conditional { condition, action } => vec![*condition, *action],
        }
    }

    /// Position of a step in scheduling order (group index for parallel plans).
    pub fn position_of(&self, step: usize) -> Option<usize> {
        match self {
            Self::Sequential { order } => order.iter().position(|&i| i == step),
            Self::Parallel { groups } => groups.iter().position(|g| g.contains(&step)),
            Self::Choice { options, .. } => options.iter().position(|&i| i == step),
            Self::Conditional { condition, action } => {
                if *condition == step {
                    Some(0)
                } else if *action == step {
                    Some(1)
                } else {
                    None
                }
            }
        }
    }
}

/// The goal step's result must satisfy the constraint step before the plan
/// counts as complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationGate {
    pub step: usize,
    pub constraint_step: usize,
    #[serde(default)]
    pub constraint_id: Option<String>,
    pub hard: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Particle {
    Still,
    Again,
    Already,
    NoLonger,
    Back,
    Even,
    Yet,
}

impl Particle {
    pub const ALL: [Particle; 7] = [
        Self::Still,
        Self::Again,
        Self::Already,
        Self::NoLonger,
        Self::Back,
        Self::Even,
        Self::Yet,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Still => "still",
            Self::Again => "again",
            Self::Already => "already",
            Self::NoLonger => "no_longer",
            Self::Back => "back",
            Self::Even => "even",
            Self::Yet => "yet",
        }
    }
}

/// What a presupposition particle does to the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanEffect {
    RepeatPriorEdit { record_id: String },
    UndoToPriorState { record_id: String },
    VerifyCurrentState,
    SkipIfDone { record_id: String },
    AmplifyExisting { record_id: String },
    NoOp,
}

impl PlanEffect {
    pub const fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StepEffect {
    pub step: String,
    pub particle: Particle,
    pub effect: PlanEffect,
}

/// Alternation options that could not be expressed in the plan's order
/// because the discourse also carried other relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeferredChoice {
    pub chosen: String,
    pub options: Vec<String>,
    pub user_choice: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    Proposed,
    Previewing,
    Applied,
    Committed,
}

impl PlanState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Previewing => "previewing",
            Self::Applied => "applied",
            Self::Committed => "committed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlanTransition {
    Discarded,
    Cancelled,
    Restored,
    RolledBack,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RollbackStrategy {
    InversePatch { undo_identity: String },
    SnapshotRestore { snapshot: String },
    Manual { instructions: String },
    None,
}

impl RollbackStrategy {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InversePatch { .. } => "inverse_patch",
            Self::SnapshotRestore { .. } => "snapshot_restore",
            Self::Manual { .. } => "manual",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RollbackRequirement {
    pub plan_id: String,
    pub replaced_state: PlanState,
    pub needs_rollback: bool,
    pub rollback_possible: bool,
    pub strategy: RollbackStrategy,
    /// The strategy restores exactly the pre-plan state.
    pub exact: bool,
    pub transition: PlanTransition,
    #[serde(default)]
    pub cascade: Vec<String>,
    #[serde(default)]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExecutionPlan {
    pub id: String,
    pub order: ExecutionOrder,
    pub steps: Vec<PlanStep>,
    pub preview_each: bool,
    #[serde(default)]
    pub gates: Vec<ValidationGate>,
    #[serde(default)]
    pub effects: Vec<StepEffect>,
    #[serde(default)]
    pub scope: Option<Vec<EntityId>>,
    #[serde(default)]
    pub rollback: Vec<RollbackRequirement>,
    #[serde(default)]
    pub deferred_choices: Vec<DeferredChoice>,
}

impl ExecutionPlan {
    pub fn new(
        id: impl Into<String>,
        order: ExecutionOrder,
        steps: Vec<PlanStep>,
        preview_each: bool,
    ) -> Self {
        Self {
            id: id.into(),
            order,
            steps,
            preview_each,
            gates: Vec::new(),
            effects: Vec::new(),
            scope: None,
            rollback: Vec::new(),
            deferred_choices: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_gates(self, gates: Vec<ValidationGate>) -> Self {
        Self { gates, ..self }
    }

    #[must_use]
    pub fn with_effects(self, effects: Vec<StepEffect>) -> Self {
        Self { effects, ..self }
    }

    #[must_use]
    pub fn with_scope(self, scope: Option<Vec<EntityId>>) -> Self {
        Self { scope, ..self }
    }

    #[must_use]
    pub fn with_rollback(self, rollback: Vec<RollbackRequirement>) -> Self {
        Self { rollback, ..self }
    }

    #[must_use]
    pub fn with_deferred_choices(self, deferred_choices: Vec<DeferredChoice>) -> Self {
        Self {
            deferred_choices,
            ..self
        }
    }

    pub fn step(&self, id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn step_index(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    /// Every index and dependency id the plan references must resolve.
    pub fn validate(&self) -> Result<()> {
        let len = self.steps.len();
        let mut ids = HashSet::new();
        for step in &self.steps {
            if !ids.insert(step.id.as_str()) {
                return Err(ProtocolError::DuplicateStep(step.id.clone()));
            }
        }
        for step in &self.steps {
            for dep in &step.depends_on {
                if dep == &step.id {
                    return Err(ProtocolError::SelfDependency(step.id.clone()));
                }
                if !ids.contains(dep.as_str()) {
                    return Err(ProtocolError::UnknownDependency {
                        step: step.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let gate_indices = self
            .gates
            .iter()
            .flat_map(|g| [g.step, g.constraint_step]);
        for index in self.order.indices().into_iter().chain(gate_indices) {
            if index >= len {
                return Err(ProtocolError::IndexOutOfRange { index, len });
            }
        }

        for effect in &self.effects {
            if !ids.contains(effect.step.as_str()) {
                return Err(ProtocolError::Other(format!(
                    "Effect references unknown step '{}'",
                    effect.step
                )));
            }
        }
        Ok(())
    }

    /// Structural fingerprint: identical plans hash identically.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        match serde_json::to_vec(self) {
            Ok(bytes) => hasher.update(&bytes),
            Err(_) => hasher.update(format!("{self:?}").as_bytes()),
        }
        format!("{:x}", hasher.finalize())
    }
}
