use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constraint::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Same axis, opposite directions.
    AxisDirection,
    /// Timbral targets declared as each other's opposite.
    TimbralOpposite,
    /// A goal edits something a preserve constraint protects.
    PreservedTarget,
}

impl ConflictKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AxisDirection => "axis_direction",
            Self::TimbralOpposite => "timbral_opposite",
            Self::PreservedTarget => "preserved_target",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GoalConflict {
    pub kind: ConflictKind,
    /// Goal id.
    pub first: String,
    /// Goal or constraint id.
    pub second: String,
    pub severity: Severity,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

impl From<Severity> for ViolationSeverity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Hard => Self::Error,
            Severity::Soft => Self::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConstraintViolation {
    pub constraint_id: String,
    pub severity: ViolationSeverity,
    pub explanation: String,
    /// Indices into the diff's change list.
    #[serde(default)]
    pub implicated: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConstraintCheckResult {
    pub constraint_id: String,
    pub satisfied: bool,
    /// 1.0 when nothing is violated, lower as more changes are implicated.
    pub score: f32,
    #[serde(default)]
    pub violations: Vec<ConstraintViolation>,
    /// The diff held no data to decide either way.
    #[serde(default)]
    pub unverifiable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConstraintCheckReport {
    pub results: Vec<ConstraintCheckResult>,
    pub overall_score: f32,
    /// True iff no error-severity violation exists.
    pub overall_satisfied: bool,
}

impl ConstraintCheckReport {
    pub fn violations(&self) -> impl Iterator<Item = &ConstraintViolation> {
        self.results.iter().flat_map(|r| r.violations.iter())
    }

    pub fn error_count(&self) -> usize {
        self.violations()
            .filter(|v| v.severity == ViolationSeverity::Error)
            .count()
    }

    pub fn result_for(&self, constraint_id: &str) -> Option<&ConstraintCheckResult> {
        self.results.iter().find(|r| r.constraint_id == constraint_id)
    }
}
