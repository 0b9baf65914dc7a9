//! # Cadence Protocol
//!
//! Value types shared by every stage of the discourse-to-plan compiler.
//!
//! ```text
//! Segment[] + DiscourseLink[]          (produced upstream by the lexical tagger)
//!     │
//!     ├──> CompositionOperator          (one per link)
//!     ├──> PlanStep[] + ExecutionOrder  (ExecutionPlan)
//!     ├──> RollbackRequirement[]        (replacements)
//!     └──> GoalConflict[] + ConstraintCheckReport
//! ```
//!
//! Everything here is plain data: immutable once produced, serializable, and
//! free of behaviour beyond small helpers. Collaborator contracts
//! ([`HistoryStore`], [`EntityResolver`]) live here too so that both the
//! planner and the checker can call into them.

mod collaborators;
mod composition;
mod constraint;
mod diff;
mod error;
mod ids;
mod plan;
mod relation;
mod report;
mod segment;
mod warning;

pub use collaborators::{
    AliasResolver, EntityResolver, HistoryLookupKind, HistoryQuery, HistoryRecord, HistoryStore,
    InMemoryHistory, NoHistory, NoResolver,
};
pub use composition::{CompositionOperator, CompositionType};
pub use constraint::{
    Comparison, Constraint, ConstraintKind, ConstraintOrigin, PreserveMode, Severity,
    StructuralComparison, StructuralMetric,
};
pub use diff::{Change, ChangeKind, EditDiff};
pub use error::{ProtocolError, Result};
pub use ids::IdGenerator;
pub use plan::{
    DeferredChoice, ExecutionOrder, ExecutionOrderKind, ExecutionPlan, Particle, PlanEffect,
    PlanState, PlanStep, PlanTransition, RollbackRequirement, RollbackStrategy, StepEffect,
    StepRole, ValidationGate,
};
pub use relation::{DiscourseLink, RelationType, StructuralType};
pub use report::{
    ConflictKind, ConstraintCheckReport, ConstraintCheckResult, ConstraintViolation,
    GoalConflict, ViolationSeverity,
};
pub use segment::{
    Acknowledgment, AxisDirection, Command, EntityId, EntityRef, Evaluation, FocusKind, Goal,
    GoalAction, Polarity, Preference, Question, Scope, Segment, SegmentContent, SegmentId,
    SegmentKind,
};
pub use warning::{Collaborator, CompileWarning};

pub const SCHEMA_VERSION: u32 = 1;
