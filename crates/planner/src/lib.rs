//! # Cadence Planner
//!
//! Compiles one utterance's segments and discourse links into a validated
//! [`cadence_protocol::ExecutionPlan`].
//!
//! ## Architecture
//!
//! ```text
//! CompileRequest
//!     │
//!     ├──> RelationGraphBuilder      (cycles, root, discourse type)
//!     ├──> RelationMapper            (cue readings -> CompositionOperator)
//!     ├──> steps                     (action / validation / condition)
//!     ├──> ordering
//!     │      ├─ one operator kind  -> PlanComposer
//!     │      └─ mixed or explicit  -> SequencingEngine (Kahn + groups)
//!     ├──> FocusResolver             (scope + implicit preserve constraints)
//!     ├──> PresuppositionResolver    (particles -> step effects, via HistoryStore)
//!     ├──> rollback::analyze         (replaced plans -> RollbackRequirement)
//!     └──> ConflictDetector / ConstraintVerifier
//!
//! CompileOutcome { plan, conflicts, report, warnings, ... }
//! ```
//!
//! Relation semantics, cue words, focus and particle vocabularies live in
//! [`DiscourseConfig`]; the builtin table ships in `config/discourse.json`
//! and can be overlaid from JSON or TOML.

mod compiler;
mod composer;
mod config;
mod error;
mod focus;
mod mapper;
mod presupposition;
pub mod rollback;
mod sequencing;

pub use compiler::{CompileOutcome, CompileRequest, PlanCompiler};
pub use composer::{Composition, PlanComposer};
pub use config::{normalize_cue, ArgumentRule, CueReading, DiscourseConfig, FocusDefaults, RelationProfile};
pub use error::{PlannerError, Result, RollbackError, StructuralError};
pub use focus::{is_implicit_id, FocusDirective, FocusResolution, FocusResolver, IMPLICIT_ID_PREFIX};
pub use mapper::{Mapping, RelationMapper};
pub use presupposition::{lookup_kind, ParticleMark, PresuppositionResolver};
pub use rollback::ReplacementTarget;
pub use sequencing::{
    OrderingEdge, Schedule, SequencingConstraint, SequencingEngine, SequencingKind, Simultaneity,
};
