//! # Cadence Checker
//!
//! Finds logical conflicts in a request and verifies constraints against what
//! an edit actually changed.
//!
//! ```text
//! Goal[] + Constraint[]
//!     ├──> ConflictDetector
//!     │      ├─ axis_direction    (same axis, opposite directions)
//!     │      ├─ timbral_opposite  (declared opposite descriptors)
//!     │      └─ preserved_target  (goal edits a protected entity)
//!     │
//! Constraint[] + EditDiff
//!     └──> ConstraintVerifier
//!            ├─ preserve / range / relation / structural checks
//!            ├─ per-constraint satisfaction score
//!            └─ weighted ConstraintCheckReport
//! ```
//!
//! Nothing here is fatal to planning: conflicts and violations are reported,
//! and the caller decides whether to proceed.

mod conflicts;
mod error;
mod preferences;
mod targets;
mod verify;
mod vocabulary;

pub use conflicts::{ConflictDetector, ConflictScan};
pub use error::{CheckError, Result};
pub use preferences::{resolve_preferences, PreferenceConflict, PreferenceResolution, PruningPolicy};
pub use verify::{ConstraintVerifier, Verification, HARD_WEIGHT, SOFT_WEIGHT};
pub use vocabulary::TimbralOpposites;
