use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::composition::CompositionType;
use crate::relation::RelationType;
use crate::report::GoalConflict;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    History,
    Resolver,
}

/// Non-fatal finding surfaced alongside a compiled plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompileWarning {
    /// A goal/goal or goal/constraint conflict; the caller decides whether
    /// to continue.
    Conflict { conflict: GoalConflict },
    /// A collaborator lookup returned nothing and resolution fell back.
    LookupMiss {
        collaborator: Collaborator,
        reference: String,
        fallback: String,
    },
    /// A cue matched several relations that were all satisfiable.
    AmbiguousCue {
        cue: String,
        chosen: RelationType,
        alternatives: Vec<RelationType>,
    },
    /// The tagger's composition hint disagreed with the relation table.
    CompositionOverride {
        source: String,
        target: String,
        hinted: CompositionType,
        chosen: CompositionType,
    },
    /// Alternation options moved out of the order into `deferred_choices`.
    DeferredChoice { chosen: String, options: Vec<String> },
    /// Replacing a plan cascades into plans that depend on it.
    CascadingRollback {
        plan_id: String,
        dependents: Vec<String>,
    },
}

impl CompileWarning {
    pub fn message(&self) -> String {
        match self {
            Self::Conflict { conflict } => conflict.explanation.clone(),
            Self::LookupMiss {
                collaborator,
                reference,
                fallback,
            } => {
                let who = match collaborator {
                    Collaborator::History => "history",
                    Collaborator::Resolver => "entity resolver",
                };
                format!("{who} had no answer for '{reference}'; {fallback}")
            }
            Self::AmbiguousCue {
                cue,
                chosen,
                alternatives,
            } => {
                let names: Vec<&str> = alternatives.iter().map(|r| r.as_str()).collect();
                format!(
                    "cue '{cue}' read as {chosen} (also plausible: {})",
                    names.join(", ")
                )
            }
            Self::CompositionOverride {
                source,
                target,
                hinted,
                chosen,
            } => format!("link {source} -> {target}: hinted {hinted}, composed as {chosen}"),
            Self::DeferredChoice { chosen, options } => format!(
                "kept {chosen} in the plan; alternatives {} await a choice",
                options.join(", ")
            ),
            Self::CascadingRollback {
                plan_id,
                dependents,
            } => format!(
                "replacing {plan_id} also affects {}",
                dependents.join(", ")
            ),
        }
    }
}
