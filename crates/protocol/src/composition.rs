use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The six execution semantics a discourse relation can imply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CompositionType {
    Parallel,
    Sequential,
    Contrastive,
    Alternative,
    Conditional,
    Concurrent,
}

impl CompositionType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Sequential => "sequential",
            Self::Contrastive => "contrastive",
            Self::Alternative => "alternative",
            Self::Conditional => "conditional",
            Self::Concurrent => "concurrent",
        }
    }

    /// Whether an executor should surface each step for confirmation.
    pub const fn previews_each_step(self) -> bool {
        match self {
            Self::Sequential | Self::Alternative | Self::Conditional => true,
            Self::Parallel | Self::Concurrent | Self::Contrastive => false,
        }
    }
}

impl std::fmt::Display for CompositionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composition operator with its operator-specific arguments.
///
/// Indices refer to positions in the ordered constituent list handed to the
/// composer alongside the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompositionOperator {
    Parallel,
    Sequential {
        /// "then" (strict) versus looser narrative ordering.
        #[serde(default)]
        strict: bool,
    },
    Contrastive {
        goal_index: usize,
        constraint_indices: Vec<usize>,
        hard_constraint: bool,
    },
    Alternative {
        user_choice: bool,
        #[serde(default)]
        preference_order: Option<Vec<usize>>,
    },
    Conditional {
        condition_index: usize,
        action_index: usize,
    },
    Concurrent {
        /// "simultaneously": steps must start together, not merely overlap.
        #[serde(default)]
        synchronized: bool,
    },
}

impl CompositionOperator {
    pub fn composition_type(&self) -> CompositionType {
        match self {
            Self::Parallel => CompositionType::Parallel,
            Self::Sequential { .. } => CompositionType::Sequential,
            Self::Contrastive { .. } => CompositionType::Contrastive,
            Self::Alternative { .. } => CompositionType::Alternative,
            Self::Conditional { .. } => CompositionType::Conditional,
            Self::Concurrent { .. } => CompositionType::Concurrent,
        }
    }

    /// Every constituent index the operator names explicitly.
    pub fn referenced_indices(&self) -> Vec<usize> {
        match self {
            Self::Parallel | Self::Sequential { .. } | Self::Concurrent { .. } => Vec::new(),
            Self::Contrastive {
                goal_index,
                constraint_indices,
                ..
            } => std::iter::once(*goal_index)
                .chain(constraint_indices.iter().copied())
                .collect(),
            Self::Alternative {
                preference_order, ..
            } => preference_order.clone().unwrap_or_default(),
            Self::Conditional {
                condition_index,
                action_index,
            } => vec![*condition_index, *action_index],
        }
    }
}
