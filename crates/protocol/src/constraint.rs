use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::segment::EntityRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Hard,
    Soft,
}

impl Severity {
    pub const fn is_hard(self) -> bool {
        matches!(self, Self::Hard)
    }
}

/// How much of a preserved entity may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PreserveMode {
    /// No change of any kind.
    #[default]
    Exact,
    /// Sound may change, but the entity must not be removed or moved.
    Functional,
    /// Anything short of removal.
    Recognizable,
}

impl PreserveMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Functional => "functional",
            Self::Recognizable => "recognizable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl Comparison {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ge => ">=",
            Self::Gt => ">",
        }
    }

    /// `left (op) right` where `margin` widens equality and tightens strict
    /// orderings ("at least 3 dB louder" is `Ge` with margin 3).
    pub fn holds(self, left: f64, right: f64, margin: f64) -> bool {
        let margin = margin.abs();
        match self {
            Self::Lt => left + margin < right,
            Self::Le => left + margin <= right,
            Self::Eq => (left - right).abs() <= margin,
            Self::Ge => left >= right + margin,
            Self::Gt => left > right + margin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StructuralMetric {
    /// Net number of child elements (added minus removed).
    Count,
    /// Number of reorderings (moves).
    Order,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StructuralComparison {
    Unchanged,
    AtMost(i64),
    AtLeast(i64),
}

impl StructuralComparison {
    pub fn holds(self, value: i64) -> bool {
        match self {
            Self::Unchanged => value == 0,
            Self::AtMost(limit) => value <= limit,
            Self::AtLeast(limit) => value >= limit,
        }
    }

    pub fn describe(self) -> String {
        match self {
            Self::Unchanged => "unchanged".to_string(),
            Self::AtMost(limit) => format!("at most {limit}"),
            Self::AtLeast(limit) => format!("at least {limit}"),
        }
    }
}

/// Where a constraint came from: said outright, or implied by a focus
/// operator ("only the drums" preserves everything else).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintOrigin {
    #[default]
    Explicit,
    Focus {
        directive: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintKind {
    Preserve {
        #[serde(default)]
        mode: PreserveMode,
    },
    Range {
        property: String,
        min: f64,
        max: f64,
    },
    /// Compares `property` of the constraint target (left) with `right`.
    Relation {
        right: EntityRef,
        property: String,
        relation: Comparison,
        #[serde(default)]
        margin: f64,
    },
    Structural {
        metric: StructuralMetric,
        comparison: StructuralComparison,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Constraint {
    pub id: String,
    pub target: EntityRef,
    pub severity: Severity,
    #[serde(default)]
    pub origin: ConstraintOrigin,
    pub kind: ConstraintKind,
}

impl Constraint {
    pub fn preserve(
        id: impl Into<String>,
        target: EntityRef,
        mode: PreserveMode,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            target,
            severity,
            origin: ConstraintOrigin::Explicit,
            kind: ConstraintKind::Preserve { mode },
        }
    }

    pub fn range(
        id: impl Into<String>,
        target: EntityRef,
        property: impl Into<String>,
        min: f64,
        max: f64,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            target,
            severity,
            origin: ConstraintOrigin::Explicit,
            kind: ConstraintKind::Range {
                property: property.into(),
                min,
                max,
            },
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: ConstraintOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn is_implicit(&self) -> bool {
        !matches!(self.origin, ConstraintOrigin::Explicit)
    }

    pub fn preserve_mode(&self) -> Option<PreserveMode> {
        match self.kind {
            ConstraintKind::Preserve { mode } => Some(mode),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        let target = &self.target.text;
        match &self.kind {
            ConstraintKind::Preserve { mode } => {
                format!("keep {target} intact ({})", mode.as_str())
            }
            ConstraintKind::Range { property, min, max } => {
                format!("keep {property} of {target} within [{min}, {max}]")
            }
            ConstraintKind::Relation {
                right,
                property,
                relation,
                margin,
            } => {
                if *margin == 0.0 {
                    format!("{property}: {target} {} {}", relation.symbol(), right.text)
                } else {
                    format!(
                        "{property}: {target} {} {} (margin {margin})",
                        relation.symbol(),
                        right.text
                    )
                }
            }
            ConstraintKind::Structural { metric, comparison } => {
                let metric = match metric {
                    StructuralMetric::Count => "element count",
                    StructuralMetric::Order => "ordering",
                };
                format!("{metric} of {target} {}", comparison.describe())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_margin_semantics() {
        assert!(Comparison::Ge.holds(6.0, 3.0, 3.0));
        assert!(!Comparison::Gt.holds(6.0, 3.0, 3.0));
        assert!(Comparison::Eq.holds(1.0, 1.4, 0.5));
        assert!(!Comparison::Eq.holds(1.0, 1.6, 0.5));
        assert!(Comparison::Lt.holds(1.0, 2.0, 0.0));
    }

    #[test]
    fn structural_comparison_parses_from_json() {
        let raw = r#"{"type":"structural","metric":"count","comparison":{"at_most":2}}"#;
        let kind: ConstraintKind = serde_json::from_str(raw).expect("kind");
        assert_eq!(
            kind,
            ConstraintKind::Structural {
                metric: StructuralMetric::Count,
                comparison: StructuralComparison::AtMost(2),
            }
        );

        let raw = r#"{"type":"structural","metric":"order","comparison":"unchanged"}"#;
        let kind: ConstraintKind = serde_json::from_str(raw).expect("kind");
        assert!(matches!(
            kind,
            ConstraintKind::Structural {
                comparison: StructuralComparison::Unchanged,
                ..
            }
        ));
    }

    #[test]
    fn preserve_mode_defaults_to_exact() {
        let raw = r#"{"id":"c1","target":{"text":"vocals"},"severity":"hard","kind":{"type":"preserve"}}"#;
        let constraint: Constraint = serde_json::from_str(raw).expect("constraint");
        assert_eq!(constraint.preserve_mode(), Some(PreserveMode::Exact));
        assert!(!constraint.is_implicit());
    }
}
