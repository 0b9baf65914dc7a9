use std::collections::HashSet;

use cadence_protocol::{
    Change, ChangeKind, CompileWarning, Constraint, ConstraintCheckReport, ConstraintCheckResult,
    ConstraintKind, ConstraintViolation, EditDiff, EntityResolver, PreserveMode, Severity,
    StructuralMetric, ViolationSeverity,
};
use serde::Serialize;

use crate::error::{CheckError, Result};
use crate::targets::TargetKeys;

/// Weight of a hard constraint in the overall score.
pub const HARD_WEIGHT: f32 = 1.0;
/// Weight of a soft constraint in the overall score.
pub const SOFT_WEIGHT: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verification {
    pub report: ConstraintCheckReport,
    pub warnings: Vec<CompileWarning>,
}

/// Checks constraints against an [`EditDiff`].
pub struct ConstraintVerifier<'a> {
    resolver: &'a dyn EntityResolver,
}

impl<'a> ConstraintVerifier<'a> {
    pub fn new(resolver: &'a dyn EntityResolver) -> Self {
        Self { resolver }
    }

    pub fn verify(&self, constraints: &[Constraint], diff: &EditDiff) -> Result<Verification> {
        let mut seen = HashSet::new();
        for constraint in constraints {
            if !seen.insert(constraint.id.as_str()) {
                return Err(CheckError::DuplicateConstraint(constraint.id.clone()));
            }
            validate(constraint)?;
        }

        let targets = TargetKeys::new(self.resolver);
        let results: Vec<ConstraintCheckResult> = constraints
            .iter()
            .map(|c| check_one(c, diff, &targets))
            .collect();
        let report = aggregate(constraints, results);

        log::info!(
            "Verified {} constraints against {} changes: score {:.2}, satisfied={}",
            constraints.len(),
            diff.len(),
            report.overall_score,
            report.overall_satisfied
        );

        Ok(Verification {
            report,
            warnings: targets.into_warnings(),
        })
    }

    /// Check a single constraint; unresolved targets fall back to their text.
    pub fn check(&self, constraint: &Constraint, diff: &EditDiff) -> Result<ConstraintCheckResult> {
        validate(constraint)?;
        Ok(check_one(constraint, diff, &TargetKeys::new(self.resolver)))
    }
}

fn validate(constraint: &Constraint) -> Result<()> {
    match &constraint.kind {
        ConstraintKind::Range { min, max, .. } => {
            if min.is_nan() || max.is_nan() {
                return Err(CheckError::Malformed {
                    constraint: constraint.id.clone(),
                    detail: "range bound is NaN".to_string(),
                });
            }
            if min > max {
                return Err(CheckError::InvalidRange {
                    constraint: constraint.id.clone(),
                    min: *min,
                    max: *max,
                });
            }
        }
        ConstraintKind::Relation { margin, .. } if margin.is_nan() || *margin < 0.0 => {
            return Err(CheckError::Malformed {
                constraint: constraint.id.clone(),
                detail: format!("relation margin must be a non-negative number, got {margin}"),
            });
        }
        _ => {}
    }
    Ok(())
}

/// What a single check found before scoring.
enum Finding {
    Clean,
    Violated {
        explanation: String,
        implicated: Vec<usize>,
    },
    Unverifiable(String),
}

fn check_one(constraint: &Constraint, diff: &EditDiff, targets: &TargetKeys<'_>) -> ConstraintCheckResult {
    let target = targets.key(&constraint.target);
    let finding = match &constraint.kind {
        ConstraintKind::Preserve { mode } => check_preserve(&target, *mode, diff),
        ConstraintKind::Range { property, min, max } => {
            check_range(&target, property, *min, *max, diff)
        }
        ConstraintKind::Relation {
            right,
            property,
            relation,
            margin,
        } => {
            let right_key = targets.key(right);
            match (
                known_value(diff, &target, property),
                known_value(diff, &right_key, property),
            ) {
                (Some(left), Some(right_value)) => {
                    if relation.holds(left, right_value, *margin) {
                        Finding::Clean
                    } else {
                        let implicated: Vec<usize> = diff
                            .changes
                            .iter()
                            .enumerate()
                            .filter(|(_, c)| {
                                (c.entity == target || c.entity == right_key)
                                    && c.property.as_deref() == Some(property.as_str())
                            })
                            .map(|(i, _)| i)
                            .collect();
                        Finding::Violated {
                            explanation: format!(
                                "{property}: {} is {left}, {} is {right_value}; expected {} {} {}",
                                constraint.target.text,
                                right.text,
                                constraint.target.text,
                                relation.symbol(),
                                right.text
                            ),
                            implicated,
                        }
                    }
                }
                (None, None) => Finding::Clean,
                _ => Finding::Unverifiable(format!(
                    "no recorded {property} for one side of '{}'",
                    constraint.describe()
                )),
            }
        }
        ConstraintKind::Structural { metric, comparison } => {
            let touching: Vec<(usize, &Change)> = diff.touching(&target).collect();
            let (value, counted): (i64, Vec<usize>) = match metric {
                StructuralMetric::Count => {
                    let mut net = 0i64;
                    let mut counted = Vec::new();
                    for (i, change) in &touching {
                        match change.kind {
                            ChangeKind::Added => net += 1,
                            ChangeKind::Removed => net -= 1,
                            ChangeKind::Modified | ChangeKind::Moved => continue,
                        }
                        counted.push(*i);
                    }
                    (net, counted)
                }
                StructuralMetric::Order => {
                    let counted: Vec<usize> = touching
                        .iter()
                        .filter(|(_, c)| c.kind == ChangeKind::Moved)
                        .map(|(i, _)| *i)
                        .collect();
                    (counted.len() as i64, counted)
                }
            };
            if comparison.holds(value) {
                Finding::Clean
            } else {
                Finding::Violated {
                    explanation: format!(
                        "{} changed by {value}; expected {}",
                        constraint.target.text,
                        comparison.describe()
                    ),
                    implicated: counted,
                }
            }
        }
    };

    into_result(constraint, finding, diff.len())
}

fn check_preserve(target: &str, mode: PreserveMode, diff: &EditDiff) -> Finding {
    let implicated: Vec<usize> = diff
        .touching(target)
        .filter(|(_, change)| exceeds_tolerance(mode, change.kind))
        .map(|(i, _)| i)
        .collect();
    if implicated.is_empty() {
        return Finding::Clean;
    }
    Finding::Violated {
        explanation: format!(
            "{} change(s) to {target} exceed {} preservation",
            implicated.len(),
            mode.as_str()
        ),
        implicated,
    }
}

fn exceeds_tolerance(mode: PreserveMode, kind: ChangeKind) -> bool {
    match mode {
        PreserveMode::Exact => true,
        PreserveMode::Functional => kind.is_structural(),
        PreserveMode::Recognizable => kind == ChangeKind::Removed,
    }
}

fn check_range(target: &str, property: &str, min: f64, max: f64, diff: &EditDiff) -> Finding {
    let mut implicated = Vec::new();
    let mut first: Option<f64> = None;
    for (i, change) in diff.touching(target) {
        if change.property.as_deref() != Some(property) {
            continue;
        }
        if let Some(value) = change.after {
            if value < min || value > max {
                implicated.push(i);
                first.get_or_insert(value);
            }
        }
    }
    match first {
        None => Finding::Clean,
        Some(value) => Finding::Violated {
            explanation: format!(
                "{property} of {target} moved to {value}, outside [{min}, {max}]"
            ),
            implicated,
        },
    }
}

/// Latest value of `property` on `entity`, falling back to the value it had
/// before the first recorded change.
fn known_value(diff: &EditDiff, entity: &str, property: &str) -> Option<f64> {
    diff.latest_value(entity, property).or_else(|| {
        diff.changes
            .iter()
            .filter(|c| c.entity == entity && c.property.as_deref() == Some(property))
            .find_map(|c| c.before)
    })
}

fn into_result(constraint: &Constraint, finding: Finding, total_changes: usize) -> ConstraintCheckResult {
    match finding {
        Finding::Clean => ConstraintCheckResult {
            constraint_id: constraint.id.clone(),
            satisfied: true,
            score: 1.0,
            violations: Vec::new(),
            unverifiable: false,
        },
        Finding::Unverifiable(reason) => {
            log::debug!("Constraint {} unverifiable: {reason}", constraint.id);
            ConstraintCheckResult {
                constraint_id: constraint.id.clone(),
                satisfied: true,
                score: 1.0,
                violations: Vec::new(),
                unverifiable: true,
            }
        }
        Finding::Violated {
            explanation,
            implicated,
        } => {
            let score = if total_changes == 0 || implicated.is_empty() {
                0.0
            } else {
                (1.0 - implicated.len() as f32 / total_changes as f32).clamp(0.0, 1.0)
            };
            ConstraintCheckResult {
                constraint_id: constraint.id.clone(),
                satisfied: false,
                score,
                violations: vec![ConstraintViolation {
                    constraint_id: constraint.id.clone(),
                    severity: ViolationSeverity::from(constraint.severity),
                    explanation,
                    implicated,
                }],
                unverifiable: false,
            }
        }
    }
}

fn aggregate(constraints: &[Constraint], results: Vec<ConstraintCheckResult>) -> ConstraintCheckReport {
    let (weighted, total) = constraints
        .iter()
        .zip(&results)
        .fold((0.0f32, 0.0f32), |(weighted, total), (constraint, result)| {
            let weight = match constraint.severity {
                Severity::Hard => HARD_WEIGHT,
                Severity::Soft => SOFT_WEIGHT,
            };
            (weighted + weight * result.score, total + weight)
        });
    let overall_score = if total > 0.0 { weighted / total } else { 1.0 };
    let overall_satisfied = results
        .iter()
        .flat_map(|r| &r.violations)
        .all(|v| v.severity != ViolationSeverity::Error);

    ConstraintCheckReport {
        results,
        overall_score,
        overall_satisfied,
    }
}
