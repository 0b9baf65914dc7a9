use cadence_checker::{ConflictDetector, ConstraintVerifier, TimbralOpposites};
use cadence_protocol::{Constraint, EditDiff, Goal, NoResolver, ViolationSeverity};

#[test]
fn constraints_and_diff_from_json() {
    let constraints: Vec<Constraint> = serde_json::from_str(
        r#"[
            {
                "id": "keep-melody",
                "target": { "text": "melody" },
                "severity": "hard",
                "kind": { "type": "preserve", "mode": "functional" }
            },
            {
                "id": "vocals-on-top",
                "target": { "text": "vocals" },
                "severity": "soft",
                "kind": {
                    "type": "relation",
                    "right": { "text": "drums" },
                    "property": "gain_db",
                    "relation": "ge",
                    "margin": 1.0
                }
            }
        ]"#,
    )
    .expect("constraints");

    let diff: EditDiff = serde_json::from_str(
        r#"{
            "changes": [
                { "entity": "n4", "kind": "removed", "parent": "melody" },
                { "entity": "vocals", "kind": "modified", "property": "gain_db", "before": -4.0, "after": -3.0 },
                { "entity": "drums", "kind": "modified", "property": "gain_db", "before": -6.0, "after": -2.5 }
            ]
        }"#,
    )
    .expect("diff");

    let verification = ConstraintVerifier::new(&NoResolver)
        .verify(&constraints, &diff)
        .expect("verify");
    let report = verification.report;

    assert!(!report.overall_satisfied);
    let severities: Vec<ViolationSeverity> = report.violations().map(|v| v.severity).collect();
    assert_eq!(
        severities,
        vec![ViolationSeverity::Error, ViolationSeverity::Warning]
    );
    assert_eq!(report.result_for("keep-melody").unwrap().violations[0].implicated, vec![0]);
    assert_eq!(report.result_for("vocals-on-top").unwrap().violations[0].implicated, vec![1, 2]);
    assert!(report.overall_score > 0.0 && report.overall_score < 1.0);
}

#[test]
fn brighten_against_functional_melody_has_no_hard_conflict() {
    let goals: Vec<Goal> = serde_json::from_str(
        r#"[{ "id": "g1", "target": { "text": "layer" }, "action": { "type": "timbral", "descriptor": "bright" } }]"#,
    )
    .expect("goals");
    let constraints: Vec<Constraint> = serde_json::from_str(
        r#"[{ "id": "c1", "target": { "text": "melody" }, "severity": "hard", "kind": { "type": "preserve", "mode": "functional" } }]"#,
    )
    .expect("constraints");

    let opposites = TimbralOpposites::from_pairs([("bright", "dark")]);
    let scan = ConflictDetector::new(&opposites, &NoResolver).scan(&goals, &constraints);
    assert_eq!(scan.hard_count(), 0);
}

#[test]
fn violation_without_implicated_changes_scores_zero() {
    let constraints: Vec<Constraint> = serde_json::from_str(
        r#"[{
            "id": "keep-a-clip",
            "target": { "text": "drums" },
            "severity": "hard",
            "kind": { "type": "structural", "metric": "count", "comparison": { "at_least": 1 } }
        }]"#,
    )
    .expect("constraints");
    let diff: EditDiff = serde_json::from_str(
        r#"{
            "changes": [
                { "entity": "pad", "kind": "modified", "property": "gain_db", "before": 0.0, "after": 2.0 },
                { "entity": "bass", "kind": "modified", "property": "gain_db", "before": 0.0, "after": -1.0 }
            ]
        }"#,
    )
    .expect("diff");

    let report = ConstraintVerifier::new(&NoResolver)
        .verify(&constraints, &diff)
        .expect("verify")
        .report;

    let result = report.result_for("keep-a-clip").unwrap();
    assert!(!result.satisfied);
    assert!(result.violations[0].implicated.is_empty());
    assert_eq!(result.score, 0.0);
    assert!(!report.overall_satisfied);
    assert!(report.overall_score < 1.0);
}
