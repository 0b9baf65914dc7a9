use std::fs;
use std::path::Path;

use assert_cmd::Command;
use cadence_planner::{CompileRequest, ReplacementTarget};
use cadence_protocol::{
    AxisDirection, Change, ChangeKind, Constraint, DiscourseLink, EditDiff, EntityRef, Goal,
    PlanState, PreserveMode, RelationType, Segment, SegmentContent, Severity,
};
use predicates::str::contains;
use serde_json::Value;
use tempfile::tempdir;

fn request() -> CompileRequest {
    CompileRequest::new(
        vec![
            Segment::new(
                "s1",
                SegmentContent::Goal(Goal::axis(
                    "g-1",
                    "brightness",
                    AxisDirection::Increase,
                    Some(EntityRef::named("layer")),
                )),
            ),
            Segment::new(
                "s2",
                SegmentContent::Constraint(melody_constraint()),
            ),
        ],
        vec![DiscourseLink::new(RelationType::Contrast, "s1", "s2").with_cue("but")],
    )
}

fn melody_constraint() -> Constraint {
    Constraint::preserve(
        "c-melody",
        EntityRef::named("melody"),
        PreserveMode::Functional,
        Severity::Hard,
    )
}

fn write_json(dir: &Path, name: &str, value: &impl serde::Serialize) -> String {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec(value).expect("serialize")).expect("write");
    path.to_string_lossy().into_owned()
}

fn parse(stdout: &[u8]) -> Value {
    serde_json::from_slice(stdout).expect("stdout is JSON")
}

#[test]
fn compile_file_prints_plan() {
    let dir = tempdir().expect("tempdir");
    let input = write_json(dir.path(), "request.json", &request());

    let output = Command::cargo_bin("cadence")
        .expect("binary")
        .args(["--quiet", "compile", &input])
        .output()
        .expect("run");

    assert!(output.status.success());
    let body = parse(&output.stdout);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["data"]["plan"]["order"]["kind"], "sequential");
    assert_eq!(body["data"]["root"], "s1");
    assert_eq!(body["data"]["plan"]["steps"].as_array().map(Vec::len), Some(2));
}

#[test]
fn compile_reads_stdin() {
    let payload = serde_json::to_string(&request()).expect("serialize");

    Command::cargo_bin("cadence")
        .expect("binary")
        .args(["--quiet", "compile", "-"])
        .write_stdin(payload)
        .assert()
        .success()
        .stdout(contains(r#""status":"ok""#));
}

#[test]
fn invalid_request_is_an_error_envelope() {
    let output = Command::cargo_bin("cadence")
        .expect("binary")
        .args(["--quiet", "compile", "-"])
        .write_stdin("{ not json")
        .output()
        .expect("run");

    assert!(!output.status.success());
    let body = parse(&output.stdout);
    assert_eq!(body["status"], "error");
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("Invalid compile request JSON"), "{message}");
}

#[test]
fn check_reports_violated_constraint() {
    let dir = tempdir().expect("tempdir");
    let constraints = write_json(dir.path(), "constraints.json", &vec![melody_constraint()]);
    let diff = write_json(
        dir.path(),
        "diff.json",
        &EditDiff::new(vec![
            Change::modified("layer", "brightness", 0.4, 0.7),
            Change::structural("melody", ChangeKind::Removed),
        ]),
    );

    let output = Command::cargo_bin("cadence")
        .expect("binary")
        .args(["--quiet", "check", "--constraints", &constraints, "--diff", &diff])
        .output()
        .expect("run");

    assert!(output.status.success());
    let body = parse(&output.stdout);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["data"]["report"]["overall_satisfied"], false);
    assert_eq!(
        body["data"]["report"]["results"][0]["constraint_id"],
        "c-melody"
    );
}

#[test]
fn committed_rollback_is_blocked() {
    let dir = tempdir().expect("tempdir");
    let target = ReplacementTarget::new("plan-3", PlanState::Committed)
        .with_dependents(vec!["plan-4".to_string()]);
    let input = write_json(dir.path(), "target.json", &target);

    let output = Command::cargo_bin("cadence")
        .expect("binary")
        .args(["--quiet", "rollback", &input])
        .output()
        .expect("run");

    assert!(!output.status.success());
    let body = parse(&output.stdout);
    assert_eq!(body["status"], "error");
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .contains("plan-3 is committed"));
    assert_eq!(body["data"]["requirement"]["rollback_possible"], false);
    assert_eq!(body["data"]["requirement"]["cascade"][0], "plan-4");
}

#[test]
fn applied_rollback_with_undo_is_exact() {
    let dir = tempdir().expect("tempdir");
    let target = ReplacementTarget::new("plan-7", PlanState::Applied).with_undo("undo-7");
    let input = write_json(dir.path(), "target.json", &target);

    let output = Command::cargo_bin("cadence")
        .expect("binary")
        .args(["--quiet", "rollback", &input])
        .output()
        .expect("run");

    assert!(output.status.success());
    let body = parse(&output.stdout);
    assert_eq!(body["data"]["requirement"]["exact"], true);
    assert_eq!(body["data"]["requirement"]["needs_rollback"], true);
}

#[test]
fn relations_lists_builtin_table() {
    let output = Command::cargo_bin("cadence")
        .expect("binary")
        .args(["--quiet", "relations"])
        .output()
        .expect("run");

    assert!(output.status.success());
    let body = parse(&output.stdout);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(16));
}

#[test]
fn unsupported_config_version_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("discourse.json");
    fs::write(&config, r#"{ "schema_version": 2 }"#).expect("write");

    let output = Command::cargo_bin("cadence")
        .expect("binary")
        .args(["--quiet", "--config"])
        .arg(&config)
        .arg("relations")
        .output()
        .expect("run");

    assert!(!output.status.success());
    let body = parse(&output.stdout);
    assert_eq!(body["status"], "error");
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .contains("schema_version 2 is not supported"));
}
