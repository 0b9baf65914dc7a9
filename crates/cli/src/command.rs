use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use cadence_checker::ConstraintVerifier;
use cadence_planner::rollback;
use cadence_planner::{CompileRequest, DiscourseConfig, PlanCompiler, ReplacementTarget};
use cadence_protocol::{AliasResolver, Constraint, EditDiff, InMemoryHistory};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Envelope printed on stdout for every command.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CommandResponse {
    pub fn ok(data: impl Serialize) -> Result<Self> {
        Ok(Self {
            status: ResponseStatus::Ok,
            message: None,
            data: Some(serde_json::to_value(data).context("Failed to serialize response")?),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ResponseStatus::Error
    }
}

/// Read a JSON document from `path`, or from stdin when `path` is `-`.
pub fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .with_context(|| format!("Failed to read {what} from stdin"))?;
        if buffer.trim().is_empty() {
            anyhow::bail!("{what} is empty; pass a file path or pipe JSON via stdin");
        }
        buffer
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read {what} from {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("Invalid {what} JSON"))
}

pub fn compile(
    config: &DiscourseConfig,
    input: &Path,
    history: Option<&Path>,
    aliases: Option<&Path>,
) -> Result<CommandResponse> {
    let request: CompileRequest = read_json(input, "compile request")?;
    let history: InMemoryHistory = match history {
        Some(path) => read_json(path, "history")?,
        None => InMemoryHistory::new(),
    };
    let resolver = load_aliases(aliases)?;

    log::debug!(
        "Compiling {} segments, {} links",
        request.segments.len(),
        request.links.len()
    );
    let outcome = PlanCompiler::new(config).compile(&request, &history, &resolver)?;
    CommandResponse::ok(&outcome)
}

pub fn check(constraints: &Path, diff: &Path, aliases: Option<&Path>) -> Result<CommandResponse> {
    let constraints: Vec<Constraint> = read_json(constraints, "constraints")?;
    let diff: EditDiff = read_json(diff, "diff")?;
    let resolver = load_aliases(aliases)?;

    let verification = ConstraintVerifier::new(&resolver).verify(&constraints, &diff)?;
    log::info!(
        "Verified {} constraints against {} changes: score {:.2}",
        constraints.len(),
        diff.len(),
        verification.report.overall_score
    );
    CommandResponse::ok(&verification)
}

/// Analyze one replacement. An impossible rollback is reported as an error
/// but still carries the analysis.
pub fn rollback(input: &Path) -> Result<CommandResponse> {
    let target: ReplacementTarget = read_json(input, "replacement target")?;
    let requirement = rollback::analyze(&target);
    let warning = rollback::cascade_warning(&requirement).map(|w| w.message());

    match rollback::require(&target) {
        Ok(_) => CommandResponse::ok(json!({
            "requirement": requirement,
            "warning": warning,
        })),
        Err(err) => Ok(CommandResponse {
            status: ResponseStatus::Error,
            message: Some(err.to_string()),
            data: Some(json!({
                "requirement": requirement,
                "error": err,
                "warning": warning,
            })),
        }),
    }
}

pub fn relations(config: &DiscourseConfig) -> Result<CommandResponse> {
    CommandResponse::ok(config.relations())
}

fn load_aliases(path: Option<&Path>) -> Result<AliasResolver> {
    match path {
        Some(path) => read_json(path, "alias table"),
        None => Ok(AliasResolver::new()),
    }
}
