use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use cadence_checker::TimbralOpposites;
use cadence_protocol::{
    CompositionType, FocusKind, Particle, PreserveMode, RelationType, Segment, SegmentKind,
    Severity, StructuralType, SCHEMA_VERSION,
};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::sequencing::SequencingKind;

const BUILTIN_CONFIG: &str = include_str!("../../../config/discourse.json");

static BUILTIN: OnceCell<DiscourseConfig> = OnceCell::new();
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static EDGE_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\p{L}\p{N}]+|[^\p{L}\p{N}]+$").expect("valid regex"));

/// Which segment kinds a relation may join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentRule {
    Any,
    /// Both ends are goals or commands.
    Actionable,
    /// One goal or command and one constraint, in either order.
    GoalAndConstraint,
    /// At least one end is a goal or command.
    OneActionable,
}

impl ArgumentRule {
    pub fn check(self, source: &Segment, target: &Segment) -> std::result::Result<(), String> {
        let (s, t) = (source.kind(), target.kind());
        let ok = match self {
            Self::Any => true,
            Self::Actionable => s.is_actionable() && t.is_actionable(),
            Self::GoalAndConstraint => {
                (s.is_actionable() && t == SegmentKind::Constraint)
                    || (s == SegmentKind::Constraint && t.is_actionable())
            }
            Self::OneActionable => s.is_actionable() || t.is_actionable(),
        };
        if ok {
            Ok(())
        } else {
            Err(format!("{} needs {}, got {s} and {t}", self.as_str(), self.describe()))
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Actionable => "actionable",
            Self::GoalAndConstraint => "goal_and_constraint",
            Self::OneActionable => "one_actionable",
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            Self::Any => "any two segments",
            Self::Actionable => "two goals or commands",
            Self::GoalAndConstraint => "a goal and a constraint",
            Self::OneActionable => "at least one goal or command",
        }
    }
}

/// Static properties of one relation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelationProfile {
    pub relation: RelationType,
    pub structural: StructuralType,
    pub composition: CompositionType,
    pub arguments: ArgumentRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CueReading {
    pub relation: RelationType,
    pub strength: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FocusDefaults {
    pub severity: Severity,
    pub mode: PreserveMode,
}

impl Default for FocusDefaults {
    fn default() -> Self {
        Self {
            severity: Severity::Hard,
            mode: PreserveMode::Exact,
        }
    }
}

/// Read-only tables driving the planner: relation properties, cue readings,
/// sequencing/focus/particle vocabularies and timbral opposites.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscourseConfig {
    /// Indexed by `RelationType::declaration_index`; complete after validation.
    relations: Vec<RelationProfile>,
    cues: BTreeMap<String, Vec<CueReading>>,
    sequencing: BTreeMap<String, SequencingKind>,
    focus_cues: BTreeMap<String, FocusKind>,
    focus_defaults: FocusDefaults,
    particles: BTreeMap<String, Particle>,
    timbral_opposites: TimbralOpposites,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    schema_version: Option<u32>,
    #[serde(default)]
    relations: BTreeMap<String, RawRelation>,
    #[serde(default)]
    cues: BTreeMap<String, Vec<RawCueReading>>,
    #[serde(default)]
    sequencing: BTreeMap<String, SequencingKind>,
    #[serde(default)]
    focus: Option<RawFocus>,
    #[serde(default)]
    particles: BTreeMap<String, Particle>,
    #[serde(default)]
    timbral_opposites: Vec<[String; 2]>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRelation {
    structural: Option<StructuralType>,
    composition: Option<CompositionType>,
    arguments: Option<ArgumentRule>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCueReading {
    relation: String,
    strength: f32,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFocus {
    #[serde(default)]
    cues: BTreeMap<String, FocusKind>,
    severity: Option<Severity>,
    mode: Option<PreserveMode>,
}

impl DiscourseConfig {
    /// Bundled tables, parsed once per process.
    pub fn builtin() -> &'static Self {
        BUILTIN.get_or_init(|| {
            Self::from_bytes(BUILTIN_CONFIG.as_bytes(), false)
                .expect("bundled discourse config must parse")
        })
    }

    /// Builtin tables, or the builtin tables overlaid with `path`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::builtin().clone()),
        }
    }

    /// Overlay the file at `path` onto the builtin tables.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read discourse config {}", path.display()))?;
        Self::from_bytes(&bytes, true)
            .with_context(|| format!("Invalid discourse config {}", path.display()))
    }

    /// Parse JSON or TOML. With `overlay`, entries are merged over the
    /// builtin tables; otherwise the document must be complete on its own.
    pub fn from_bytes(bytes: &[u8], overlay: bool) -> Result<Self> {
        let raw = parse_raw(bytes)?;
        let raw = if overlay {
            merge_raw(parse_raw(BUILTIN_CONFIG.as_bytes())?, raw)
        } else {
            raw
        };
        Self::from_raw(raw)
    }

    pub fn relation(&self, relation: RelationType) -> &RelationProfile {
        &self.relations[relation.declaration_index()]
    }

    pub fn relations(&self) -> &[RelationProfile] {
        &self.relations
    }

    /// Readings of a cue word, strongest first.
    pub fn cue_readings(&self, cue: &str) -> Option<&[CueReading]> {
        self.cues.get(&normalize_cue(cue)).map(Vec::as_slice)
    }

    pub fn sequencing_kind(&self, cue: &str) -> Option<SequencingKind> {
        self.sequencing.get(&normalize_cue(cue)).copied()
    }

    pub fn focus_kind(&self, cue: &str) -> Option<FocusKind> {
        self.focus_cues.get(&normalize_cue(cue)).copied()
    }

    pub fn focus_defaults(&self) -> FocusDefaults {
        self.focus_defaults
    }

    pub fn particle(&self, word: &str) -> Option<Particle> {
        self.particles.get(&normalize_cue(word)).copied()
    }

    pub fn timbral_opposites(&self) -> &TimbralOpposites {
        &self.timbral_opposites
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        match raw.schema_version {
            Some(version) if version == SCHEMA_VERSION => {}
            Some(version) => {
                return Err(anyhow!(
                    "schema_version {version} is not supported (expected {SCHEMA_VERSION})"
                ))
            }
            None => return Err(anyhow!("schema_version is required")),
        }

        let mut profiles: BTreeMap<RelationType, RelationProfile> = BTreeMap::new();
        for (name, entry) in &raw.relations {
            let relation = RelationType::parse(name)
                .ok_or_else(|| anyhow!("relations.{name}: unknown relation"))?;
            let field = |what: &str| anyhow!("relations.{name}.{what} is missing");
            profiles.insert(
                relation,
                RelationProfile {
                    relation,
                    structural: entry.structural.ok_or_else(|| field("structural"))?,
                    composition: entry.composition.ok_or_else(|| field("composition"))?,
                    arguments: entry.arguments.ok_or_else(|| field("arguments"))?,
                },
            );
        }
        let relations = RelationType::ALL
            .iter()
            .map(|relation| {
                profiles
                    .get(relation)
                    .copied()
                    .ok_or_else(|| anyhow!("relations.{relation} is missing"))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut cues = BTreeMap::new();
        for (cue, readings) in raw.cues {
            let key = normalized_key("cues", &cue)?;
            if readings.is_empty() {
                return Err(anyhow!("cues.{cue} must list at least one relation"));
            }
            let mut typed = readings
                .into_iter()
                .enumerate()
                .map(|(idx, reading)| {
                    let relation = RelationType::parse(&reading.relation).ok_or_else(|| {
                        anyhow!("cues.{cue}[{idx}].relation '{}' is unknown", reading.relation)
                    })?;
                    if !(reading.strength > 0.0 && reading.strength <= 1.0) {
                        return Err(anyhow!(
                            "cues.{cue}[{idx}].strength must be in (0, 1], got {}",
                            reading.strength
                        ));
                    }
                    Ok(CueReading {
                        relation,
                        strength: reading.strength,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            typed.sort_by(|a, b| {
                b.strength
                    .total_cmp(&a.strength)
                    .then(a.relation.cmp(&b.relation))
            });
            cues.insert(key, typed);
        }

        let sequencing = normalize_keys("sequencing", raw.sequencing)?;
        let particles = normalize_keys("particles", raw.particles)?;
        let focus = raw.focus.unwrap_or_default();
        let focus_defaults = FocusDefaults {
            severity: focus.severity.unwrap_or(Severity::Hard),
            mode: focus.mode.unwrap_or_default(),
        };
        let focus_cues = normalize_keys("focus.cues", focus.cues)?;

        let mut timbral_opposites = TimbralOpposites::new();
        for (idx, [a, b]) in raw.timbral_opposites.iter().enumerate() {
            if a.trim().is_empty() || b.trim().is_empty() || a.eq_ignore_ascii_case(b) {
                return Err(anyhow!(
                    "timbral_opposites[{idx}] must name two different descriptors"
                ));
            }
            timbral_opposites.insert(a, b);
        }

        Ok(Self {
            relations,
            cues,
            sequencing,
            focus_cues,
            focus_defaults,
            particles,
            timbral_opposites,
        })
    }
}

/// Lowercase, collapse whitespace, strip leading/trailing punctuation.
pub fn normalize_cue(cue: &str) -> String {
    let lowered = cue.to_lowercase();
    let collapsed = WHITESPACE.replace_all(lowered.trim(), " ");
    EDGE_PUNCTUATION.replace_all(&collapsed, "").into_owned()
}

fn normalized_key(table: &str, key: &str) -> Result<String> {
    let normalized = normalize_cue(key);
    if normalized.is_empty() {
        return Err(anyhow!("{table}: key '{key}' is empty after normalisation"));
    }
    Ok(normalized)
}

fn normalize_keys<V>(table: &str, entries: BTreeMap<String, V>) -> Result<BTreeMap<String, V>> {
    entries
        .into_iter()
        .map(|(key, value)| Ok((normalized_key(table, &key)?, value)))
        .collect()
}

fn parse_raw(bytes: &[u8]) -> Result<RawConfig> {
    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(json_err) => {
            let utf8 = std::str::from_utf8(bytes).map_err(|err| anyhow!("{json_err}; {err}"))?;
            let toml_value: toml::Value = toml::from_str(utf8).map_err(|toml_err| {
                anyhow!("Config is not valid JSON ({json_err}) or TOML ({toml_err})")
            })?;
            serde_json::to_value(toml_value)
                .map_err(|err| anyhow!("Failed to convert TOML config to JSON: {err}"))?
        }
    };
    serde_json::from_value(value).map_err(|err| anyhow!("Config parse error: {err}"))
}

fn merge_raw(mut base: RawConfig, overlay: RawConfig) -> RawConfig {
    for (name, entry) in overlay.relations {
        let slot = base.relations.entry(name).or_default();
        slot.structural = entry.structural.or(slot.structural);
        slot.composition = entry.composition.or(slot.composition);
        slot.arguments = entry.arguments.or(slot.arguments);
    }
    // a cue's readings are replaced wholesale
    base.cues.extend(overlay.cues);
    base.sequencing.extend(overlay.sequencing);
    base.particles.extend(overlay.particles);
    base.timbral_opposites.extend(overlay.timbral_opposites);

    base.focus = match (base.focus.take(), overlay.focus) {
        (Some(mut base_focus), Some(overlay_focus)) => {
            base_focus.cues.extend(overlay_focus.cues);
            base_focus.severity = overlay_focus.severity.or(base_focus.severity);
            base_focus.mode = overlay_focus.mode.or(base_focus.mode);
            Some(base_focus)
        }
        (Some(base_focus), None) => Some(base_focus),
        (None, Some(overlay_focus)) => Some(overlay_focus),
        (None, None) => None,
    };

    RawConfig {
        schema_version: overlay.schema_version.or(base.schema_version),
        ..base
    }
}
