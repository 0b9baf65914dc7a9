use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constraint::Constraint;

pub type SegmentId = String;
pub type EntityId = String;

/// Reference to an addressable entity (track, layer, region, instrument...).
///
/// `text` is the phrase the user said; `id` is filled in when the upstream
/// tagger (or an [`crate::EntityResolver`]) already knows the concrete entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct EntityRef {
    pub text: String,
    #[serde(default)]
    pub id: Option<EntityId>,
}

impl EntityRef {
    pub fn named(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            id: None,
        }
    }

    pub fn resolved(text: impl Into<String>, id: impl Into<EntityId>) -> Self {
        Self {
            text: text.into(),
            id: Some(id.into()),
        }
    }

    /// Resolved id when known, otherwise the raw reference text.
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Goal,
    Constraint,
    Preference,
    Scope,
    Question,
    Command,
    Evaluation,
    Acknowledgment,
}

impl SegmentKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Goal => "goal",
            Self::Constraint => "constraint",
            Self::Preference => "preference",
            Self::Scope => "scope",
            Self::Question => "question",
            Self::Command => "command",
            Self::Evaluation => "evaluation",
            Self::Acknowledgment => "acknowledgment",
        }
    }

    /// Kinds that turn into an executable action step.
    pub const fn is_actionable(self) -> bool {
        matches!(self, Self::Goal | Self::Command)
    }
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed unit of discourse meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    pub id: SegmentId,
    pub content: SegmentContent,
    #[serde(default = "default_salience")]
    pub salience: f32,
    #[serde(default)]
    pub is_main_point: bool,
}

fn default_salience() -> f32 {
    0.5
}

impl Segment {
    pub fn new(id: impl Into<SegmentId>, content: SegmentContent) -> Self {
        Self {
            id: id.into(),
            content,
            salience: default_salience(),
            is_main_point: false,
        }
    }

    #[must_use]
    pub fn main_point(mut self) -> Self {
        self.is_main_point = true;
        self
    }

    #[must_use]
    pub fn with_salience(mut self, salience: f32) -> Self {
        self.salience = salience.clamp(0.0, 1.0);
        self
    }

    pub fn kind(&self) -> SegmentKind {
        self.content.kind()
    }

    pub fn as_goal(&self) -> Option<&Goal> {
        match &self.content {
            SegmentContent::Goal(goal) => Some(goal),
            _ => None,
        }
    }

    pub fn as_constraint(&self) -> Option<&Constraint> {
        match &self.content {
            SegmentContent::Constraint(constraint) => Some(constraint),
            _ => None,
        }
    }

    pub fn as_preference(&self) -> Option<&Preference> {
        match &self.content {
            SegmentContent::Preference(pref) => Some(pref),
            _ => None,
        }
    }

    /// Short human-readable summary used for step descriptions.
    pub fn describe(&self) -> String {
        match &self.content {
            SegmentContent::Goal(goal) => goal.describe(),
            SegmentContent::Constraint(constraint) => constraint.describe(),
            SegmentContent::Preference(pref) => {
                format!("prefer {} = {}", pref.aspect, pref.value)
            }
            SegmentContent::Scope(scope) => {
                let names: Vec<&str> = scope.entities.iter().map(|e| e.text.as_str()).collect();
                format!("scope to {}", names.join(", "))
            }
            SegmentContent::Question(q) => format!("answer: {}", q.text),
            SegmentContent::Command(cmd) => match &cmd.target {
                Some(target) => format!("{} {}", cmd.verb, target.text),
                None => cmd.verb.clone(),
            },
            SegmentContent::Evaluation(eval) => {
                let subject = eval
                    .target
                    .as_ref()
                    .map(|t| t.text.as_str())
                    .unwrap_or("the mix");
                match &eval.descriptor {
                    Some(d) => format!("check that {subject} is {d}"),
                    None => format!("evaluate {subject}"),
                }
            }
            SegmentContent::Acknowledgment(ack) => format!("acknowledge: {}", ack.text),
        }
    }
}

/// Kind-specific payload; the tag doubles as the segment kind so the two can
/// never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentContent {
    Goal(Goal),
    Constraint(Constraint),
    Preference(Preference),
    Scope(Scope),
    Question(Question),
    Command(Command),
    Evaluation(Evaluation),
    Acknowledgment(Acknowledgment),
}

impl SegmentContent {
    pub fn kind(&self) -> SegmentKind {
        match self {
            Self::Goal(_) => SegmentKind::Goal,
            Self::Constraint(_) => SegmentKind::Constraint,
            Self::Preference(_) => SegmentKind::Preference,
            Self::Scope(_) => SegmentKind::Scope,
            Self::Question(_) => SegmentKind::Question,
            Self::Command(_) => SegmentKind::Command,
            Self::Evaluation(_) => SegmentKind::Evaluation,
            Self::Acknowledgment(_) => SegmentKind::Acknowledgment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Goal {
    pub id: String,
    #[serde(default)]
    pub target: Option<EntityRef>,
    pub action: GoalAction,
}

impl Goal {
    pub fn axis(
        id: impl Into<String>,
        axis: impl Into<String>,
        direction: AxisDirection,
        target: Option<EntityRef>,
    ) -> Self {
        Self {
            id: id.into(),
            target,
            action: GoalAction::Axis {
                axis: axis.into(),
                direction,
                amount: None,
            },
        }
    }

    pub fn timbral(
        id: impl Into<String>,
        descriptor: impl Into<String>,
        target: Option<EntityRef>,
    ) -> Self {
        Self {
            id: id.into(),
            target,
            action: GoalAction::Timbral {
                descriptor: descriptor.into(),
                intensity: None,
            },
        }
    }

    pub fn operation(
        id: impl Into<String>,
        verb: impl Into<String>,
        target: Option<EntityRef>,
    ) -> Self {
        Self {
            id: id.into(),
            target,
            action: GoalAction::Operation {
                verb: verb.into(),
                params: serde_json::Value::Null,
            },
        }
    }

    /// Stable key describing *what kind* of edit this goal performs; used to
    /// look up prior edits of the same kind in history.
    pub fn action_key(&self) -> String {
        match &self.action {
            GoalAction::Axis { axis, .. } => format!("axis:{axis}"),
            GoalAction::Timbral { descriptor, .. } => format!("timbral:{descriptor}"),
            GoalAction::Operation { verb, .. } => format!("operation:{verb}"),
        }
    }

    pub fn describe(&self) -> String {
        let on = self
            .target
            .as_ref()
            .map(|t| format!(" on {}", t.text))
            .unwrap_or_default();
        match &self.action {
            GoalAction::Axis {
                axis,
                direction,
                amount,
            } => match (direction, amount) {
                (AxisDirection::Set, Some(v)) => format!("set {axis} to {v}{on}"),
                (dir, Some(v)) => format!("{} {axis} by {v}{on}", dir.as_str()),
                (dir, None) => format!("{} {axis}{on}", dir.as_str()),
            },
            GoalAction::Timbral { descriptor, .. } => {
                let subject = self.target.as_ref().map(|t| t.text.as_str()).unwrap_or("it");
                format!("make {subject} more {descriptor}")
            }
            GoalAction::Operation { verb, .. } => format!("{verb}{on}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GoalAction {
    Axis {
        axis: String,
        direction: AxisDirection,
        #[serde(default)]
        amount: Option<f64>,
    },
    Timbral {
        descriptor: String,
        #[serde(default)]
        intensity: Option<f64>,
    },
    Operation {
        verb: String,
        #[serde(default)]
        params: serde_json::Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AxisDirection {
    Increase,
    Decrease,
    Set,
}

impl AxisDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
            Self::Set => "set",
        }
    }

    /// Two directions pull against each other; `Set` never opposes anything.
    pub fn opposes(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Increase, Self::Decrease) | (Self::Decrease, Self::Increase)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Preference {
    pub id: String,
    pub aspect: String,
    pub value: String,
    #[serde(default = "default_weight")]
    pub weight: f32,
}

fn default_weight() -> f32 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FocusKind {
    /// "only X"
    Exclusive,
    /// "just X", "X alone"
    Restrictive,
    /// "everything except X"
    Exceptive,
}

impl FocusKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exclusive => "exclusive",
            Self::Restrictive => "restrictive",
            Self::Exceptive => "exceptive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scope {
    pub entities: Vec<EntityRef>,
    #[serde(default)]
    pub focus: Option<FocusKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Question {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Command {
    pub verb: String,
    #[serde(default)]
    pub target: Option<EntityRef>,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Evaluation {
    #[serde(default)]
    pub target: Option<EntityRef>,
    pub polarity: Polarity,
    #[serde(default)]
    pub descriptor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Acknowledgment {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_kind_follows_content_tag() {
        let raw = r#"{
            "id": "s1",
            "content": {
                "kind": "goal",
                "id": "g1",
                "target": {"text": "pad layer"},
                "action": {"type": "axis", "axis": "brightness", "direction": "increase"}
            },
            "is_main_point": true
        }"#;
        let segment: Segment = serde_json::from_str(raw).expect("segment");
        assert_eq!(segment.kind(), SegmentKind::Goal);
        assert!(segment.is_main_point);
        assert!((segment.salience - 0.5).abs() < f32::EPSILON);
        assert_eq!(segment.describe(), "increase brightness on pad layer");
    }

    #[test]
    fn set_direction_never_opposes() {
        assert!(AxisDirection::Increase.opposes(AxisDirection::Decrease));
        assert!(AxisDirection::Decrease.opposes(AxisDirection::Increase));
        assert!(!AxisDirection::Set.opposes(AxisDirection::Increase));
        assert!(!AxisDirection::Decrease.opposes(AxisDirection::Set));
        assert!(!AxisDirection::Increase.opposes(AxisDirection::Increase));
    }

    #[test]
    fn entity_key_prefers_resolved_id() {
        assert_eq!(EntityRef::named("the melody").key(), "the melody");
        assert_eq!(EntityRef::resolved("the melody", "track-3").key(), "track-3");
    }

    #[test]
    fn timbral_goal_description_reads_naturally() {
        let goal = Goal::timbral("g1", "warm", None);
        assert_eq!(goal.describe(), "make it more warm");
        let goal = Goal::timbral("g2", "dark", Some(EntityRef::named("bass")));
        assert_eq!(goal.describe(), "make bass more dark");
    }
}
