use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::composition::CompositionType;
use crate::segment::SegmentId;

/// Rhetorical relation between two segments.
///
/// Declaration order matters: it is the final tie-break when an ambiguous cue
/// maps to several relations with equal strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Narration,
    Elaboration,
    Explanation,
    Result,
    Background,
    Continuation,
    Parallel,
    Contrast,
    Concession,
    Correction,
    Alternation,
    Condition,
    Purpose,
    Simultaneity,
    QuestionAnswer,
    Acknowledgment,
}

impl RelationType {
    pub const ALL: [RelationType; 16] = [
        Self::Narration,
        Self::Elaboration,
        Self::Explanation,
        Self::Result,
        Self::Background,
        Self::Continuation,
        Self::Parallel,
        Self::Contrast,
        Self::Concession,
        Self::Correction,
        Self::Alternation,
        Self::Condition,
        Self::Purpose,
        Self::Simultaneity,
        Self::QuestionAnswer,
        Self::Acknowledgment,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Narration => "narration",
            Self::Elaboration => "elaboration",
            Self::Explanation => "explanation",
            Self::Result => "result",
            Self::Background => "background",
            Self::Continuation => "continuation",
            Self::Parallel => "parallel",
            Self::Contrast => "contrast",
            Self::Concession => "concession",
            Self::Correction => "correction",
            Self::Alternation => "alternation",
            Self::Condition => "condition",
            Self::Purpose => "purpose",
            Self::Simultaneity => "simultaneity",
            Self::QuestionAnswer => "question_answer",
            Self::Acknowledgment => "acknowledgment",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL.into_iter().find(|rel| rel.as_str() == name)
    }

    /// Position in declaration order.
    pub fn declaration_index(self) -> usize {
        Self::ALL
            .iter()
            .position(|rel| *rel == self)
            .unwrap_or(Self::ALL.len())
    }

    /// Alternation links join sibling options, so they never form a
    /// dependency and are ignored by cycle detection.
    pub const fn is_sibling_option(self) -> bool {
        matches!(self, Self::Alternation)
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StructuralType {
    Coordinating,
    Subordinating,
}

/// Directed relation link produced by the upstream tagger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DiscourseLink {
    pub relation: RelationType,
    pub source: SegmentId,
    pub target: SegmentId,
    /// Cue word or phrase that triggered the relation ("but", "and then").
    #[serde(default)]
    pub cue: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    /// Composition the tagger believes the relation implies, if it had one.
    #[serde(default)]
    pub composition: Option<CompositionType>,
}

fn default_confidence() -> f32 {
    1.0
}

impl DiscourseLink {
    pub fn new(
        relation: RelationType,
        source: impl Into<SegmentId>,
        target: impl Into<SegmentId>,
    ) -> Self {
        Self {
            relation,
            source: source.into(),
            target: target.into(),
            cue: None,
            confidence: default_confidence(),
            composition: None,
        }
    }

    #[must_use]
    pub fn with_cue(mut self, cue: impl Into<String>) -> Self {
        self.cue = Some(cue.into());
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_loose_spelling() {
        assert_eq!(RelationType::parse("Contrast"), Some(RelationType::Contrast));
        assert_eq!(
            RelationType::parse("question-answer"),
            Some(RelationType::QuestionAnswer)
        );
        assert_eq!(RelationType::parse("sarcasm"), None);
    }

    #[test]
    fn declaration_order_is_stable() {
        assert_eq!(RelationType::Narration.declaration_index(), 0);
        assert_eq!(RelationType::Acknowledgment.declaration_index(), 15);
        assert!(RelationType::Contrast < RelationType::Concession);
    }
}
