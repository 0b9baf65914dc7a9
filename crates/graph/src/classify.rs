use std::collections::HashSet;

use cadence_protocol::{DiscourseLink, RelationType, Segment, SegmentKind};
use serde::{Deserialize, Serialize};

/// Coarse shape of an utterance; diagnostics and UI copy only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscourseType {
    /// One goal or command, nothing else
    SimpleCommand,
    /// Several goals/commands joined by one kind of relation
    CompoundCommand,
    /// Goals plus constraints on them
    ConstrainedCommand,
    /// Goals plus preferences or scopes
    QualifiedCommand,
    Question,
    /// Acknowledgments and evaluations without an edit
    DialogueAct,
    /// Conditionals, alternatives, corrections or mixed relations
    ComplexRequest,
}

impl DiscourseType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SimpleCommand => "simple_command",
            Self::CompoundCommand => "compound_command",
            Self::ConstrainedCommand => "constrained_command",
            Self::QualifiedCommand => "qualified_command",
            Self::Question => "question",
            Self::DialogueAct => "dialogue_act",
            Self::ComplexRequest => "complex_request",
        }
    }
}

pub struct DiscourseClassifier;

impl DiscourseClassifier {
    #[must_use]
    pub fn classify(segments: &[Segment], links: &[DiscourseLink]) -> DiscourseType {
        let count = |kinds: &[SegmentKind]| {
            segments
                .iter()
                .filter(|s| kinds.contains(&s.kind()))
                .count()
        };
        let actionable = count(&[SegmentKind::Goal, SegmentKind::Command]);
        let constraints = count(&[SegmentKind::Constraint]);
        let qualifiers = count(&[SegmentKind::Preference, SegmentKind::Scope]);
        let questions = count(&[SegmentKind::Question]);
        let dialogue = count(&[SegmentKind::Acknowledgment, SegmentKind::Evaluation]);

        if actionable == 0 {
            if questions > 0 {
                return DiscourseType::Question;
            }
            if dialogue == segments.len() {
                return DiscourseType::DialogueAct;
            }
            return DiscourseType::ComplexRequest;
        }

        if Self::has_complex_relations(links) {
            return DiscourseType::ComplexRequest;
        }

        if constraints > 0 {
            DiscourseType::ConstrainedCommand
        } else if qualifiers > 0 {
            DiscourseType::QualifiedCommand
        } else if actionable > 1 {
            DiscourseType::CompoundCommand
        } else {
            DiscourseType::SimpleCommand
        }
    }

    fn has_complex_relations(links: &[DiscourseLink]) -> bool {
        let branching = links.iter().any(|l| {
            matches!(
                l.relation,
                RelationType::Condition | RelationType::Alternation | RelationType::Correction
            )
        });
        let distinct: HashSet<RelationType> = links.iter().map(|l| l.relation).collect();
        branching || distinct.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_protocol::{
        Acknowledgment, AxisDirection, Goal, Preference, Question, SegmentContent,
    };

    fn goal(id: &str) -> Segment {
        Segment::new(
            id,
            SegmentContent::Goal(Goal::axis(id, "brightness", AxisDirection::Increase, None)),
        )
    }

    #[test]
    fn single_goal_is_simple() {
        assert_eq!(
            DiscourseClassifier::classify(&[goal("a")], &[]),
            DiscourseType::SimpleCommand
        );
    }

    #[test]
    fn narration_chain_is_compound() {
        let segments = vec![goal("a"), goal("b"), goal("c")];
        let links = vec![
            DiscourseLink::new(RelationType::Narration, "a", "b"),
            DiscourseLink::new(RelationType::Narration, "b", "c"),
        ];
        assert_eq!(
            DiscourseClassifier::classify(&segments, &links),
            DiscourseType::CompoundCommand
        );
    }

    #[test]
    fn mixed_relations_are_complex() {
        let segments = vec![goal("a"), goal("b"), goal("c")];
        let links = vec![
            DiscourseLink::new(RelationType::Narration, "a", "b"),
            DiscourseLink::new(RelationType::Parallel, "b", "c"),
        ];
        assert_eq!(
            DiscourseClassifier::classify(&segments, &links),
            DiscourseType::ComplexRequest
        );
    }

    #[test]
    fn preference_qualifies_command() {
        let segments = vec![
            goal("a"),
            Segment::new(
                "p",
                SegmentContent::Preference(Preference {
                    id: "p1".into(),
                    aspect: "reverb".into(),
                    value: "plate".into(),
                    weight: 1.0,
                }),
            ),
        ];
        assert_eq!(
            DiscourseClassifier::classify(&segments, &[]),
            DiscourseType::QualifiedCommand
        );
    }

    #[test]
    fn non_edit_utterances() {
        let question = Segment::new(
            "q",
            SegmentContent::Question(Question {
                text: "is it too loud?".into(),
            }),
        );
        let ack = Segment::new(
            "k",
            SegmentContent::Acknowledgment(Acknowledgment { text: "ok".into() }),
        );
        assert_eq!(
            DiscourseClassifier::classify(&[question], &[]),
            DiscourseType::Question
        );
        assert_eq!(
            DiscourseClassifier::classify(&[ack], &[]),
            DiscourseType::DialogueAct
        );
    }
}
