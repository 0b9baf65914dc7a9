use std::collections::{BTreeMap, HashSet};

use cadence_protocol::{
    Collaborator, CompileWarning, Constraint, ConstraintOrigin, EntityId, EntityRef,
    EntityResolver, FocusKind, IdGenerator, PreserveMode, Segment, SegmentContent, Severity,
};
use serde::{Deserialize, Serialize};

use crate::config::DiscourseConfig;
use crate::error::StructuralError;

/// Prefix of the ids given to focus-implied constraints. Explicit
/// constraints may not use it.
pub const IMPLICIT_ID_PREFIX: &str = "focus";

pub fn is_implicit_id(id: &str) -> bool {
    id.strip_prefix(IMPLICIT_ID_PREFIX)
        .is_some_and(|rest| rest.starts_with('-'))
}

/// A focus operator attached to one utterance ("only the drums",
/// "everything except the vocals").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusDirective {
    #[serde(default)]
    pub id: Option<String>,
    /// Surface cue; looked up in the focus table unless `kind` is given.
    pub cue: String,
    #[serde(default)]
    pub kind: Option<FocusKind>,
    pub references: Vec<EntityRef>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub mode: Option<PreserveMode>,
}

impl FocusDirective {
    pub fn new(cue: impl Into<String>, references: Vec<EntityRef>) -> Self {
        Self {
            id: None,
            cue: cue.into(),
            kind: None,
            references,
            severity: None,
            mode: None,
        }
    }

    /// Directive carried by a scope segment with a focus marker.
    pub fn from_segment(segment: &Segment) -> Option<Self> {
        let SegmentContent::Scope(scope) = &segment.content else {
            return None;
        };
        let kind = scope.focus?;
        Some(Self {
            id: Some(segment.id.clone()),
            cue: kind.as_str().to_string(),
            kind: Some(kind),
            references: scope.entities.clone(),
            severity: None,
            mode: None,
        })
    }

    pub fn label(&self) -> String {
        self.id.clone().unwrap_or_else(|| {
            let names: Vec<&str> = self.references.iter().map(|r| r.text.as_str()).collect();
            format!("{} {}", self.cue, names.join(", "))
        })
    }
}

/// Plan scope plus the preservation constraints implied by focus.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FocusResolution {
    pub scope: Vec<EntityId>,
    pub constraints: Vec<Constraint>,
}

pub struct FocusResolver<'a> {
    config: &'a DiscourseConfig,
    resolver: &'a dyn EntityResolver,
    ids: &'a IdGenerator,
}

impl<'a> FocusResolver<'a> {
    pub fn new(
        config: &'a DiscourseConfig,
        resolver: &'a dyn EntityResolver,
        ids: &'a IdGenerator,
    ) -> Self {
        Self {
            config,
            resolver,
            ids,
        }
    }

    /// Narrow the addressable `entities` through every directive in turn.
    ///
    /// Returns `None` when there is nothing to resolve. When `entities` is
    /// empty the universe is whatever the directives themselves name.
    pub fn resolve(
        &self,
        directives: &[FocusDirective],
        entities: &[EntityId],
        warnings: &mut Vec<CompileWarning>,
    ) -> Result<Option<FocusResolution>, StructuralError> {
        if directives.is_empty() {
            return Ok(None);
        }

        let mut kinds = Vec::with_capacity(directives.len());
        for directive in directives {
            let kind = match directive.kind {
                Some(kind) => kind,
                None => self
                    .config
                    .focus_kind(&directive.cue)
                    .ok_or_else(|| StructuralError::UnknownFocusCue(directive.cue.clone()))?,
            };
            kinds.push(kind);
        }

        // Resolve every reference up front; a single miss poisons the scope
        let mut resolved: Vec<Vec<EntityId>> = Vec::with_capacity(directives.len());
        let mut missed: Option<usize> = None;
        for (i, directive) in directives.iter().enumerate() {
            let mut ids = Vec::with_capacity(directive.references.len());
            for reference in &directive.references {
                match self.resolver.resolve(reference) {
                    Some(id) if entities.is_empty() || entities.contains(&id) => ids.push(id),
                    _ => {
                        log::warn!(
                            "Focus '{}' names unknown entity '{}'; preserving everything",
                            directive.cue,
                            reference.text
                        );
                        warnings.push(CompileWarning::LookupMiss {
                            collaborator: Collaborator::Resolver,
                            reference: reference.text.clone(),
                            fallback: "empty scope, every addressable entity preserved".into(),
                        });
                        missed.get_or_insert(i);
                    }
                }
            }
            resolved.push(ids);
        }

        let universe: Vec<EntityId> = if entities.is_empty() {
            let mut seen = HashSet::new();
            resolved
                .iter()
                .flatten()
                .filter(|id| seen.insert(id.as_str()))
                .cloned()
                .collect()
        } else {
            entities.to_vec()
        };

        // entity -> directive that took it out of scope
        let mut excluded: BTreeMap<usize, usize> = BTreeMap::new();
        if let Some(culprit) = missed {
            for pos in 0..universe.len() {
                excluded.insert(pos, culprit);
            }
        } else {
            for (i, (kind, named)) in kinds.iter().zip(&resolved).enumerate() {
                for (pos, entity) in universe.iter().enumerate() {
                    if excluded.contains_key(&pos) {
                        continue;
                    }
                    let is_named = named.contains(entity);
                    let drop = match kind {
                        FocusKind::Exclusive | FocusKind::Restrictive => !is_named,
                        FocusKind::Exceptive => is_named,
                    };
                    if drop {
                        excluded.insert(pos, i);
                    }
                }
            }
        }

        let defaults = self.config.focus_defaults();
        let scope: Vec<EntityId> = universe
            .iter()
            .enumerate()
            .filter(|(pos, _)| !excluded.contains_key(pos))
            .map(|(_, id)| id.clone())
            .collect();
        let constraints: Vec<Constraint> = excluded
            .iter()
            .map(|(&pos, &by)| {
                let directive = &directives[by];
                let entity = &universe[pos];
                Constraint::preserve(
                    self.ids.next(IMPLICIT_ID_PREFIX),
                    EntityRef::resolved(entity.clone(), entity.clone()),
                    directive.mode.unwrap_or(defaults.mode),
                    directive.severity.unwrap_or(defaults.severity),
                )
                .with_origin(ConstraintOrigin::Focus {
                    directive: directive.label(),
                })
            })
            .collect();

        log::debug!(
            "Focus narrowed {} entities to scope {:?} with {} implicit constraints",
            universe.len(),
            scope,
            constraints.len()
        );
        Ok(Some(FocusResolution { scope, constraints }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_protocol::{AliasResolver, NoResolver, Scope};
    use pretty_assertions::assert_eq;

    fn entities() -> Vec<EntityId> {
        ["drums", "bass", "vocals", "pad"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn resolver() -> AliasResolver {
        AliasResolver::new()
            .with_alias("drums", "drums")
            .with_alias("bass", "bass")
            .with_alias("vocals", "vocals")
            .with_alias("pad", "pad")
    }

    fn preserved(resolution: &FocusResolution) -> Vec<&str> {
        resolution
            .constraints
            .iter()
            .map(|c| c.target.key())
            .collect()
    }

    #[test]
    fn only_preserves_everything_else() {
        let ids = IdGenerator::new();
        let resolver = resolver();
        let focus = FocusResolver::new(DiscourseConfig::builtin(), &resolver, &ids);
        let mut warnings = Vec::new();
        let directive = FocusDirective::new("only", vec![EntityRef::named("the drums")]);

        let resolution = focus
            .resolve(&[directive], &entities(), &mut warnings)
            .unwrap()
            .unwrap();

        assert_eq!(resolution.scope, vec!["drums".to_string()]);
        assert_eq!(preserved(&resolution), vec!["bass", "vocals", "pad"]);
        assert!(resolution.constraints.iter().all(|c| c.severity == Severity::Hard
            && c.preserve_mode() == Some(PreserveMode::Exact)
            && c.is_implicit()));
        assert!(warnings.is_empty());
    }

    #[test]
    fn except_preserves_the_named_entity() {
        let ids = IdGenerator::new();
        let resolver = resolver();
        let focus = FocusResolver::new(DiscourseConfig::builtin(), &resolver, &ids);
        let mut warnings = Vec::new();
        let mut directive = FocusDirective::new("everything but", vec![EntityRef::named("vocals")]);
        directive.severity = Some(Severity::Soft);

        let resolution = focus
            .resolve(&[directive], &entities(), &mut warnings)
            .unwrap()
            .unwrap();

        assert_eq!(resolution.scope, vec!["drums", "bass", "pad"]);
        assert_eq!(preserved(&resolution), vec!["vocals"]);
        assert_eq!(resolution.constraints[0].severity, Severity::Soft);
        assert_eq!(resolution.constraints[0].id, "focus-1");
    }

    #[test]
    fn miss_falls_back_to_empty_scope() {
        let ids = IdGenerator::new();
        let focus = FocusResolver::new(DiscourseConfig::builtin(), &NoResolver, &ids);
        let mut warnings = Vec::new();
        let directive = FocusDirective::new("only", vec![EntityRef::named("that synth")]);

        let resolution = focus
            .resolve(&[directive], &entities(), &mut warnings)
            .unwrap()
            .unwrap();

        assert!(resolution.scope.is_empty());
        assert_eq!(resolution.constraints.len(), 4);
        assert!(matches!(
            warnings.as_slice(),
            [CompileWarning::LookupMiss {
                collaborator: Collaborator::Resolver,
                ..
            }]
        ));
    }

    #[test]
    fn unknown_cue_is_structural() {
        let ids = IdGenerator::new();
        let focus = FocusResolver::new(DiscourseConfig::builtin(), &NoResolver, &ids);
        let directive = FocusDirective::new("mostly", vec![EntityRef::resolved("pad", "pad")]);
        assert_eq!(
            focus.resolve(&[directive], &entities(), &mut Vec::new()),
            Err(StructuralError::UnknownFocusCue("mostly".into()))
        );
    }

    #[test]
    fn scope_segment_becomes_directive() {
        let segment = Segment::new(
            "s3",
            SegmentContent::Scope(Scope {
                entities: vec![EntityRef::named("bass")],
                focus: Some(FocusKind::Exclusive),
            }),
        );
        let directive = FocusDirective::from_segment(&segment).unwrap();
        assert_eq!(directive.kind, Some(FocusKind::Exclusive));
        assert_eq!(directive.label(), "s3");

        let plain = Segment::new(
            "s4",
            SegmentContent::Scope(Scope {
                entities: vec![EntityRef::named("bass")],
                focus: None,
            }),
        );
        assert!(FocusDirective::from_segment(&plain).is_none());
    }

    #[test]
    fn stacked_directives_narrow_in_turn() {
        let ids = IdGenerator::new();
        let resolver = resolver();
        let focus = FocusResolver::new(DiscourseConfig::builtin(), &resolver, &ids);
        let directives = [
            FocusDirective::new(
                "only",
                vec![EntityRef::named("drums"), EntityRef::named("bass")],
            ),
            FocusDirective::new("except", vec![EntityRef::named("bass")]),
        ];
        let resolution = focus
            .resolve(&directives, &entities(), &mut Vec::new())
            .unwrap()
            .unwrap();
        assert_eq!(resolution.scope, vec!["drums"]);
        assert_eq!(preserved(&resolution), vec!["bass", "vocals", "pad"]);
    }

    #[test]
    fn implicit_prefix_matches_generated_ids_only() {
        assert!(is_implicit_id("focus-1"));
        assert!(is_implicit_id("focus-12"));
        assert!(!is_implicit_id("focus"));
        assert!(!is_implicit_id("focused-melody"));
        assert!(!is_implicit_id("keep-focus-1"));
    }
}
