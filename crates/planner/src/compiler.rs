use std::collections::{BTreeSet, HashMap};

use cadence_checker::{
    resolve_preferences, ConflictDetector, ConstraintVerifier, PreferenceConflict, PruningPolicy,
};
use cadence_graph::{DiscourseType, RelationGraph, RelationGraphBuilder};
use cadence_protocol::{
    CompileWarning, CompositionOperator, CompositionType, Constraint, ConstraintCheckReport,
    DeferredChoice, EditDiff, EntityId, EntityResolver, ExecutionOrder, ExecutionPlan, Goal,
    GoalConflict, HistoryStore, IdGenerator, PlanStep, Preference, RelationType,
    RollbackRequirement, Segment, SegmentContent, SegmentId, SegmentKind, StepRole,
    ValidationGate,
};
use serde::{Deserialize, Serialize};

use crate::composer::{Composition, PlanComposer};
use crate::config::DiscourseConfig;
use crate::error::{Result, RollbackError, StructuralError};
use crate::focus::{is_implicit_id, FocusDirective, FocusResolver};
use crate::mapper::{Mapping, RelationMapper};
use crate::presupposition::{ParticleMark, PresuppositionResolver};
use crate::rollback::{self, ReplacementTarget};
use crate::sequencing::{
    OrderingEdge, SequencingConstraint, SequencingEngine, SequencingKind, Simultaneity,
};

/// Everything known about one utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompileRequest {
    #[serde(default)]
    pub plan_id: Option<String>,
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub links: Vec<cadence_protocol::DiscourseLink>,
    #[serde(default)]
    pub sequencing: Vec<SequencingConstraint>,
    #[serde(default)]
    pub focus: Vec<FocusDirective>,
    #[serde(default)]
    pub particles: Vec<ParticleMark>,
    #[serde(default)]
    pub replacements: Vec<ReplacementTarget>,
    /// Entities the utterance may address; the universe for focus operators.
    #[serde(default)]
    pub entities: Vec<EntityId>,
    /// When present, constraints are verified against it.
    #[serde(default)]
    pub diff: Option<EditDiff>,
    #[serde(default)]
    pub preference_policy: PruningPolicy,
}

impl CompileRequest {
    pub fn new(segments: Vec<Segment>, links: Vec<cadence_protocol::DiscourseLink>) -> Self {
        Self {
            segments,
            links,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_plan_id(mut self, plan_id: impl Into<String>) -> Self {
        self.plan_id = Some(plan_id.into());
        self
    }

    #[must_use]
    pub fn with_sequencing(mut self, sequencing: Vec<SequencingConstraint>) -> Self {
        self.sequencing = sequencing;
        self
    }

    #[must_use]
    pub fn with_focus(mut self, focus: Vec<FocusDirective>) -> Self {
        self.focus = focus;
        self
    }

    #[must_use]
    pub fn with_particles(mut self, particles: Vec<ParticleMark>) -> Self {
        self.particles = particles;
        self
    }

    #[must_use]
    pub fn with_replacements(mut self, replacements: Vec<ReplacementTarget>) -> Self {
        self.replacements = replacements;
        self
    }

    #[must_use]
    pub fn with_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EntityId>,
    {
        self.entities = entities.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_diff(mut self, diff: EditDiff) -> Self {
        self.diff = Some(diff);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileOutcome {
    pub plan: ExecutionPlan,
    pub discourse_type: DiscourseType,
    pub root: SegmentId,
    pub mappings: Vec<Mapping>,
    /// Explicit constraints followed by focus-implied ones.
    pub constraints: Vec<Constraint>,
    pub conflicts: Vec<GoalConflict>,
    pub preferences: Vec<Preference>,
    pub preference_conflicts: Vec<PreferenceConflict>,
    pub report: Option<ConstraintCheckReport>,
    pub replacement_errors: Vec<RollbackError>,
    pub warnings: Vec<CompileWarning>,
}

impl CompileOutcome {
    pub fn hard_conflicts(&self) -> usize {
        self.conflicts
            .iter()
            .filter(|c| c.severity.is_hard())
            .count()
    }
}

/// A mapped link whose two ends both became steps.
struct StepLink {
    mapping: Mapping,
    source: usize,
    target: usize,
}

impl StepLink {
    fn ends(&self) -> [usize; 2] {
        [self.source, self.target]
    }
}

/// Ordering facts derived from relations and explicit cues.
#[derive(Default)]
struct Ordering {
    edges: Vec<OrderingEdge>,
    marks: Vec<Simultaneity>,
    gates: Vec<ValidationGate>,
    previews: bool,
}

/// End-to-end compiler from segments and links to a validated plan.
pub struct PlanCompiler<'c> {
    config: &'c DiscourseConfig,
}

impl PlanCompiler<'static> {
    pub fn builtin() -> Self {
        Self::new(DiscourseConfig::builtin())
    }
}

impl<'c> PlanCompiler<'c> {
    pub fn new(config: &'c DiscourseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiscourseConfig {
        self.config
    }

    pub fn compile(
        &self,
        request: &CompileRequest,
        history: &dyn HistoryStore,
        resolver: &dyn EntityResolver,
    ) -> Result<CompileOutcome> {
        // Fresh id context per compilation keeps compiles reproducible
        let step_ids = IdGenerator::new();
        let constraint_ids = IdGenerator::new();
        let mut warnings = Vec::new();

        // Phase 1: graph and relation mapping
        let graph = RelationGraphBuilder::new().build(&request.segments, &request.links)?;
        let mapper = RelationMapper::new(self.config);
        let mut mappings = Vec::with_capacity(graph.links().len());
        for (i, link) in graph.links().iter().enumerate() {
            let source = segment(&graph, &link.source)?;
            let target = segment(&graph, &link.target)?;
            mappings.push(mapper.map(i, link, source, target, &mut warnings)?);
        }

        // Phase 2: steps
        let antecedents = condition_antecedents(&graph, &mappings);
        let mut steps: Vec<PlanStep> = Vec::new();
        let mut step_of: HashMap<&str, usize> = HashMap::new();
        for seg in graph.segments() {
            let Some(role) = step_role(seg, &antecedents) else {
                continue;
            };
            let description = match (role, &seg.content) {
                (StepRole::Condition, SegmentContent::Question(q)) => format!("if {}", q.text),
                (StepRole::Condition, _) => format!("if {}", seg.describe()),
                _ => seg.describe(),
            };
            step_of.insert(seg.id.as_str(), steps.len());
            steps.push(PlanStep::new(step_ids.next("step"), description, &seg.id, role));
        }

        let step_links: Vec<StepLink> = mappings
            .iter()
            .zip(graph.links())
            .filter_map(|(mapping, link)| {
                let ends = (
                    step_of.get(link.source.as_str()),
                    step_of.get(link.target.as_str()),
                );
                match ends {
                    (Some(&source), Some(&target)) => Some(StepLink {
                        mapping: mapping.clone(),
                        source,
                        target,
                    }),
                    _ => {
                        log::debug!(
                            "Link {} {} -> {} has no step at one end; not ordering it",
                            mapping.link_index,
                            link.source,
                            link.target
                        );
                        None
                    }
                }
            })
            .collect();

        // Phase 3: ordering
        let uniform = uniform_kind(&step_links, steps.len(), &request.sequencing);
        let deferred_choices = if uniform.is_some() {
            Vec::new()
        } else {
            defer_alternatives(&graph, &step_links, &steps, &mut warnings)
        };
        let deferred: BTreeSet<usize> = deferred_choices
            .iter()
            .flat_map(|(_, others)| others.iter().copied())
            .collect();

        let mut ordering = self.relation_ordering(&graph, &step_links, &steps, &deferred);
        self.explicit_ordering(request, &step_of, &deferred, &steps, &mut ordering)?;

        let active: Vec<usize> = (0..steps.len()).filter(|i| !deferred.contains(i)).collect();
        let ids: Vec<String> = steps.iter().map(|s| s.id.clone()).collect();
        let schedule =
            SequencingEngine::new(&ids).schedule(&active, &ordering.edges, &ordering.marks)?;
        for (&step, deps) in &schedule.dependencies {
            steps[step].depends_on = deps.iter().map(|&d| ids[d].clone()).collect();
        }

        let composition = match uniform {
            Some(kind) => {
                self.compose_uniform(kind, &graph, &step_links, &steps, &schedule.flatten())?
            }
            None => Composition {
                order: if schedule.has_parallel_group() {
                    ExecutionOrder::Parallel {
                        groups: schedule.groups.clone(),
                    }
                } else {
                    ExecutionOrder::Sequential {
                        order: schedule.flatten(),
                    }
                },
                preview_each: ordering.previews,
                gates: ordering.gates,
            },
        };

        // Phase 4: focus
        if let Some(clash) = graph
            .segments()
            .filter_map(|s| s.as_constraint())
            .find(|c| is_implicit_id(&c.id))
        {
            return Err(StructuralError::ReservedConstraintId(clash.id.clone()).into());
        }
        let mut directives: Vec<FocusDirective> = request.focus.clone();
        directives.extend(graph.segments().filter_map(FocusDirective::from_segment));
        let focus = FocusResolver::new(self.config, resolver, &constraint_ids).resolve(
            &directives,
            &request.entities,
            &mut warnings,
        )?;

        // Phase 5: presupposition particles
        let presuppositions = PresuppositionResolver::new(history);
        let mut effects = Vec::with_capacity(request.particles.len());
        for mark in &request.particles {
            let Some(particle) = mark.resolve_particle(self.config) else {
                log::warn!(
                    "Unknown particle {:?} on {}; ignoring it",
                    mark.word,
                    mark.segment
                );
                continue;
            };
            let seg = segment(&graph, &mark.segment)?;
            let step = step_of
                .get(mark.segment.as_str())
                .map(|&i| steps[i].id.as_str())
                .ok_or_else(|| StructuralError::UnknownStep(mark.segment.clone()))?;
            effects.push(presuppositions.resolve(particle, seg, step, &mut warnings));
        }

        // Phase 6: replacements
        let mut rollbacks: Vec<RollbackRequirement> = Vec::with_capacity(request.replacements.len());
        let mut replacement_errors = Vec::new();
        for target in &request.replacements {
            let requirement = match rollback::require(target) {
                Ok(requirement) => requirement,
                Err(err) => {
                    log::warn!("Replacement of {} cannot roll back: {err}", target.plan_id);
                    replacement_errors.push(err);
                    rollback::analyze(target)
                }
            };
            if let Some(warning) = rollback::cascade_warning(&requirement) {
                warnings.push(warning);
            }
            rollbacks.push(requirement);
        }

        // Phase 7: conflicts, preferences and verification
        let goals: Vec<Goal> = graph.segments().filter_map(|s| s.as_goal().cloned()).collect();
        let mut constraints: Vec<Constraint> = graph
            .segments()
            .filter_map(|s| s.as_constraint().cloned())
            .collect();
        let scope = focus.map(|resolution| {
            constraints.extend(resolution.constraints);
            resolution.scope
        });

        let scan = ConflictDetector::new(self.config.timbral_opposites(), resolver)
            .scan(&goals, &constraints);
        for warning in scan.warnings {
            push_unique(&mut warnings, warning);
        }
        for conflict in &scan.conflicts {
            log::warn!("{}", conflict.explanation);
            warnings.push(CompileWarning::Conflict {
                conflict: conflict.clone(),
            });
        }

        let preferences: Vec<Preference> = graph
            .segments()
            .filter_map(|s| s.as_preference().cloned())
            .collect();
        let preference_resolution = resolve_preferences(&preferences, request.preference_policy);

        let report = match &request.diff {
            Some(diff) => {
                let verification = ConstraintVerifier::new(resolver).verify(&constraints, diff)?;
                for warning in verification.warnings {
                    push_unique(&mut warnings, warning);
                }
                Some(verification.report)
            }
            None => None,
        };

        // Phase 8: assemble
        let deferred_choices = deferred_choices
            .into_iter()
            .map(|(chosen, others)| {
                let user_choice = !steps_main_point(&graph, &steps, chosen);
                DeferredChoice {
                    chosen: steps[chosen].id.clone(),
                    options: std::iter::once(chosen)
                        .chain(others)
                        .map(|i| steps[i].id.clone())
                        .collect(),
                    user_choice,
                }
            })
            .collect();

        let mut plan = ExecutionPlan::new(
            request.plan_id.clone().unwrap_or_default(),
            composition.order,
            steps,
            composition.preview_each,
        )
        .with_gates(composition.gates)
        .with_effects(effects)
        .with_scope(scope)
        .with_rollback(rollbacks)
        .with_deferred_choices(deferred_choices);
        if plan.id.is_empty() {
            plan.id = content_plan_id(&plan);
        }
        plan.validate()?;

        log::info!(
            "Compiled {} ({:?}): {} steps, {:?} order, {} conflicts, {} warnings",
            plan.id,
            graph.discourse_type(),
            plan.steps.len(),
            plan.order.kind(),
            scan.conflicts.len(),
            warnings.len()
        );

        Ok(CompileOutcome {
            plan,
            discourse_type: graph.discourse_type(),
            root: graph.root().id.clone(),
            mappings,
            constraints,
            conflicts: scan.conflicts,
            preferences: preference_resolution.resolved,
            preference_conflicts: preference_resolution.conflicts,
            report,
            replacement_errors,
            warnings,
        })
    }

    /// Edges, marks and gates implied by the mapped relations.
    fn relation_ordering(
        &self,
        graph: &RelationGraph,
        links: &[StepLink],
        steps: &[PlanStep],
        deferred: &BTreeSet<usize>,
    ) -> Ordering {
        let mut ordering = Ordering::default();
        for link in links {
            if link.ends().iter().any(|end| deferred.contains(end)) {
                continue;
            }
            let label = format!(
                "{} {} -> {}",
                link.mapping.relation, steps[link.source].segment, steps[link.target].segment
            );
            let ends = link.ends();
            ordering.previews |= link.mapping.composition().previews_each_step();
            match &link.mapping.operator {
                CompositionOperator::Sequential { .. } => ordering.edges.push(OrderingEdge {
                    before: link.source,
                    after: link.target,
                    label,
                }),
                CompositionOperator::Conditional {
                    condition_index,
                    action_index,
                } => ordering.edges.push(OrderingEdge {
                    before: ends[*condition_index],
                    after: ends[*action_index],
                    label,
                }),
                CompositionOperator::Contrastive {
                    goal_index,
                    constraint_indices,
                    ..
                } => {
                    let goal = ends[*goal_index];
                    for &ci in constraint_indices {
                        let constraint_step = ends[ci];
                        ordering.edges.push(OrderingEdge {
                            before: goal,
                            after: constraint_step,
                            label: label.clone(),
                        });
                        ordering
                            .gates
                            .push(gate(graph, steps, goal, constraint_step));
                    }
                }
                CompositionOperator::Concurrent { .. } => ordering.marks.push(Simultaneity {
                    a: link.source,
                    b: link.target,
                    label,
                }),
                // parallel links add no ordering; alternatives were resolved upstream
                CompositionOperator::Parallel | CompositionOperator::Alternative { .. } => {}
            }
        }
        ordering
    }

    fn explicit_ordering(
        &self,
        request: &CompileRequest,
        step_of: &HashMap<&str, usize>,
        deferred: &BTreeSet<usize>,
        steps: &[PlanStep],
        ordering: &mut Ordering,
    ) -> std::result::Result<(), StructuralError> {
        for constraint in &request.sequencing {
            let kind = match constraint.kind {
                Some(kind) => kind,
                None => self
                    .config
                    .sequencing_kind(&constraint.cue)
                    .ok_or_else(|| StructuralError::UnknownSequencingCue(constraint.cue.clone()))?,
            };
            let lookup = |id: &SegmentId| {
                step_of
                    .get(id.as_str())
                    .copied()
                    .ok_or_else(|| StructuralError::UnknownStep(id.clone()))
            };
            let first = lookup(&constraint.first)?;
            let second = lookup(&constraint.second)?;
            if deferred.contains(&first) || deferred.contains(&second) {
                log::debug!(
                    "Dropping '{}': it names a deferred alternative",
                    constraint.label()
                );
                continue;
            }
            match kind {
                SequencingKind::Strict | SequencingKind::Loose => {
                    log::debug!(
                        "Explicit {kind:?} ordering {} before {}",
                        steps[first].id,
                        steps[second].id
                    );
                    ordering.previews = true;
                    ordering.edges.push(OrderingEdge {
                        before: first,
                        after: second,
                        label: constraint.label(),
                    });
                }
                SequencingKind::Simultaneous => ordering.marks.push(Simultaneity {
                    a: first,
                    b: second,
                    label: constraint.label(),
                }),
            }
        }
        Ok(())
    }

    /// Merge every link into one operator over all steps and compose it.
    fn compose_uniform(
        &self,
        kind: CompositionType,
        graph: &RelationGraph,
        links: &[StepLink],
        steps: &[PlanStep],
        scheduled: &[usize],
    ) -> std::result::Result<Composition, StructuralError> {
        let all: Vec<usize> = (0..steps.len()).collect();
        let (operator, constituents) = match kind {
            CompositionType::Sequential => (
                CompositionOperator::Sequential {
                    strict: links.iter().any(|l| {
                        matches!(l.mapping.operator, CompositionOperator::Sequential { strict: true })
                    }),
                },
                scheduled.to_vec(),
            ),
            CompositionType::Parallel => (CompositionOperator::Parallel, all),
            CompositionType::Concurrent => (
                CompositionOperator::Concurrent {
                    synchronized: links.iter().any(|l| {
                        matches!(
                            l.mapping.operator,
                            CompositionOperator::Concurrent { synchronized: true }
                        )
                    }),
                },
                all,
            ),
            CompositionType::Alternative => {
                let (main, rest): (Vec<usize>, Vec<usize>) =
                    all.iter().partition(|&&i| steps_main_point(graph, steps, i));
                let preference_order = if main.is_empty() {
                    None
                } else {
                    Some(main.into_iter().chain(rest).collect())
                };
                (
                    CompositionOperator::Alternative {
                        user_choice: preference_order.is_none(),
                        preference_order,
                    },
                    all,
                )
            }
            CompositionType::Conditional => {
                let link = &links[0];
                (link.mapping.operator.clone(), link.ends().to_vec())
            }
            CompositionType::Contrastive => {
                let goal = contrastive_goal(&links[0]).unwrap_or(links[0].source);
                let constraints: Vec<usize> = all.iter().copied().filter(|&i| i != goal).collect();
                let mut constituents = vec![goal];
                constituents.extend(&constraints);
                (
                    CompositionOperator::Contrastive {
                        goal_index: 0,
                        constraint_indices: (1..constituents.len()).collect(),
                        hard_constraint: true,
                    },
                    constituents,
                )
            }
        };

        let mut composition = PlanComposer::compose(&operator, &constituents, steps)?;
        // one merged operator carries one flag; restore each constraint's own severity
        for g in &mut composition.gates {
            *g = gate(graph, steps, g.step, g.constraint_step);
        }
        Ok(composition)
    }
}

fn segment<'g>(graph: &'g RelationGraph, id: &str) -> std::result::Result<&'g Segment, StructuralError> {
    graph
        .segment(id)
        .ok_or_else(|| StructuralError::UnknownStep(id.to_string()))
}

/// Segments that are the antecedent of some conditional link.
fn condition_antecedents<'g>(graph: &'g RelationGraph, mappings: &[Mapping]) -> BTreeSet<&'g str> {
    mappings
        .iter()
        .filter_map(|mapping| match mapping.operator {
            CompositionOperator::Conditional {
                condition_index, ..
            } => {
                let link = &graph.links()[mapping.link_index];
                Some(if condition_index == 0 {
                    link.source.as_str()
                } else {
                    link.target.as_str()
                })
            }
            _ => None,
        })
        .collect()
}

fn step_role(segment: &Segment, antecedents: &BTreeSet<&str>) -> Option<StepRole> {
    if antecedents.contains(segment.id.as_str()) {
        return Some(StepRole::Condition);
    }
    match segment.kind() {
        SegmentKind::Goal | SegmentKind::Command => Some(StepRole::Action),
        SegmentKind::Constraint => Some(StepRole::Validation),
        _ => None,
    }
}

/// The single composition every step link shares, when the whole plan can
/// be composed by one operator.
fn uniform_kind(
    links: &[StepLink],
    step_count: usize,
    sequencing: &[SequencingConstraint],
) -> Option<CompositionType> {
    let first = links.first()?;
    if !sequencing.is_empty() {
        return None;
    }
    let kind = first.mapping.composition();
    if links.iter().any(|l| l.mapping.composition() != kind) {
        return None;
    }
    let covered: BTreeSet<usize> = links.iter().flat_map(StepLink::ends).collect();
    if covered.len() != step_count {
        return None;
    }
    match kind {
        CompositionType::Conditional if links.len() != 1 => None,
        CompositionType::Contrastive => {
            let goal = contrastive_goal(first)?;
            links
                .iter()
                .all(|l| contrastive_goal(l) == Some(goal))
                .then_some(kind)
        }
        _ => Some(kind),
    }
}

fn contrastive_goal(link: &StepLink) -> Option<usize> {
    match link.mapping.operator {
        CompositionOperator::Contrastive { goal_index, .. } => link.ends().get(goal_index).copied(),
        _ => None,
    }
}

/// In a mixed discourse only one option of each alternation survives in
/// the order. Returns `(chosen, others)` per alternation cluster.
fn defer_alternatives(
    graph: &RelationGraph,
    links: &[StepLink],
    steps: &[PlanStep],
    warnings: &mut Vec<CompileWarning>,
) -> Vec<(usize, Vec<usize>)> {
    // cluster options joined by alternation links
    let mut cluster_of: HashMap<usize, usize> = HashMap::new();
    let mut clusters: Vec<BTreeSet<usize>> = Vec::new();
    for link in links
        .iter()
        .filter(|l| l.mapping.relation == RelationType::Alternation)
    {
        let joined = (
            cluster_of.get(&link.source).copied(),
            cluster_of.get(&link.target).copied(),
        );
        let id = match joined {
            (Some(a), Some(b)) if a != b => {
                let moved = std::mem::take(&mut clusters[b]);
                for &step in &moved {
                    cluster_of.insert(step, a);
                }
                clusters[a].extend(moved);
                a
            }
            (Some(a), _) | (None, Some(a)) => a,
            (None, None) => {
                clusters.push(BTreeSet::new());
                clusters.len() - 1
            }
        };
        for end in link.ends() {
            cluster_of.insert(end, id);
            clusters[id].insert(end);
        }
    }

    clusters
        .into_iter()
        .filter(|c| c.len() > 1)
        .map(|options| {
            let chosen = options
                .iter()
                .copied()
                .find(|&i| steps_main_point(graph, steps, i))
                .or_else(|| options.first().copied())
                .unwrap_or_default();
            let others: Vec<usize> = options.into_iter().filter(|&i| i != chosen).collect();
            let names: Vec<String> = others.iter().map(|&i| steps[i].id.clone()).collect();
            log::debug!(
                "Keeping {} from an alternation; deferring {:?}",
                steps[chosen].id,
                names
            );
            warnings.push(CompileWarning::DeferredChoice {
                chosen: steps[chosen].id.clone(),
                options: names,
            });
            (chosen, others)
        })
        .collect()
}

fn steps_main_point(graph: &RelationGraph, steps: &[PlanStep], step: usize) -> bool {
    graph
        .segment(&steps[step].segment)
        .is_some_and(|s| s.is_main_point)
}

/// Validation gate whose hardness follows the constraint segment.
fn gate(graph: &RelationGraph, steps: &[PlanStep], step: usize, constraint_step: usize) -> ValidationGate {
    let constraint = graph
        .segment(&steps[constraint_step].segment)
        .and_then(Segment::as_constraint);
    ValidationGate {
        step,
        constraint_step,
        constraint_id: Some(
            constraint
                .map(|c| c.id.clone())
                .unwrap_or_else(|| steps[constraint_step].segment.clone()),
        ),
        hard: constraint.map_or(true, |c| c.severity.is_hard()),
    }
}

fn push_unique(warnings: &mut Vec<CompileWarning>, warning: CompileWarning) {
    if !warnings.contains(&warning) {
        warnings.push(warning);
    }
}

/// Hex digits of the plan fingerprint kept in a derived plan id.
const PLAN_ID_HEX: usize = 12;

/// Id for a plan the caller did not name: equal plans share it, different
/// plans differ.
fn content_plan_id(plan: &ExecutionPlan) -> String {
    let fingerprint = plan.fingerprint();
    format!("plan-{}", &fingerprint[..PLAN_ID_HEX.min(fingerprint.len())])
}
