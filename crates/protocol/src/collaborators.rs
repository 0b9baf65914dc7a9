use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::segment::{EntityId, EntityRef, SegmentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HistoryLookupKind {
    /// Most recent edit of the same kind ("again", "even").
    PriorEdit,
    /// State before the most recent edit of the same kind ("back").
    PriorState,
    /// An edit of the same kind that already completed ("already").
    CompletedEdit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HistoryQuery {
    pub segment: SegmentId,
    /// Kind of edit, e.g. `axis:brightness` or `operation:swap`.
    pub action: String,
    #[serde(default)]
    pub target: Option<EntityRef>,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HistoryRecord {
    pub id: String,
    pub kind: HistoryLookupKind,
    pub action: String,
    #[serde(default)]
    pub target: Option<EntityId>,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Read-only view of the project's edit history.
pub trait HistoryStore {
    fn find_prior(&self, kind: HistoryLookupKind, query: &HistoryQuery) -> Option<HistoryRecord>;
}

/// Maps a spoken reference ("the lead", "that synth") to a concrete entity.
pub trait EntityResolver {
    fn resolve(&self, reference: &EntityRef) -> Option<EntityId>;
}

/// History store that never remembers anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl HistoryStore for NoHistory {
    fn find_prior(&self, _kind: HistoryLookupKind, _query: &HistoryQuery) -> Option<HistoryRecord> {
        None
    }
}

/// Resolver that only knows references already carrying an id.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl EntityResolver for NoResolver {
    fn resolve(&self, reference: &EntityRef) -> Option<EntityId> {
        reference.id.clone()
    }
}

/// Resolver backed by a case-insensitive alias table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AliasResolver {
    #[serde(default)]
    aliases: HashMap<String, EntityId>,
}

impl AliasResolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_alias(mut self, alias: &str, entity: impl Into<EntityId>) -> Self {
        self.insert(alias, entity);
        self
    }

    pub fn insert(&mut self, alias: &str, entity: impl Into<EntityId>) {
        self.aliases
            .insert(normalize_alias(alias), entity.into());
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

fn normalize_alias(alias: &str) -> String {
    let lowered = alias.trim().to_lowercase();
    lowered
        .strip_prefix("the ")
        .unwrap_or(&lowered)
        .trim()
        .to_string()
}

impl EntityResolver for AliasResolver {
    fn resolve(&self, reference: &EntityRef) -> Option<EntityId> {
        if let Some(id) = &reference.id {
            return Some(id.clone());
        }
        self.aliases.get(&normalize_alias(&reference.text)).cloned()
    }
}

/// Append-only in-memory history, newest record last.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct InMemoryHistory {
    #[serde(default)]
    records: Vec<HistoryRecord>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: HistoryRecord) {
        self.records.push(record);
    }

    #[must_use]
    pub fn with_record(mut self, record: HistoryRecord) -> Self {
        self.push(record);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl HistoryStore for InMemoryHistory {
    fn find_prior(&self, kind: HistoryLookupKind, query: &HistoryQuery) -> Option<HistoryRecord> {
        let wanted_target = query.target.as_ref().map(EntityRef::key);
        self.records
            .iter()
            .rev()
            .find(|record| {
                record.kind == kind
                    && record.action == query.action
                    && match (wanted_target, record.target.as_deref()) {
                        (Some(want), Some(have)) => want == have,
                        _ => true,
                    }
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, kind: HistoryLookupKind, action: &str, target: Option<&str>) -> HistoryRecord {
        HistoryRecord {
            id: id.to_string(),
            kind,
            action: action.to_string(),
            target: target.map(str::to_string),
            plan_id: None,
            description: String::new(),
            params: serde_json::Value::Null,
        }
    }

    #[test]
    fn in_memory_history_returns_newest_match() {
        let history = InMemoryHistory::new()
            .with_record(record("h1", HistoryLookupKind::PriorEdit, "axis:brightness", Some("pad")))
            .with_record(record("h2", HistoryLookupKind::PriorEdit, "axis:brightness", Some("pad")))
            .with_record(record("h3", HistoryLookupKind::PriorEdit, "axis:brightness", Some("bass")));

        let query = HistoryQuery {
            segment: "s1".to_string(),
            action: "axis:brightness".to_string(),
            target: Some(EntityRef::named("pad")),
            params: serde_json::Value::Null,
        };
        let found = history
            .find_prior(HistoryLookupKind::PriorEdit, &query)
            .expect("record");
        assert_eq!(found.id, "h2");
        assert!(history
            .find_prior(HistoryLookupKind::PriorState, &query)
            .is_none());
    }

    #[test]
    fn alias_resolver_ignores_case_and_article() {
        let resolver = AliasResolver::new().with_alias("Melody", "track-2");
        assert_eq!(
            resolver.resolve(&EntityRef::named("the melody")),
            Some("track-2".to_string())
        );
        assert_eq!(resolver.resolve(&EntityRef::named("drums")), None);
        assert_eq!(
            resolver.resolve(&EntityRef::resolved("drums", "track-9")),
            Some("track-9".to_string())
        );
    }
}
