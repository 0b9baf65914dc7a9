use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::segment::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Modified,
    Added,
    Removed,
    Moved,
}

impl ChangeKind {
    /// Removal or relocation of the element itself.
    pub const fn is_structural(self) -> bool {
        matches!(self, Self::Removed | Self::Moved)
    }
}

/// One change reported by the editor after (or while previewing) a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Change {
    pub entity: EntityId,
    pub kind: ChangeKind,
    /// Container of `entity` (the region a note lives in, the track a clip
    /// lives on). Changes to children count against their container.
    #[serde(default)]
    pub parent: Option<EntityId>,
    #[serde(default)]
    pub property: Option<String>,
    #[serde(default)]
    pub before: Option<f64>,
    #[serde(default)]
    pub after: Option<f64>,
}

impl Change {
    pub fn modified(
        entity: impl Into<EntityId>,
        property: impl Into<String>,
        before: f64,
        after: f64,
    ) -> Self {
        Self {
            entity: entity.into(),
            kind: ChangeKind::Modified,
            parent: None,
            property: Some(property.into()),
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn structural(entity: impl Into<EntityId>, kind: ChangeKind) -> Self {
        Self {
            entity: entity.into(),
            kind,
            parent: None,
            property: None,
            before: None,
            after: None,
        }
    }

    #[must_use]
    pub fn under(mut self, parent: impl Into<EntityId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn touches(&self, entity: &str) -> bool {
        self.entity == entity || self.parent.as_deref() == Some(entity)
    }
}

/// Description of what an executed (or previewed) plan changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EditDiff {
    #[serde(default)]
    pub changes: Vec<Change>,
}

impl EditDiff {
    pub fn new(changes: Vec<Change>) -> Self {
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// `(index, change)` for every change touching `entity` or its children.
    pub fn touching<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = (usize, &'a Change)> + 'a {
        self.changes
            .iter()
            .enumerate()
            .filter(move |(_, change)| change.touches(entity))
    }

    /// Latest recorded value of `property` on `entity` itself.
    pub fn latest_value(&self, entity: &str, property: &str) -> Option<f64> {
        self.changes
            .iter()
            .rev()
            .filter(|c| c.entity == entity && c.property.as_deref() == Some(property))
            .find_map(|c| c.after)
    }
}
