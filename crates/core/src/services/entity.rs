//! Typed references to application entities.
//!
//! Notices and observations point at arbitrary application objects
//! (a blog entry, a comment, another user). Rather than a polymorphic
//! foreign key, those links are carried as a (kind, id) pair.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A reference to an application entity by kind and ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity kind, e.g. `"blog_entry"`.
    pub kind: String,
    /// Entity ID within its kind.
    pub id: String,
}

impl EntityRef {
    #[must_use]
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Site-relative path for the entity, `/{kind}/{id}/`.
    #[must_use]
    pub fn path(&self) -> String {
        format!("/{}/{}/", self.kind, self.id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Snapshot of an entity at deletion time, for observation cleanup.
///
/// `related` carries the entity's relations by attribute name, so
/// configured cascade attributes can be resolved after the row itself
/// is gone.
#[derive(Debug, Clone)]
pub struct DeletedEntity {
    pub entity: EntityRef,
    pub related: HashMap<String, EntityRef>,
}

impl DeletedEntity {
    #[must_use]
    pub fn new(entity: EntityRef) -> Self {
        Self {
            entity,
            related: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_related(mut self, attribute: impl Into<String>, entity: EntityRef) -> Self {
        self.related.insert(attribute.into(), entity);
        self
    }
}
