//! In-memory reference-data directory.

use std::sync::RwLock;

use estateflow_core::{AggregateId, DomainError, DomainResult};

use crate::property_type::{PropertyType, PropertyTypeId};
use crate::tag::{Tag, TagId};

/// Directory of property types and tags.
///
/// Names are unique within each collection. Listings are returned in the
/// canonical orders: types by `(sequence, name)`, tags by `name`.
#[derive(Debug, Default)]
pub struct Catalog {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    types: Vec<PropertyType>,
    tags: Vec<Tag>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new property type. Fails with a conflict if the name is
    /// already taken.
    pub fn define_property_type(
        &self,
        name: impl Into<String>,
        sequence: u32,
    ) -> DomainResult<PropertyTypeId> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("type name cannot be empty"));
        }

        let mut inner = self.write()?;
        if inner.types.iter().any(|t| t.name == name) {
            return Err(DomainError::conflict(format!(
                "property type '{name}' already exists"
            )));
        }

        let id = PropertyTypeId::new(AggregateId::new());
        inner.types.push(PropertyType { id, name, sequence });
        Ok(id)
    }

    /// Register a new tag. Fails with a conflict if the name is already taken.
    pub fn define_tag(&self, name: impl Into<String>, color: u32) -> DomainResult<TagId> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("tag name cannot be empty"));
        }

        let mut inner = self.write()?;
        if inner.tags.iter().any(|t| t.name == name) {
            return Err(DomainError::conflict(format!("tag '{name}' already exists")));
        }

        let id = TagId::new(AggregateId::new());
        inner.tags.push(Tag { id, name, color });
        Ok(id)
    }

    pub fn property_type(&self, id: PropertyTypeId) -> DomainResult<PropertyType> {
        let inner = self.read()?;
        inner
            .types
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(DomainError::NotFound)
    }

    pub fn tag(&self, id: TagId) -> DomainResult<Tag> {
        let inner = self.read()?;
        inner
            .tags
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(DomainError::NotFound)
    }

    pub fn contains_property_type(&self, id: PropertyTypeId) -> bool {
        self.property_type(id).is_ok()
    }

    pub fn contains_tag(&self, id: TagId) -> bool {
        self.tag(id).is_ok()
    }

    /// All property types, ordered by `(sequence, name)`.
    pub fn property_types(&self) -> Vec<PropertyType> {
        let mut types = match self.read() {
            Ok(inner) => inner.types.clone(),
            Err(_) => return vec![],
        };
        types.sort_by(|a, b| (a.sequence, &a.name).cmp(&(b.sequence, &b.name)));
        types
    }

    /// All tags, ordered by name.
    pub fn tags(&self) -> Vec<Tag> {
        let mut tags = match self.read() {
            Ok(inner) => inner.tags.clone(),
            Err(_) => return vec![],
        };
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    fn read(&self) -> DomainResult<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| DomainError::conflict("catalog lock poisoned"))
    }

    fn write(&self) -> DomainResult<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| DomainError::conflict("catalog lock poisoned"))
    }
}
