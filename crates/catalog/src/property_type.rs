use serde::{Deserialize, Serialize};

use estateflow_core::{AggregateId, Entity};

/// Property type identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyTypeId(pub AggregateId);

impl PropertyTypeId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PropertyTypeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A kind of property (house, apartment, ...).
///
/// `sequence` is a manual ordering weight; directories list types by
/// `(sequence, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyType {
    pub id: PropertyTypeId,
    pub name: String,
    pub sequence: u32,
}

impl Entity for PropertyType {
    type Id = PropertyTypeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
