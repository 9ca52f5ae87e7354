//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values; two
/// instances with the same values are interchangeable. To "modify" one,
/// build a new one. Contrast with [`crate::Entity`], whose identity persists
/// across state changes.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
