//! `estateflow-catalog` — listing reference data.
//!
//! Property types and tags are plain lookup records with a uniqueness
//! constraint on their names. They are not lifecycle-managed; the
//! [`Catalog`] directory is the single place they are defined and queried.

pub mod directory;
pub mod property_type;
pub mod tag;

pub use directory::Catalog;
pub use property_type::{PropertyType, PropertyTypeId};
pub use tag::{Tag, TagId};
