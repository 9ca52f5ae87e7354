//! Read-side projections built from committed event envelopes.

pub mod offer_index;

pub use offer_index::OfferIndex;
