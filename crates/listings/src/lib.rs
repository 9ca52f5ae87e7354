//! `estateflow-listings` — the property/offer lifecycle engine.
//!
//! A [`property::Property`] and its [`offer::Offer`] collection form a single
//! aggregate: every lifecycle operation (listing, offers, acceptance,
//! refusal, sale, cancellation, deletion) is decided by the aggregate's pure
//! `handle` and committed as one atomic batch of events. Derived fields
//! (`total_area`, `best_offer`) are recomputed in `apply` whenever their
//! inputs change, and the predicates in [`validate`] run before any event is
//! emitted.

pub mod offer;
pub mod property;
pub mod validate;

pub use offer::{
    DEFAULT_VALIDITY_DAYS, Offer, OfferId, OfferStatus, compute_deadline, compute_validity,
};
pub use property::{
    AcceptOffer, ArchiveProperty, AssignPropertyType, CancelProperty, DeleteProperty,
    GardenOrientation, ListProperty, MakeOffer, MarkSold, Property, PropertyCommand,
    PropertyDetails, PropertyEvent, PropertyId, PropertyState, RefuseOffer, RescheduleOffer,
    RestoreProperty, UpdateDetails, WithdrawOffer, default_availability,
};
