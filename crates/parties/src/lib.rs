//! `estateflow-parties` — partners (buyers and other contacts).
//!
//! A partner is anyone who can appear on the buying side of a listing:
//! offers reference a partner, and an accepted offer promotes its partner to
//! the property's buyer. Archived partners are kept for history but can no
//! longer transact.

pub mod partner;

pub use partner::{
    ArchivePartner, ContactInfo, Partner, PartnerCommand, PartnerEvent, PartnerId, PartnerKind,
    PartnerStatus, RegisterPartner, UpdateContact,
};
