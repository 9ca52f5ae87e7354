//! Offers: child entities of a property.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use estateflow_catalog::PropertyTypeId;
use estateflow_core::{AggregateId, DomainError, DomainResult, Entity};
use estateflow_parties::PartnerId;

/// Days an offer stays open when the caller does not say otherwise.
pub const DEFAULT_VALIDITY_DAYS: u32 = 7;

/// Offer identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferId(pub AggregateId);

impl OfferId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OfferId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Offer decision status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    /// No decision taken yet.
    Pending,
    Accepted,
    Refused,
}

/// A buyer's bid on a property.
///
/// Offers live inside their property's aggregate; they are never mutated
/// outside the property's `apply`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub partner_id: PartnerId,
    pub price: f64,
    pub status: OfferStatus,
    pub validity_days: u32,
    /// Immutable creation timestamp (business time of the make-offer event).
    pub created_at: DateTime<Utc>,
    /// Mirror of the owning property's type, rewritten whenever it changes.
    pub property_type: Option<PropertyTypeId>,
}

impl Offer {
    /// Last day the offer is binding, derived from creation date + validity.
    pub fn date_deadline(&self) -> NaiveDate {
        compute_deadline(self.created_at.date_naive(), self.validity_days)
    }

    pub fn is_pending(&self) -> bool {
        self.status == OfferStatus::Pending
    }

    pub fn is_accepted(&self) -> bool {
        self.status == OfferStatus::Accepted
    }
}

impl Entity for Offer {
    type Id = OfferId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Deadline from creation date and a day count.
pub fn compute_deadline(created: NaiveDate, validity_days: u32) -> NaiveDate {
    created
        .checked_add_days(Days::new(u64::from(validity_days)))
        .unwrap_or(NaiveDate::MAX)
}

/// Inverse of [`compute_deadline`]: day count from creation date and an
/// absolute deadline. A deadline before the creation date is a caller error.
pub fn compute_validity(created: NaiveDate, deadline: NaiveDate) -> DomainResult<u32> {
    let days = (deadline - created).num_days();
    if days < 0 {
        return Err(DomainError::validation(
            "deadline cannot precede the offer's creation date",
        ));
    }
    Ok(days as u32)
}
