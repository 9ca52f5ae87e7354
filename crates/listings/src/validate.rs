//! Stateless validation predicates.
//!
//! Every mutating operation runs the relevant predicates before any event is
//! emitted, so a failed check leaves the aggregate untouched. Each predicate
//! maps to exactly one [`DomainError`] kind.

use estateflow_core::{DomainError, DomainResult};

use crate::offer::{Offer, OfferStatus};
use crate::property::PropertyState;

/// Minimum selling price, as a fraction of the expected price.
pub const SELLING_PRICE_FLOOR: f64 = 0.90;

/// Tolerance absorbing float rounding at exact price boundaries.
const PRICE_TOLERANCE: f64 = 1e-6;

/// Prices (expected price, offer price) must be strictly positive.
pub fn ensure_positive_price(price: f64, field: &str) -> DomainResult<()> {
    if price > 0.0 {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "{field} must be strictly positive"
        )))
    }
}

/// Monotonic floor: a new offer may not undercut the lowest existing offer.
pub fn ensure_offer_floor(price: f64, offers: &[Offer]) -> DomainResult<()> {
    let floor = offers
        .iter()
        .map(|o| o.price)
        .fold(f64::INFINITY, f64::min);

    if offers.is_empty() || price - floor >= -PRICE_TOLERANCE {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "offer of {price:.2} is below the current floor of {floor:.2}"
        )))
    }
}

/// A sale may not close below 90% of the expected price.
pub fn ensure_selling_floor(selling_price: f64, expected_price: f64) -> DomainResult<()> {
    let floor = expected_price * SELLING_PRICE_FLOOR;
    if selling_price - floor >= -PRICE_TOLERANCE {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "selling price {selling_price:.2} is below 90% of the expected price ({floor:.2})"
        )))
    }
}

/// At most one offer per property may be accepted.
pub fn ensure_no_accepted_offer(offers: &[Offer]) -> DomainResult<()> {
    if offers.iter().any(|o| o.status == OfferStatus::Accepted) {
        Err(DomainError::conflict("an offer has already been accepted"))
    } else {
        Ok(())
    }
}

/// New offers are only taken while the property is on the market.
pub fn ensure_open_for_offers(state: PropertyState) -> DomainResult<()> {
    match state {
        PropertyState::New | PropertyState::OfferReceived => Ok(()),
        PropertyState::OfferAccepted => Err(DomainError::state(
            "properties with an accepted offer cannot take new offers",
        )),
        PropertyState::Sold => Err(DomainError::state("sold properties cannot take new offers")),
        PropertyState::Canceled => Err(DomainError::state(
            "canceled properties cannot take new offers",
        )),
    }
}

/// Only new or canceled properties can be deleted.
pub fn ensure_deletable(state: PropertyState) -> DomainResult<()> {
    match state {
        PropertyState::New | PropertyState::Canceled => Ok(()),
        _ => Err(DomainError::state(
            "only new or canceled properties can be deleted",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use estateflow_core::AggregateId;
    use estateflow_parties::PartnerId;

    use crate::offer::OfferId;

    fn offer(price: f64, status: OfferStatus) -> Offer {
        Offer {
            id: OfferId::new(AggregateId::new()),
            partner_id: PartnerId::new(AggregateId::new()),
            price,
            status,
            validity_days: 7,
            created_at: Utc::now(),
            property_type: None,
        }
    }

    #[test]
    fn zero_and_negative_prices_are_rejected() {
        assert!(ensure_positive_price(1.0, "price").is_ok());
        assert!(matches!(
            ensure_positive_price(0.0, "price"),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            ensure_positive_price(-5.0, "price"),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn offer_floor_tracks_the_lowest_existing_offer() {
        let offers = vec![
            offer(290_000.0, OfferStatus::Pending),
            offer(310_000.0, OfferStatus::Pending),
        ];

        assert!(ensure_offer_floor(290_000.0, &offers).is_ok());
        assert!(ensure_offer_floor(295_000.0, &offers).is_ok());
        assert!(matches!(
            ensure_offer_floor(250_000.0, &offers),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn first_offer_has_no_floor() {
        assert!(ensure_offer_floor(1.0, &[]).is_ok());
    }

    #[test]
    fn selling_floor_is_ninety_percent_of_expected() {
        assert!(ensure_selling_floor(270_000.0, 300_000.0).is_ok());
        assert!(ensure_selling_floor(290_000.0, 300_000.0).is_ok());
        assert!(matches!(
            ensure_selling_floor(269_999.0, 300_000.0),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn accepted_offer_blocks_further_acceptance() {
        let offers = vec![
            offer(290_000.0, OfferStatus::Accepted),
            offer(310_000.0, OfferStatus::Pending),
        ];
        assert!(matches!(
            ensure_no_accepted_offer(&offers),
            Err(DomainError::Conflict(_))
        ));

        let only_refused = vec![offer(290_000.0, OfferStatus::Refused)];
        assert!(ensure_no_accepted_offer(&only_refused).is_ok());
    }

    #[test]
    fn offers_only_while_on_the_market() {
        assert!(ensure_open_for_offers(PropertyState::New).is_ok());
        assert!(ensure_open_for_offers(PropertyState::OfferReceived).is_ok());
        for state in [
            PropertyState::OfferAccepted,
            PropertyState::Sold,
            PropertyState::Canceled,
        ] {
            assert!(matches!(
                ensure_open_for_offers(state),
                Err(DomainError::State(_))
            ));
        }
    }

    #[test]
    fn deletion_allowed_only_for_new_and_canceled() {
        assert!(ensure_deletable(PropertyState::New).is_ok());
        assert!(ensure_deletable(PropertyState::Canceled).is_ok());
        for state in [
            PropertyState::OfferReceived,
            PropertyState::OfferAccepted,
            PropertyState::Sold,
        ] {
            assert!(matches!(
                ensure_deletable(state),
                Err(DomainError::State(_))
            ));
        }
    }
}
