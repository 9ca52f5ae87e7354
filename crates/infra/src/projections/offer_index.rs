use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use estateflow_events::EventEnvelope;
use estateflow_listings::{OfferId, PropertyEvent, PropertyId};

use crate::services::PROPERTY_AGGREGATE_TYPE;

/// Maps offer ids to their owning property.
///
/// Offers live inside their property's aggregate stream, but the public API
/// addresses them by offer id alone; this index resolves the owning stream.
/// Disposable: it can be rebuilt by replaying property envelopes, and
/// re-applying an envelope is a no-op.
#[derive(Debug, Default)]
pub struct OfferIndex {
    inner: RwLock<HashMap<OfferId, PropertyId>>,
}

impl OfferIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property_of(&self, offer_id: OfferId) -> Option<PropertyId> {
        self.inner.read().ok()?.get(&offer_id).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) {
        if envelope.aggregate_type() != PROPERTY_AGGREGATE_TYPE {
            return;
        }
        // Envelopes carrying non-offer events simply don't match below.
        if let Ok(event) = serde_json::from_value::<PropertyEvent>(envelope.payload().clone()) {
            self.apply(&event);
        }
    }

    pub fn apply(&self, event: &PropertyEvent) {
        let Ok(mut map) = self.inner.write() else {
            return;
        };

        match event {
            PropertyEvent::OfferMade(e) => {
                map.insert(e.offer_id, e.property_id);
            }
            PropertyEvent::OfferWithdrawn(e) => {
                map.remove(&e.offer_id);
            }
            PropertyEvent::PropertyDeleted(e) => {
                map.retain(|_, property_id| *property_id != e.property_id);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use estateflow_core::AggregateId;
    use estateflow_parties::PartnerId;

    fn offer_made(property_id: PropertyId, offer_id: OfferId) -> PropertyEvent {
        PropertyEvent::OfferMade(estateflow_listings::property::OfferMade {
            property_id,
            offer_id,
            partner_id: PartnerId::new(AggregateId::new()),
            price: 290_000.0,
            validity_days: 7,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn tracks_offer_ownership() {
        let index = OfferIndex::new();
        let property_id = PropertyId::new(AggregateId::new());
        let offer_id = OfferId::new(AggregateId::new());

        index.apply(&offer_made(property_id, offer_id));
        assert_eq!(index.property_of(offer_id), Some(property_id));

        index.apply(&PropertyEvent::OfferWithdrawn(
            estateflow_listings::property::OfferWithdrawn {
                property_id,
                offer_id,
                occurred_at: Utc::now(),
            },
        ));
        assert_eq!(index.property_of(offer_id), None);
    }

    #[test]
    fn deleting_a_property_drops_all_its_offers() {
        let index = OfferIndex::new();
        let property_id = PropertyId::new(AggregateId::new());
        let other_property = PropertyId::new(AggregateId::new());
        let offer_a = OfferId::new(AggregateId::new());
        let offer_b = OfferId::new(AggregateId::new());
        let offer_c = OfferId::new(AggregateId::new());

        index.apply(&offer_made(property_id, offer_a));
        index.apply(&offer_made(property_id, offer_b));
        index.apply(&offer_made(other_property, offer_c));

        index.apply(&PropertyEvent::PropertyDeleted(
            estateflow_listings::property::PropertyDeleted {
                property_id,
                occurred_at: Utc::now(),
            },
        ));

        assert_eq!(index.property_of(offer_a), None);
        assert_eq!(index.property_of(offer_b), None);
        assert_eq!(index.property_of(offer_c), Some(other_property));
    }

    #[test]
    fn applying_the_same_event_twice_is_idempotent() {
        let index = OfferIndex::new();
        let property_id = PropertyId::new(AggregateId::new());
        let offer_id = OfferId::new(AggregateId::new());
        let event = offer_made(property_id, offer_id);

        index.apply(&event);
        index.apply(&event);

        assert_eq!(index.len(), 1);
        assert_eq!(index.property_of(offer_id), Some(property_id));
    }
}
