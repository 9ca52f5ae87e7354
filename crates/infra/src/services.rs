//! Application services: the public face of the lifecycle engine.
//!
//! [`EstateService`] wires the aggregates to the event store and bus and
//! exposes one method per lifecycle operation. Every method stamps its
//! command with the injected [`Clock`] and dispatches it as a single atomic
//! unit; nothing here mutates entity state directly.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use estateflow_billing::{Invoice, InvoiceCommand, InvoiceId, InvoiceLine, IssueInvoice, VoidInvoice};
use estateflow_catalog::{Catalog, PropertyTypeId, TagId};
use estateflow_core::{Aggregate, AggregateId, AggregateRoot, UserId};
use estateflow_events::{EventBus, EventEnvelope};
use estateflow_listings::{
    AcceptOffer, ArchiveProperty, AssignPropertyType, CancelProperty, DEFAULT_VALIDITY_DAYS,
    DeleteProperty, ListProperty, MakeOffer, MarkSold, OfferId, Property, PropertyCommand,
    PropertyDetails, PropertyId, RefuseOffer, RescheduleOffer, RestoreProperty, UpdateDetails,
    WithdrawOffer,
};
use estateflow_parties::{
    ArchivePartner, ContactInfo, Partner, PartnerCommand, PartnerId, PartnerKind, RegisterPartner,
};

use crate::clock::Clock;
use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::{EventStore, StoredEvent};
use crate::projections::OfferIndex;

pub const PROPERTY_AGGREGATE_TYPE: &str = "estate.property";
pub const PARTNER_AGGREGATE_TYPE: &str = "parties.partner";
pub const INVOICE_AGGREGATE_TYPE: &str = "billing.invoice";

/// Input for creating a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProperty {
    pub name: String,
    pub expected_price: f64,
    pub details: PropertyDetails,
    pub property_type_id: Option<PropertyTypeId>,
    pub tag_ids: Vec<TagId>,
    /// When None, availability defaults to three months after listing.
    pub date_availability: Option<chrono::NaiveDate>,
}

impl NewProperty {
    pub fn new(name: impl Into<String>, expected_price: f64) -> Self {
        Self {
            name: name.into(),
            expected_price,
            details: PropertyDetails::default(),
            property_type_id: None,
            tag_ids: Vec::new(),
            date_availability: None,
        }
    }
}

/// A partial update of a listing; omitted fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyPatch {
    pub name: Option<String>,
    pub expected_price: Option<f64>,
    pub details: Option<PropertyDetails>,
    pub tag_ids: Option<Vec<TagId>>,
}

/// The property/offer lifecycle service.
///
/// Holds the command dispatcher, the business clock, the reference-data
/// catalog, and the offer→property index that resolves offer-level calls to
/// their owning aggregate stream.
pub struct EstateService<S, B, C> {
    dispatcher: CommandDispatcher<Arc<S>, Arc<B>>,
    clock: C,
    catalog: Arc<Catalog>,
    offer_index: OfferIndex,
}

impl<S, B, C> EstateService<S, B, C>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    C: Clock,
{
    pub fn new(store: Arc<S>, bus: Arc<B>, clock: C, catalog: Arc<Catalog>) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            clock,
            catalog,
            offer_index: OfferIndex::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // ----- partners -----

    pub fn register_partner(
        &self,
        kind: PartnerKind,
        name: impl Into<String>,
        contact: Option<ContactInfo>,
    ) -> Result<PartnerId, DispatchError> {
        let partner_id = PartnerId::new(AggregateId::new());
        let cmd = RegisterPartner {
            partner_id,
            kind,
            name: name.into(),
            contact,
            occurred_at: self.clock.now(),
        };
        self.dispatch_partner(partner_id, PartnerCommand::RegisterPartner(cmd))?;
        Ok(partner_id)
    }

    pub fn archive_partner(&self, partner_id: PartnerId) -> Result<(), DispatchError> {
        let cmd = ArchivePartner {
            partner_id,
            occurred_at: self.clock.now(),
        };
        self.dispatch_partner(partner_id, PartnerCommand::ArchivePartner(cmd))?;
        Ok(())
    }

    /// Rehydrated partner state.
    pub fn partner(&self, partner_id: PartnerId) -> Result<Partner, DispatchError> {
        self.load_partner(partner_id)
    }

    // ----- properties -----

    /// List a new property for sale. The acting salesperson is an explicit
    /// parameter; garden defaults are normalized before the command is built.
    pub fn create_property(
        &self,
        salesperson: UserId,
        mut input: NewProperty,
    ) -> Result<PropertyId, DispatchError> {
        self.ensure_catalog_refs(input.property_type_id, &input.tag_ids)?;
        input.details.normalize_garden();

        let property_id = PropertyId::new(AggregateId::new());
        let cmd = ListProperty {
            property_id,
            name: input.name,
            expected_price: input.expected_price,
            details: input.details,
            property_type_id: input.property_type_id,
            tag_ids: input.tag_ids,
            salesperson_id: salesperson,
            date_availability: input.date_availability,
            occurred_at: self.clock.now(),
        };
        self.dispatch_property(property_id, PropertyCommand::ListProperty(cmd))?;
        tracing::debug!(property = %property_id, "property listed");
        Ok(property_id)
    }

    pub fn update_property(
        &self,
        property_id: PropertyId,
        mut patch: PropertyPatch,
    ) -> Result<(), DispatchError> {
        if let Some(tag_ids) = &patch.tag_ids {
            self.ensure_catalog_refs(None, tag_ids)?;
        }
        if let Some(details) = &mut patch.details {
            details.normalize_garden();
        }

        let cmd = UpdateDetails {
            property_id,
            name: patch.name,
            expected_price: patch.expected_price,
            details: patch.details,
            tag_ids: patch.tag_ids,
            occurred_at: self.clock.now(),
        };
        self.dispatch_property(property_id, PropertyCommand::UpdateDetails(cmd))?;
        Ok(())
    }

    pub fn assign_property_type(
        &self,
        property_id: PropertyId,
        property_type_id: Option<PropertyTypeId>,
    ) -> Result<(), DispatchError> {
        self.ensure_catalog_refs(property_type_id, &[])?;
        let cmd = AssignPropertyType {
            property_id,
            property_type_id,
            occurred_at: self.clock.now(),
        };
        self.dispatch_property(property_id, PropertyCommand::AssignPropertyType(cmd))?;
        Ok(())
    }

    /// Rehydrated property state (NotFound once deleted).
    pub fn property(&self, property_id: PropertyId) -> Result<Property, DispatchError> {
        self.load_property(property_id)
    }

    // ----- offers -----

    /// Submit an offer on a property. The partner must exist and be active;
    /// validity defaults to seven days.
    pub fn create_offer(
        &self,
        property_id: PropertyId,
        partner_id: PartnerId,
        price: f64,
        validity_days: Option<u32>,
    ) -> Result<OfferId, DispatchError> {
        let partner = self.load_partner(partner_id)?;
        if !partner.can_transact() {
            return Err(DispatchError::Validation(
                "archived partners cannot make offers".to_string(),
            ));
        }

        let offer_id = OfferId::new(AggregateId::new());
        let cmd = MakeOffer {
            property_id,
            offer_id,
            partner_id,
            price,
            validity_days: validity_days.unwrap_or(DEFAULT_VALIDITY_DAYS),
            occurred_at: self.clock.now(),
        };
        self.dispatch_property(property_id, PropertyCommand::MakeOffer(cmd))?;
        tracing::debug!(property = %property_id, offer = %offer_id, "offer submitted");
        Ok(offer_id)
    }

    pub fn accept_offer(&self, offer_id: OfferId) -> Result<(), DispatchError> {
        let property_id = self.owning_property(offer_id)?;
        let cmd = AcceptOffer {
            property_id,
            offer_id,
            occurred_at: self.clock.now(),
        };
        self.dispatch_property(property_id, PropertyCommand::AcceptOffer(cmd))?;
        Ok(())
    }

    /// Batch wrapper around [`Self::accept_offer`]: acceptance is an
    /// exclusive decision, so anything but a single offer is rejected.
    pub fn accept_offers(&self, offer_ids: &[OfferId]) -> Result<(), DispatchError> {
        match offer_ids {
            [offer_id] => self.accept_offer(*offer_id),
            _ => Err(DispatchError::Validation(
                "only one offer can be accepted".to_string(),
            )),
        }
    }

    pub fn refuse_offer(&self, offer_id: OfferId) -> Result<(), DispatchError> {
        let property_id = self.owning_property(offer_id)?;
        let cmd = RefuseOffer {
            property_id,
            offer_id,
            occurred_at: self.clock.now(),
        };
        self.dispatch_property(property_id, PropertyCommand::RefuseOffer(cmd))?;
        Ok(())
    }

    pub fn withdraw_offer(&self, offer_id: OfferId) -> Result<(), DispatchError> {
        let property_id = self.owning_property(offer_id)?;
        let cmd = WithdrawOffer {
            property_id,
            offer_id,
            occurred_at: self.clock.now(),
        };
        self.dispatch_property(property_id, PropertyCommand::WithdrawOffer(cmd))?;
        Ok(())
    }

    /// Move an offer's deadline; its stored validity is recomputed from the
    /// new date.
    pub fn reschedule_offer(
        &self,
        offer_id: OfferId,
        date_deadline: chrono::NaiveDate,
    ) -> Result<(), DispatchError> {
        let property_id = self.owning_property(offer_id)?;
        let cmd = RescheduleOffer {
            property_id,
            offer_id,
            date_deadline,
            occurred_at: self.clock.now(),
        };
        self.dispatch_property(property_id, PropertyCommand::RescheduleOffer(cmd))?;
        Ok(())
    }

    // ----- lifecycle -----

    /// Close the sale. When a buyer is set, the commission + administrative
    /// fee invoice is issued first and the transition is committed after it;
    /// if the commit then fails, the invoice is voided again so the two
    /// stay consistent as one unit.
    pub fn mark_sold(&self, property_id: PropertyId) -> Result<Option<InvoiceId>, DispatchError> {
        let property = self.load_property(property_id)?;
        let cmd = PropertyCommand::MarkSold(MarkSold {
            property_id,
            occurred_at: self.clock.now(),
        });

        // Run the transition guards before issuing anything, so no invoice
        // is created for a sale that can never commit.
        property.handle(&cmd).map_err(DispatchError::from)?;

        let invoice_id = match property.buyer() {
            Some(buyer) => {
                let invoice_id = InvoiceId::new(AggregateId::new());
                let issue = IssueInvoice {
                    invoice_id,
                    buyer,
                    property_id,
                    lines: vec![
                        InvoiceLine::commission(property.selling_price()),
                        InvoiceLine::administrative_fee(),
                    ],
                    occurred_at: self.clock.now(),
                };
                self.dispatch_invoice(invoice_id, InvoiceCommand::IssueInvoice(issue))?;
                Some(invoice_id)
            }
            None => None,
        };

        match self.dispatch_property(property_id, cmd) {
            Ok(_) => {
                tracing::info!(property = %property_id, invoice = ?invoice_id, "property sold");
                Ok(invoice_id)
            }
            Err(err) => {
                // The sale did not commit: take the freshly issued invoice
                // back out of circulation.
                if let Some(invoice_id) = invoice_id {
                    let void = VoidInvoice {
                        invoice_id,
                        reason: Some("sale did not commit".to_string()),
                        occurred_at: self.clock.now(),
                    };
                    if let Err(void_err) =
                        self.dispatch_invoice(invoice_id, InvoiceCommand::VoidInvoice(void))
                    {
                        tracing::warn!(
                            invoice = %invoice_id,
                            error = ?void_err,
                            "failed to void invoice after aborted sale"
                        );
                    }
                }
                Err(err)
            }
        }
    }

    /// Batch variant: guards apply per record; the first violation aborts
    /// the call, already-committed records stand.
    pub fn mark_sold_many(
        &self,
        property_ids: &[PropertyId],
    ) -> Result<Vec<Option<InvoiceId>>, DispatchError> {
        let mut invoices = Vec::with_capacity(property_ids.len());
        for property_id in property_ids {
            invoices.push(self.mark_sold(*property_id)?);
        }
        Ok(invoices)
    }

    pub fn cancel_property(&self, property_id: PropertyId) -> Result<(), DispatchError> {
        let cmd = CancelProperty {
            property_id,
            occurred_at: self.clock.now(),
        };
        self.dispatch_property(property_id, PropertyCommand::CancelProperty(cmd))?;
        Ok(())
    }

    /// Batch variant of [`Self::cancel_property`] with the same per-record
    /// guard semantics as [`Self::mark_sold_many`].
    pub fn cancel_many(&self, property_ids: &[PropertyId]) -> Result<(), DispatchError> {
        for property_id in property_ids {
            self.cancel_property(*property_id)?;
        }
        Ok(())
    }

    pub fn archive_property(&self, property_id: PropertyId) -> Result<(), DispatchError> {
        let cmd = ArchiveProperty {
            property_id,
            occurred_at: self.clock.now(),
        };
        self.dispatch_property(property_id, PropertyCommand::ArchiveProperty(cmd))?;
        Ok(())
    }

    pub fn restore_property(&self, property_id: PropertyId) -> Result<(), DispatchError> {
        let cmd = RestoreProperty {
            property_id,
            occurred_at: self.clock.now(),
        };
        self.dispatch_property(property_id, PropertyCommand::RestoreProperty(cmd))?;
        Ok(())
    }

    pub fn delete_property(&self, property_id: PropertyId) -> Result<(), DispatchError> {
        let cmd = DeleteProperty {
            property_id,
            occurred_at: self.clock.now(),
        };
        self.dispatch_property(property_id, PropertyCommand::DeleteProperty(cmd))?;
        Ok(())
    }

    // ----- billing -----

    /// Rehydrated invoice state.
    pub fn invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, DispatchError> {
        let invoice: Invoice = self
            .dispatcher
            .rehydrate(invoice_id.0, |id| Invoice::empty(InvoiceId::new(id)))?;
        if invoice.version() == 0 {
            return Err(DispatchError::NotFound);
        }
        Ok(invoice)
    }

    // ----- internals -----

    fn dispatch_property(
        &self,
        property_id: PropertyId,
        command: PropertyCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        let committed = self.dispatcher.dispatch(
            property_id.0,
            PROPERTY_AGGREGATE_TYPE,
            command,
            |id| Property::empty(PropertyId::new(id)),
        )?;
        // Keep the offer index in step with what was just committed.
        for stored in &committed {
            self.offer_index.apply_envelope(&stored.to_envelope());
        }
        Ok(committed)
    }

    fn dispatch_partner(
        &self,
        partner_id: PartnerId,
        command: PartnerCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher
            .dispatch(partner_id.0, PARTNER_AGGREGATE_TYPE, command, |id| {
                Partner::empty(PartnerId::new(id))
            })
    }

    fn dispatch_invoice(
        &self,
        invoice_id: InvoiceId,
        command: InvoiceCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher
            .dispatch(invoice_id.0, INVOICE_AGGREGATE_TYPE, command, |id| {
                Invoice::empty(InvoiceId::new(id))
            })
    }

    fn load_property(&self, property_id: PropertyId) -> Result<Property, DispatchError> {
        let property: Property = self
            .dispatcher
            .rehydrate(property_id.0, |id| Property::empty(PropertyId::new(id)))?;
        if property.version() == 0 || property.is_deleted() {
            return Err(DispatchError::NotFound);
        }
        Ok(property)
    }

    fn load_partner(&self, partner_id: PartnerId) -> Result<Partner, DispatchError> {
        let partner: Partner = self
            .dispatcher
            .rehydrate(partner_id.0, |id| Partner::empty(PartnerId::new(id)))?;
        if partner.version() == 0 {
            return Err(DispatchError::NotFound);
        }
        Ok(partner)
    }

    fn owning_property(&self, offer_id: OfferId) -> Result<PropertyId, DispatchError> {
        self.offer_index
            .property_of(offer_id)
            .ok_or(DispatchError::NotFound)
    }

    fn ensure_catalog_refs(
        &self,
        property_type_id: Option<PropertyTypeId>,
        tag_ids: &[TagId],
    ) -> Result<(), DispatchError> {
        if let Some(type_id) = property_type_id {
            if !self.catalog.contains_property_type(type_id) {
                return Err(DispatchError::NotFound);
            }
        }
        for tag_id in tag_ids {
            if !self.catalog.contains_tag(*tag_id) {
                return Err(DispatchError::NotFound);
            }
        }
        Ok(())
    }
}
