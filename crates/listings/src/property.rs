use std::collections::HashSet;

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use estateflow_catalog::{PropertyTypeId, TagId};
use estateflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId, ValueObject};
use estateflow_events::Event;
use estateflow_parties::PartnerId;

use crate::offer::{Offer, OfferId, OfferStatus, compute_validity};
use crate::validate;

/// Property identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub AggregateId);

impl PropertyId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PropertyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Property status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyState {
    New,
    OfferReceived,
    OfferAccepted,
    Sold,
    Canceled,
}

/// Compass orientation of the garden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GardenOrientation {
    North,
    South,
    East,
    West,
}

/// Months between listing and the default availability date.
pub const AVAILABILITY_DELAY_MONTHS: u32 = 3;

/// Garden surface pre-filled when the garden flag is switched on.
pub const DEFAULT_GARDEN_AREA: u32 = 10;

/// Default availability: three months after the listing date.
pub fn default_availability(listed_on: NaiveDate) -> NaiveDate {
    listed_on
        .checked_add_months(Months::new(AVAILABILITY_DELAY_MONTHS))
        .unwrap_or(NaiveDate::MAX)
}

/// Descriptive fields of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDetails {
    pub postcode: Option<String>,
    pub description: Option<String>,
    pub bedrooms: u32,
    pub living_area: u32,
    pub facades: u32,
    pub garage: bool,
    pub garden: bool,
    pub garden_area: u32,
    pub garden_orientation: Option<GardenOrientation>,
}

impl Default for PropertyDetails {
    fn default() -> Self {
        Self {
            postcode: None,
            description: None,
            bedrooms: 2,
            living_area: 0,
            facades: 0,
            garage: false,
            garden: false,
            garden_area: 0,
            garden_orientation: None,
        }
    }
}

impl PropertyDetails {
    /// Edit-time garden defaulting: switching the garden on pre-fills a
    /// 10 m² north-facing garden, switching it off clears both fields.
    ///
    /// Advisory only — callers may override the pre-filled values before
    /// submitting, and nothing re-checks them afterwards.
    pub fn normalize_garden(&mut self) {
        if self.garden {
            if self.garden_area == 0 {
                self.garden_area = DEFAULT_GARDEN_AREA;
            }
            if self.garden_orientation.is_none() {
                self.garden_orientation = Some(GardenOrientation::North);
            }
        } else {
            self.garden_area = 0;
            self.garden_orientation = None;
        }
    }

    pub fn total_area(&self) -> u32 {
        self.living_area + self.garden_area
    }
}

impl ValueObject for PropertyDetails {}

/// Aggregate root: a property and its offers.
///
/// The offer collection lives inside the aggregate, so the single-accepted-
/// offer rule and the derived `best_offer` are decided under one optimistic
/// version.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    id: PropertyId,
    name: String,
    active: bool,
    state: PropertyState,
    details: PropertyDetails,
    total_area: u32,
    expected_price: f64,
    selling_price: f64,
    best_offer: f64,
    date_availability: Option<NaiveDate>,
    salesperson: Option<UserId>,
    buyer: Option<PartnerId>,
    property_type: Option<PropertyTypeId>,
    tags: HashSet<TagId>,
    offers: Vec<Offer>,
    version: u64,
    created: bool,
    deleted: bool,
}

impl Property {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PropertyId) -> Self {
        Self {
            id,
            name: String::new(),
            active: true,
            state: PropertyState::New,
            details: PropertyDetails::default(),
            total_area: 0,
            expected_price: 0.0,
            selling_price: 0.0,
            best_offer: 0.0,
            date_availability: None,
            salesperson: None,
            buyer: None,
            property_type: None,
            tags: HashSet::new(),
            offers: Vec::new(),
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> PropertyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn state(&self) -> PropertyState {
        self.state
    }

    pub fn details(&self) -> &PropertyDetails {
        &self.details
    }

    /// Living area + garden area, kept consistent with `details`.
    pub fn total_area(&self) -> u32 {
        self.total_area
    }

    pub fn expected_price(&self) -> f64 {
        self.expected_price
    }

    pub fn selling_price(&self) -> f64 {
        self.selling_price
    }

    /// Highest offer price, 0 when there are no offers.
    pub fn best_offer(&self) -> f64 {
        self.best_offer
    }

    pub fn date_availability(&self) -> Option<NaiveDate> {
        self.date_availability
    }

    pub fn salesperson(&self) -> Option<UserId> {
        self.salesperson
    }

    pub fn buyer(&self) -> Option<PartnerId> {
        self.buyer
    }

    pub fn property_type(&self) -> Option<PropertyTypeId> {
        self.property_type
    }

    pub fn tags(&self) -> &HashSet<TagId> {
        &self.tags
    }

    pub fn offers(&self) -> &[Offer] {
        &self.offers
    }

    pub fn offer(&self, offer_id: OfferId) -> Option<&Offer> {
        self.offers.iter().find(|o| o.id == offer_id)
    }

    pub fn accepted_offer(&self) -> Option<&Offer> {
        self.offers.iter().find(|o| o.is_accepted())
    }

    fn highest_offer(offers: &[Offer]) -> f64 {
        offers.iter().map(|o| o.price).fold(0.0, f64::max)
    }
}

impl AggregateRoot for Property {
    type Id = PropertyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: ListProperty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListProperty {
    pub property_id: PropertyId,
    pub name: String,
    pub expected_price: f64,
    pub details: PropertyDetails,
    pub property_type_id: Option<PropertyTypeId>,
    pub tag_ids: Vec<TagId>,
    pub salesperson_id: UserId,
    /// When None, availability defaults to three months after listing.
    pub date_availability: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDetails. Omitted fields keep their current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub property_id: PropertyId,
    pub name: Option<String>,
    pub expected_price: Option<f64>,
    pub details: Option<PropertyDetails>,
    pub tag_ids: Option<Vec<TagId>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignPropertyType.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignPropertyType {
    pub property_id: PropertyId,
    pub property_type_id: Option<PropertyTypeId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MakeOffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeOffer {
    pub property_id: PropertyId,
    pub offer_id: OfferId,
    pub partner_id: PartnerId,
    pub price: f64,
    pub validity_days: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: WithdrawOffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawOffer {
    pub property_id: PropertyId,
    pub offer_id: OfferId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AcceptOffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptOffer {
    pub property_id: PropertyId,
    pub offer_id: OfferId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RefuseOffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefuseOffer {
    pub property_id: PropertyId,
    pub offer_id: OfferId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RescheduleOffer — set an absolute deadline; the stored validity
/// is recomputed from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescheduleOffer {
    pub property_id: PropertyId,
    pub offer_id: OfferId,
    pub date_deadline: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkSold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkSold {
    pub property_id: PropertyId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelProperty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelProperty {
    pub property_id: PropertyId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ArchiveProperty (soft delete).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveProperty {
    pub property_id: PropertyId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RestoreProperty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreProperty {
    pub property_id: PropertyId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteProperty (hard delete, guarded by state).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteProperty {
    pub property_id: PropertyId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyCommand {
    ListProperty(ListProperty),
    UpdateDetails(UpdateDetails),
    AssignPropertyType(AssignPropertyType),
    MakeOffer(MakeOffer),
    WithdrawOffer(WithdrawOffer),
    AcceptOffer(AcceptOffer),
    RefuseOffer(RefuseOffer),
    RescheduleOffer(RescheduleOffer),
    MarkSold(MarkSold),
    CancelProperty(CancelProperty),
    ArchiveProperty(ArchiveProperty),
    RestoreProperty(RestoreProperty),
    DeleteProperty(DeleteProperty),
}

/// Event: PropertyListed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyListed {
    pub property_id: PropertyId,
    pub name: String,
    pub expected_price: f64,
    pub details: PropertyDetails,
    pub property_type_id: Option<PropertyTypeId>,
    pub tag_ids: Vec<TagId>,
    pub salesperson_id: UserId,
    pub date_availability: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PropertyDetailsUpdated (carries the resolved values).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDetailsUpdated {
    pub property_id: PropertyId,
    pub name: String,
    pub expected_price: f64,
    pub details: PropertyDetails,
    pub tag_ids: Vec<TagId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PropertyTypeAssigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyTypeAssigned {
    pub property_id: PropertyId,
    pub property_type_id: Option<PropertyTypeId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OfferMade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferMade {
    pub property_id: PropertyId,
    pub offer_id: OfferId,
    pub partner_id: PartnerId,
    pub price: f64,
    pub validity_days: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OfferWithdrawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferWithdrawn {
    pub property_id: PropertyId,
    pub offer_id: OfferId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OfferAccepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferAccepted {
    pub property_id: PropertyId,
    pub offer_id: OfferId,
    pub partner_id: PartnerId,
    pub price: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OfferRefused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferRefused {
    pub property_id: PropertyId,
    pub offer_id: OfferId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OfferRescheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferRescheduled {
    pub property_id: PropertyId,
    pub offer_id: OfferId,
    pub validity_days: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PropertySold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySold {
    pub property_id: PropertyId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PropertyCanceled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyCanceled {
    pub property_id: PropertyId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PropertyArchived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyArchived {
    pub property_id: PropertyId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PropertyRestored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRestored {
    pub property_id: PropertyId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PropertyDeleted (terminal tombstone).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDeleted {
    pub property_id: PropertyId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyEvent {
    PropertyListed(PropertyListed),
    PropertyDetailsUpdated(PropertyDetailsUpdated),
    PropertyTypeAssigned(PropertyTypeAssigned),
    OfferMade(OfferMade),
    OfferWithdrawn(OfferWithdrawn),
    OfferAccepted(OfferAccepted),
    OfferRefused(OfferRefused),
    OfferRescheduled(OfferRescheduled),
    PropertySold(PropertySold),
    PropertyCanceled(PropertyCanceled),
    PropertyArchived(PropertyArchived),
    PropertyRestored(PropertyRestored),
    PropertyDeleted(PropertyDeleted),
}

impl Event for PropertyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PropertyEvent::PropertyListed(_) => "estate.property.listed",
            PropertyEvent::PropertyDetailsUpdated(_) => "estate.property.details_updated",
            PropertyEvent::PropertyTypeAssigned(_) => "estate.property.type_assigned",
            PropertyEvent::OfferMade(_) => "estate.property.offer_made",
            PropertyEvent::OfferWithdrawn(_) => "estate.property.offer_withdrawn",
            PropertyEvent::OfferAccepted(_) => "estate.property.offer_accepted",
            PropertyEvent::OfferRefused(_) => "estate.property.offer_refused",
            PropertyEvent::OfferRescheduled(_) => "estate.property.offer_rescheduled",
            PropertyEvent::PropertySold(_) => "estate.property.sold",
            PropertyEvent::PropertyCanceled(_) => "estate.property.canceled",
            PropertyEvent::PropertyArchived(_) => "estate.property.archived",
            PropertyEvent::PropertyRestored(_) => "estate.property.restored",
            PropertyEvent::PropertyDeleted(_) => "estate.property.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PropertyEvent::PropertyListed(e) => e.occurred_at,
            PropertyEvent::PropertyDetailsUpdated(e) => e.occurred_at,
            PropertyEvent::PropertyTypeAssigned(e) => e.occurred_at,
            PropertyEvent::OfferMade(e) => e.occurred_at,
            PropertyEvent::OfferWithdrawn(e) => e.occurred_at,
            PropertyEvent::OfferAccepted(e) => e.occurred_at,
            PropertyEvent::OfferRefused(e) => e.occurred_at,
            PropertyEvent::OfferRescheduled(e) => e.occurred_at,
            PropertyEvent::PropertySold(e) => e.occurred_at,
            PropertyEvent::PropertyCanceled(e) => e.occurred_at,
            PropertyEvent::PropertyArchived(e) => e.occurred_at,
            PropertyEvent::PropertyRestored(e) => e.occurred_at,
            PropertyEvent::PropertyDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Property {
    type Command = PropertyCommand;
    type Event = PropertyEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PropertyEvent::PropertyListed(e) => {
                self.id = e.property_id;
                self.name = e.name.clone();
                self.active = true;
                self.state = PropertyState::New;
                self.details = e.details.clone();
                self.total_area = e.details.total_area();
                self.expected_price = e.expected_price;
                self.selling_price = 0.0;
                self.best_offer = 0.0;
                self.date_availability = Some(e.date_availability);
                self.salesperson = Some(e.salesperson_id);
                self.property_type = e.property_type_id;
                self.tags = e.tag_ids.iter().copied().collect();
                self.created = true;
            }
            PropertyEvent::PropertyDetailsUpdated(e) => {
                self.name = e.name.clone();
                self.expected_price = e.expected_price;
                self.details = e.details.clone();
                self.total_area = e.details.total_area();
                self.tags = e.tag_ids.iter().copied().collect();
            }
            PropertyEvent::PropertyTypeAssigned(e) => {
                self.property_type = e.property_type_id;
                // Rewrite the denormalized mirror on every offer.
                for offer in &mut self.offers {
                    offer.property_type = e.property_type_id;
                }
            }
            PropertyEvent::OfferMade(e) => {
                self.offers.push(Offer {
                    id: e.offer_id,
                    partner_id: e.partner_id,
                    price: e.price,
                    status: OfferStatus::Pending,
                    validity_days: e.validity_days,
                    created_at: e.occurred_at,
                    property_type: self.property_type,
                });
                self.best_offer = Self::highest_offer(&self.offers);
                if self.state == PropertyState::New {
                    self.state = PropertyState::OfferReceived;
                }
            }
            PropertyEvent::OfferWithdrawn(e) => {
                self.offers.retain(|o| o.id != e.offer_id);
                self.best_offer = Self::highest_offer(&self.offers);
                if self.offers.is_empty() && self.state == PropertyState::OfferReceived {
                    self.state = PropertyState::New;
                }
            }
            PropertyEvent::OfferAccepted(e) => {
                if let Some(offer) = self.offers.iter_mut().find(|o| o.id == e.offer_id) {
                    offer.status = OfferStatus::Accepted;
                }
                self.buyer = Some(e.partner_id);
                self.selling_price = e.price;
                self.state = PropertyState::OfferAccepted;
            }
            PropertyEvent::OfferRefused(e) => {
                let was_accepted = self
                    .offer(e.offer_id)
                    .map(Offer::is_accepted)
                    .unwrap_or(false);
                if let Some(offer) = self.offers.iter_mut().find(|o| o.id == e.offer_id) {
                    offer.status = OfferStatus::Refused;
                }
                if was_accepted {
                    self.buyer = None;
                    self.selling_price = 0.0;
                    self.state = PropertyState::OfferReceived;
                }
            }
            PropertyEvent::OfferRescheduled(e) => {
                if let Some(offer) = self.offers.iter_mut().find(|o| o.id == e.offer_id) {
                    offer.validity_days = e.validity_days;
                }
            }
            PropertyEvent::PropertySold(_) => {
                self.state = PropertyState::Sold;
            }
            PropertyEvent::PropertyCanceled(_) => {
                self.state = PropertyState::Canceled;
            }
            PropertyEvent::PropertyArchived(_) => {
                self.active = false;
            }
            PropertyEvent::PropertyRestored(_) => {
                self.active = true;
            }
            PropertyEvent::PropertyDeleted(_) => {
                self.deleted = true;
                self.active = false;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PropertyCommand::ListProperty(cmd) => self.handle_list(cmd),
            PropertyCommand::UpdateDetails(cmd) => self.handle_update(cmd),
            PropertyCommand::AssignPropertyType(cmd) => self.handle_assign_type(cmd),
            PropertyCommand::MakeOffer(cmd) => self.handle_make_offer(cmd),
            PropertyCommand::WithdrawOffer(cmd) => self.handle_withdraw(cmd),
            PropertyCommand::AcceptOffer(cmd) => self.handle_accept(cmd),
            PropertyCommand::RefuseOffer(cmd) => self.handle_refuse(cmd),
            PropertyCommand::RescheduleOffer(cmd) => self.handle_reschedule(cmd),
            PropertyCommand::MarkSold(cmd) => self.handle_mark_sold(cmd),
            PropertyCommand::CancelProperty(cmd) => self.handle_cancel(cmd),
            PropertyCommand::ArchiveProperty(cmd) => self.handle_archive(cmd),
            PropertyCommand::RestoreProperty(cmd) => self.handle_restore(cmd),
            PropertyCommand::DeleteProperty(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Property {
    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_property_id(&self, property_id: PropertyId) -> Result<(), DomainError> {
        if self.id != property_id {
            return Err(DomainError::conflict("property_id mismatch"));
        }
        Ok(())
    }

    fn existing_offer(&self, offer_id: OfferId) -> Result<&Offer, DomainError> {
        self.offer(offer_id).ok_or(DomainError::NotFound)
    }

    fn handle_list(&self, cmd: &ListProperty) -> Result<Vec<PropertyEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("property already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        validate::ensure_positive_price(cmd.expected_price, "expected price")?;

        let date_availability = cmd
            .date_availability
            .unwrap_or_else(|| default_availability(cmd.occurred_at.date_naive()));

        Ok(vec![PropertyEvent::PropertyListed(PropertyListed {
            property_id: cmd.property_id,
            name: cmd.name.clone(),
            expected_price: cmd.expected_price,
            details: cmd.details.clone(),
            property_type_id: cmd.property_type_id,
            tag_ids: cmd.tag_ids.clone(),
            salesperson_id: cmd.salesperson_id,
            date_availability,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateDetails) -> Result<Vec<PropertyEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_property_id(cmd.property_id)?;

        let name = cmd.name.clone().unwrap_or_else(|| self.name.clone());
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let expected_price = cmd.expected_price.unwrap_or(self.expected_price);
        validate::ensure_positive_price(expected_price, "expected price")?;
        if self.selling_price != 0.0 {
            validate::ensure_selling_floor(self.selling_price, expected_price)?;
        }

        let details = cmd.details.clone().unwrap_or_else(|| self.details.clone());
        let tag_ids = cmd
            .tag_ids
            .clone()
            .unwrap_or_else(|| self.tags.iter().copied().collect());

        Ok(vec![PropertyEvent::PropertyDetailsUpdated(
            PropertyDetailsUpdated {
                property_id: cmd.property_id,
                name,
                expected_price,
                details,
                tag_ids,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_assign_type(
        &self,
        cmd: &AssignPropertyType,
    ) -> Result<Vec<PropertyEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_property_id(cmd.property_id)?;

        Ok(vec![PropertyEvent::PropertyTypeAssigned(
            PropertyTypeAssigned {
                property_id: cmd.property_id,
                property_type_id: cmd.property_type_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_make_offer(&self, cmd: &MakeOffer) -> Result<Vec<PropertyEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_property_id(cmd.property_id)?;

        validate::ensure_open_for_offers(self.state)?;
        validate::ensure_positive_price(cmd.price, "offer price")?;
        validate::ensure_offer_floor(cmd.price, &self.offers)?;

        if self.offer(cmd.offer_id).is_some() {
            return Err(DomainError::conflict("offer already exists"));
        }

        Ok(vec![PropertyEvent::OfferMade(OfferMade {
            property_id: cmd.property_id,
            offer_id: cmd.offer_id,
            partner_id: cmd.partner_id,
            price: cmd.price,
            validity_days: cmd.validity_days,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_withdraw(&self, cmd: &WithdrawOffer) -> Result<Vec<PropertyEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_property_id(cmd.property_id)?;

        let offer = self.existing_offer(cmd.offer_id)?;
        if offer.is_accepted() {
            return Err(DomainError::state(
                "an accepted offer cannot be withdrawn; refuse it first",
            ));
        }

        Ok(vec![PropertyEvent::OfferWithdrawn(OfferWithdrawn {
            property_id: cmd.property_id,
            offer_id: cmd.offer_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_accept(&self, cmd: &AcceptOffer) -> Result<Vec<PropertyEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_property_id(cmd.property_id)?;

        let offer = self.existing_offer(cmd.offer_id)?;

        match self.state {
            PropertyState::Sold => {
                return Err(DomainError::state(
                    "offers cannot be accepted on a sold property",
                ));
            }
            PropertyState::Canceled => {
                return Err(DomainError::state(
                    "offers cannot be accepted on a canceled property",
                ));
            }
            _ => {}
        }

        validate::ensure_no_accepted_offer(&self.offers)?;
        validate::ensure_selling_floor(offer.price, self.expected_price)?;

        Ok(vec![PropertyEvent::OfferAccepted(OfferAccepted {
            property_id: cmd.property_id,
            offer_id: cmd.offer_id,
            partner_id: offer.partner_id,
            price: offer.price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_refuse(&self, cmd: &RefuseOffer) -> Result<Vec<PropertyEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_property_id(cmd.property_id)?;

        let offer = self.existing_offer(cmd.offer_id)?;
        if offer.status == OfferStatus::Refused {
            return Err(DomainError::conflict("offer is already refused"));
        }

        Ok(vec![PropertyEvent::OfferRefused(OfferRefused {
            property_id: cmd.property_id,
            offer_id: cmd.offer_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reschedule(&self, cmd: &RescheduleOffer) -> Result<Vec<PropertyEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_property_id(cmd.property_id)?;

        let offer = self.existing_offer(cmd.offer_id)?;
        let validity_days = compute_validity(offer.created_at.date_naive(), cmd.date_deadline)?;

        Ok(vec![PropertyEvent::OfferRescheduled(OfferRescheduled {
            property_id: cmd.property_id,
            offer_id: cmd.offer_id,
            validity_days,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_sold(&self, cmd: &MarkSold) -> Result<Vec<PropertyEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_property_id(cmd.property_id)?;

        if self.state == PropertyState::Canceled {
            return Err(DomainError::state("canceled properties cannot be sold"));
        }
        if self.state == PropertyState::Sold {
            return Err(DomainError::conflict("property is already sold"));
        }

        Ok(vec![PropertyEvent::PropertySold(PropertySold {
            property_id: cmd.property_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelProperty) -> Result<Vec<PropertyEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_property_id(cmd.property_id)?;

        if self.state == PropertyState::Sold {
            return Err(DomainError::state("sold properties cannot be cancelled"));
        }
        if self.state == PropertyState::Canceled {
            return Err(DomainError::conflict("property is already canceled"));
        }

        Ok(vec![PropertyEvent::PropertyCanceled(PropertyCanceled {
            property_id: cmd.property_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_archive(&self, cmd: &ArchiveProperty) -> Result<Vec<PropertyEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_property_id(cmd.property_id)?;

        if !self.active {
            return Err(DomainError::conflict("property is already archived"));
        }

        Ok(vec![PropertyEvent::PropertyArchived(PropertyArchived {
            property_id: cmd.property_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_restore(&self, cmd: &RestoreProperty) -> Result<Vec<PropertyEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_property_id(cmd.property_id)?;

        if self.active {
            return Err(DomainError::conflict("property is not archived"));
        }

        Ok(vec![PropertyEvent::PropertyRestored(PropertyRestored {
            property_id: cmd.property_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteProperty) -> Result<Vec<PropertyEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_property_id(cmd.property_id)?;

        validate::ensure_deletable(self.state)?;

        Ok(vec![PropertyEvent::PropertyDeleted(PropertyDeleted {
            property_id: cmd.property_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_property_id() -> PropertyId {
        PropertyId::new(AggregateId::new())
    }

    fn test_offer_id() -> OfferId {
        OfferId::new(AggregateId::new())
    }

    fn test_partner_id() -> PartnerId {
        PartnerId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn apply_all(property: &mut Property, events: Vec<PropertyEvent>) {
        for event in &events {
            property.apply(event);
        }
    }

    fn listed(expected_price: f64) -> Property {
        let property_id = test_property_id();
        let mut property = Property::empty(property_id);
        let cmd = ListProperty {
            property_id,
            name: "Maison Grand-Place".to_string(),
            expected_price,
            details: PropertyDetails::default(),
            property_type_id: None,
            tag_ids: vec![],
            salesperson_id: UserId::new(),
            date_availability: None,
            occurred_at: test_time(),
        };
        let events = property
            .handle(&PropertyCommand::ListProperty(cmd))
            .unwrap();
        apply_all(&mut property, events);
        property
    }

    fn make_offer(property: &mut Property, price: f64) -> OfferId {
        let offer_id = test_offer_id();
        let cmd = MakeOffer {
            property_id: property.id_typed(),
            offer_id,
            partner_id: test_partner_id(),
            price,
            validity_days: 7,
            occurred_at: test_time(),
        };
        let events = property.handle(&PropertyCommand::MakeOffer(cmd)).unwrap();
        apply_all(property, events);
        offer_id
    }

    fn accept(property: &mut Property, offer_id: OfferId) {
        let cmd = AcceptOffer {
            property_id: property.id_typed(),
            offer_id,
            occurred_at: test_time(),
        };
        let events = property.handle(&PropertyCommand::AcceptOffer(cmd)).unwrap();
        apply_all(property, events);
    }

    #[test]
    fn list_property_starts_new_with_default_availability() {
        let property_id = test_property_id();
        let property = Property::empty(property_id);
        let listed_at = test_time();
        let cmd = ListProperty {
            property_id,
            name: "Maison Grand-Place".to_string(),
            expected_price: 300_000.0,
            details: PropertyDetails::default(),
            property_type_id: None,
            tag_ids: vec![],
            salesperson_id: UserId::new(),
            date_availability: None,
            occurred_at: listed_at,
        };

        let events = property
            .handle(&PropertyCommand::ListProperty(cmd))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            PropertyEvent::PropertyListed(e) => {
                assert_eq!(e.name, "Maison Grand-Place");
                assert_eq!(
                    e.date_availability,
                    default_availability(listed_at.date_naive())
                );
            }
            _ => panic!("Expected PropertyListed event"),
        }

        let mut property = Property::empty(property_id);
        apply_all(&mut property, events);
        assert_eq!(property.state(), PropertyState::New);
        assert!(property.is_active());
        assert_eq!(property.selling_price(), 0.0);
        assert_eq!(property.best_offer(), 0.0);
    }

    #[test]
    fn list_property_rejects_empty_name() {
        let property = Property::empty(test_property_id());
        let cmd = ListProperty {
            property_id: test_property_id(),
            name: "  ".to_string(),
            expected_price: 300_000.0,
            details: PropertyDetails::default(),
            property_type_id: None,
            tag_ids: vec![],
            salesperson_id: UserId::new(),
            date_availability: None,
            occurred_at: test_time(),
        };

        let err = property
            .handle(&PropertyCommand::ListProperty(cmd))
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty name"),
        }
    }

    #[test]
    fn list_property_rejects_non_positive_expected_price() {
        let property = Property::empty(test_property_id());
        let cmd = ListProperty {
            property_id: test_property_id(),
            name: "Maison Grand-Place".to_string(),
            expected_price: 0.0,
            details: PropertyDetails::default(),
            property_type_id: None,
            tag_ids: vec![],
            salesperson_id: UserId::new(),
            date_availability: None,
            occurred_at: test_time(),
        };

        let err = property
            .handle(&PropertyCommand::ListProperty(cmd))
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for non-positive price"),
        }
    }

    #[test]
    fn first_offer_moves_property_to_offer_received() {
        let mut property = listed(300_000.0);
        assert_eq!(property.state(), PropertyState::New);

        make_offer(&mut property, 290_000.0);

        assert_eq!(property.state(), PropertyState::OfferReceived);
        assert_eq!(property.offers().len(), 1);
        assert_eq!(property.best_offer(), 290_000.0);
    }

    #[test]
    fn offer_below_the_floor_of_existing_offers_is_rejected() {
        let mut property = listed(300_000.0);
        make_offer(&mut property, 290_000.0);

        let cmd = MakeOffer {
            property_id: property.id_typed(),
            offer_id: test_offer_id(),
            partner_id: test_partner_id(),
            price: 250_000.0,
            validity_days: 7,
            occurred_at: test_time(),
        };
        let err = property
            .handle(&PropertyCommand::MakeOffer(cmd))
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for offer below the floor"),
        }

        // The rejected offer left nothing behind.
        assert_eq!(property.offers().len(), 1);
        assert_eq!(property.best_offer(), 290_000.0);
    }

    #[test]
    fn offer_with_non_positive_price_is_rejected() {
        let property = listed(300_000.0);
        let cmd = MakeOffer {
            property_id: property.id_typed(),
            offer_id: test_offer_id(),
            partner_id: test_partner_id(),
            price: -1.0,
            validity_days: 7,
            occurred_at: test_time(),
        };

        let err = property
            .handle(&PropertyCommand::MakeOffer(cmd))
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for non-positive offer price"),
        }
    }

    #[test]
    fn offer_on_sold_property_is_rejected() {
        let mut property = listed(300_000.0);
        let events = property
            .handle(&PropertyCommand::MarkSold(MarkSold {
                property_id: property.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut property, events);

        let cmd = MakeOffer {
            property_id: property.id_typed(),
            offer_id: test_offer_id(),
            partner_id: test_partner_id(),
            price: 310_000.0,
            validity_days: 7,
            occurred_at: test_time(),
        };
        let err = property
            .handle(&PropertyCommand::MakeOffer(cmd))
            .unwrap_err();
        match err {
            DomainError::State(_) => {}
            _ => panic!("Expected State error for offer on sold property"),
        }
    }

    #[test]
    fn accept_offer_sets_buyer_selling_price_and_state() {
        let mut property = listed(300_000.0);
        let offer_id = make_offer(&mut property, 290_000.0);
        let partner_id = property.offers()[0].partner_id;

        accept(&mut property, offer_id);

        assert_eq!(property.state(), PropertyState::OfferAccepted);
        assert_eq!(property.selling_price(), 290_000.0);
        assert_eq!(property.buyer(), Some(partner_id));
        assert!(property.offer(offer_id).unwrap().is_accepted());
    }

    #[test]
    fn second_acceptance_is_a_conflict() {
        let mut property = listed(300_000.0);
        let first = make_offer(&mut property, 290_000.0);
        let second = make_offer(&mut property, 295_000.0);
        accept(&mut property, first);

        let cmd = AcceptOffer {
            property_id: property.id_typed(),
            offer_id: second,
            occurred_at: test_time(),
        };
        let err = property
            .handle(&PropertyCommand::AcceptOffer(cmd))
            .unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for second acceptance"),
        }

        // Exactly one offer remains accepted.
        let accepted = property.offers().iter().filter(|o| o.is_accepted()).count();
        assert_eq!(accepted, 1);
    }

    #[test]
    fn accepting_below_ninety_percent_of_expected_is_rejected() {
        let mut property = listed(300_000.0);
        let offer_id = make_offer(&mut property, 200_000.0);

        let cmd = AcceptOffer {
            property_id: property.id_typed(),
            offer_id,
            occurred_at: test_time(),
        };
        let err = property
            .handle(&PropertyCommand::AcceptOffer(cmd))
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for selling below 90% of expected"),
        }
        assert_eq!(property.selling_price(), 0.0);
        assert_eq!(property.buyer(), None);
    }

    #[test]
    fn refusing_the_accepted_offer_reverts_the_property() {
        let mut property = listed(300_000.0);
        let offer_id = make_offer(&mut property, 290_000.0);
        accept(&mut property, offer_id);

        let cmd = RefuseOffer {
            property_id: property.id_typed(),
            offer_id,
            occurred_at: test_time(),
        };
        let events = property.handle(&PropertyCommand::RefuseOffer(cmd)).unwrap();
        apply_all(&mut property, events);

        assert_eq!(property.state(), PropertyState::OfferReceived);
        assert_eq!(property.buyer(), None);
        assert_eq!(property.selling_price(), 0.0);
        assert_eq!(
            property.offer(offer_id).unwrap().status,
            OfferStatus::Refused
        );
    }

    #[test]
    fn refusing_another_offer_keeps_the_accepted_one() {
        let mut property = listed(300_000.0);
        let first = make_offer(&mut property, 290_000.0);
        let second = make_offer(&mut property, 295_000.0);
        accept(&mut property, second);
        let buyer = property.buyer();

        let cmd = RefuseOffer {
            property_id: property.id_typed(),
            offer_id: first,
            occurred_at: test_time(),
        };
        let events = property.handle(&PropertyCommand::RefuseOffer(cmd)).unwrap();
        apply_all(&mut property, events);

        assert_eq!(property.state(), PropertyState::OfferAccepted);
        assert_eq!(property.buyer(), buyer);
        assert_eq!(property.selling_price(), 295_000.0);
    }

    #[test]
    fn refusing_twice_is_a_conflict() {
        let mut property = listed(300_000.0);
        let offer_id = make_offer(&mut property, 290_000.0);

        let cmd = RefuseOffer {
            property_id: property.id_typed(),
            offer_id,
            occurred_at: test_time(),
        };
        let events = property
            .handle(&PropertyCommand::RefuseOffer(cmd.clone()))
            .unwrap();
        apply_all(&mut property, events);

        let err = property
            .handle(&PropertyCommand::RefuseOffer(cmd))
            .unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for refusing twice"),
        }
    }

    #[test]
    fn mark_sold_rejects_canceled_property() {
        let mut property = listed(300_000.0);
        let events = property
            .handle(&PropertyCommand::CancelProperty(CancelProperty {
                property_id: property.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut property, events);

        let err = property
            .handle(&PropertyCommand::MarkSold(MarkSold {
                property_id: property.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::State(_) => {}
            _ => panic!("Expected State error for selling a canceled property"),
        }
    }

    #[test]
    fn cancel_rejects_sold_property() {
        let mut property = listed(300_000.0);
        let events = property
            .handle(&PropertyCommand::MarkSold(MarkSold {
                property_id: property.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut property, events);

        let err = property
            .handle(&PropertyCommand::CancelProperty(CancelProperty {
                property_id: property.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::State(_) => {}
            _ => panic!("Expected State error for cancelling a sold property"),
        }
    }

    #[test]
    fn delete_rejects_property_under_offer() {
        let mut property = listed(300_000.0);
        make_offer(&mut property, 290_000.0);

        let err = property
            .handle(&PropertyCommand::DeleteProperty(DeleteProperty {
                property_id: property.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::State(_) => {}
            _ => panic!("Expected State error for deleting a property under offer"),
        }
    }

    #[test]
    fn delete_allowed_for_new_and_canceled_properties() {
        let mut property = listed(300_000.0);
        assert!(
            property
                .handle(&PropertyCommand::DeleteProperty(DeleteProperty {
                    property_id: property.id_typed(),
                    occurred_at: test_time(),
                }))
                .is_ok()
        );

        let events = property
            .handle(&PropertyCommand::CancelProperty(CancelProperty {
                property_id: property.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut property, events);
        assert!(
            property
                .handle(&PropertyCommand::DeleteProperty(DeleteProperty {
                    property_id: property.id_typed(),
                    occurred_at: test_time(),
                }))
                .is_ok()
        );
    }

    #[test]
    fn commands_after_deletion_are_not_found() {
        let mut property = listed(300_000.0);
        let events = property
            .handle(&PropertyCommand::DeleteProperty(DeleteProperty {
                property_id: property.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut property, events);
        assert!(property.is_deleted());

        let err = property
            .handle(&PropertyCommand::MarkSold(MarkSold {
                property_id: property.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::NotFound => {}
            _ => panic!("Expected NotFound after deletion"),
        }
    }

    #[test]
    fn withdrawing_the_last_offer_reverts_to_new() {
        let mut property = listed(300_000.0);
        let offer_id = make_offer(&mut property, 290_000.0);
        assert_eq!(property.state(), PropertyState::OfferReceived);

        let events = property
            .handle(&PropertyCommand::WithdrawOffer(WithdrawOffer {
                property_id: property.id_typed(),
                offer_id,
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut property, events);

        assert_eq!(property.state(), PropertyState::New);
        assert!(property.offers().is_empty());
        assert_eq!(property.best_offer(), 0.0);
    }

    #[test]
    fn accepted_offer_cannot_be_withdrawn() {
        let mut property = listed(300_000.0);
        let offer_id = make_offer(&mut property, 290_000.0);
        accept(&mut property, offer_id);

        let err = property
            .handle(&PropertyCommand::WithdrawOffer(WithdrawOffer {
                property_id: property.id_typed(),
                offer_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::State(_) => {}
            _ => panic!("Expected State error for withdrawing an accepted offer"),
        }
    }

    #[test]
    fn best_offer_tracks_additions_and_withdrawals() {
        let mut property = listed(300_000.0);
        make_offer(&mut property, 285_000.0);
        let top = make_offer(&mut property, 310_000.0);
        assert_eq!(property.best_offer(), 310_000.0);

        let events = property
            .handle(&PropertyCommand::WithdrawOffer(WithdrawOffer {
                property_id: property.id_typed(),
                offer_id: top,
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut property, events);
        assert_eq!(property.best_offer(), 285_000.0);
    }

    #[test]
    fn total_area_recomputed_on_details_update() {
        let mut property = listed(300_000.0);
        assert_eq!(property.total_area(), 0);

        let mut details = PropertyDetails {
            living_area: 120,
            garden: true,
            ..PropertyDetails::default()
        };
        details.normalize_garden();
        let events = property
            .handle(&PropertyCommand::UpdateDetails(UpdateDetails {
                property_id: property.id_typed(),
                name: None,
                expected_price: None,
                details: Some(details),
                tag_ids: None,
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut property, events);

        assert_eq!(property.total_area(), 130);
        assert_eq!(property.details().garden_area, DEFAULT_GARDEN_AREA);
        assert_eq!(
            property.details().garden_orientation,
            Some(GardenOrientation::North)
        );
    }

    #[test]
    fn garden_toggle_defaults_and_clears() {
        let mut details = PropertyDetails {
            garden: true,
            ..PropertyDetails::default()
        };
        details.normalize_garden();
        assert_eq!(details.garden_area, DEFAULT_GARDEN_AREA);
        assert_eq!(details.garden_orientation, Some(GardenOrientation::North));

        details.garden = false;
        details.normalize_garden();
        assert_eq!(details.garden_area, 0);
        assert_eq!(details.garden_orientation, None);
    }

    #[test]
    fn garden_normalization_keeps_explicit_values() {
        let mut details = PropertyDetails {
            garden: true,
            garden_area: 45,
            garden_orientation: Some(GardenOrientation::South),
            ..PropertyDetails::default()
        };
        details.normalize_garden();
        assert_eq!(details.garden_area, 45);
        assert_eq!(details.garden_orientation, Some(GardenOrientation::South));
    }

    #[test]
    fn raising_expected_price_past_the_selling_floor_is_rejected() {
        let mut property = listed(300_000.0);
        let offer_id = make_offer(&mut property, 290_000.0);
        accept(&mut property, offer_id);

        // 290_000 < 0.9 * 400_000, so the sale would break the floor.
        let err = property
            .handle(&PropertyCommand::UpdateDetails(UpdateDetails {
                property_id: property.id_typed(),
                name: None,
                expected_price: Some(400_000.0),
                details: None,
                tag_ids: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for breaking the selling floor"),
        }
    }

    #[test]
    fn assigning_a_property_type_rewrites_offer_mirrors() {
        let mut property = listed(300_000.0);
        make_offer(&mut property, 290_000.0);
        make_offer(&mut property, 295_000.0);
        assert!(property.offers().iter().all(|o| o.property_type.is_none()));

        let type_id = PropertyTypeId::new(AggregateId::new());
        let events = property
            .handle(&PropertyCommand::AssignPropertyType(AssignPropertyType {
                property_id: property.id_typed(),
                property_type_id: Some(type_id),
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut property, events);

        assert_eq!(property.property_type(), Some(type_id));
        assert!(
            property
                .offers()
                .iter()
                .all(|o| o.property_type == Some(type_id))
        );
    }

    #[test]
    fn reschedule_recomputes_validity_from_deadline() {
        let mut property = listed(300_000.0);
        let offer_id = make_offer(&mut property, 290_000.0);
        let created = property.offer(offer_id).unwrap().created_at.date_naive();
        let deadline = created + chrono::Days::new(21);

        let events = property
            .handle(&PropertyCommand::RescheduleOffer(RescheduleOffer {
                property_id: property.id_typed(),
                offer_id,
                date_deadline: deadline,
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut property, events);

        let offer = property.offer(offer_id).unwrap();
        assert_eq!(offer.validity_days, 21);
        assert_eq!(offer.date_deadline(), deadline);
    }

    #[test]
    fn reschedule_before_creation_is_rejected() {
        let mut property = listed(300_000.0);
        let offer_id = make_offer(&mut property, 290_000.0);
        let created = property.offer(offer_id).unwrap().created_at.date_naive();

        let err = property
            .handle(&PropertyCommand::RescheduleOffer(RescheduleOffer {
                property_id: property.id_typed(),
                offer_id,
                date_deadline: created - chrono::Days::new(1),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for deadline before creation"),
        }
    }

    #[test]
    fn archive_and_restore_toggle_the_active_flag() {
        let mut property = listed(300_000.0);
        assert!(property.is_active());

        let events = property
            .handle(&PropertyCommand::ArchiveProperty(ArchiveProperty {
                property_id: property.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut property, events);
        assert!(!property.is_active());

        let events = property
            .handle(&PropertyCommand::RestoreProperty(RestoreProperty {
                property_id: property.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut property, events);
        assert!(property.is_active());
    }

    #[test]
    fn version_increments_on_apply() {
        let mut property = listed(300_000.0);
        assert_eq!(property.version(), 1);

        make_offer(&mut property, 290_000.0);
        assert_eq!(property.version(), 2);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let mut property = listed(300_000.0);
        let offer_id = make_offer(&mut property, 290_000.0);
        let version_before = property.version();
        let state_before = property.state();

        let cmd = AcceptOffer {
            property_id: property.id_typed(),
            offer_id,
            occurred_at: test_time(),
        };
        let events1 = property
            .handle(&PropertyCommand::AcceptOffer(cmd.clone()))
            .unwrap();
        let events2 = property.handle(&PropertyCommand::AcceptOffer(cmd)).unwrap();

        assert_eq!(property.version(), version_before);
        assert_eq!(property.state(), state_before);
        assert_eq!(property.selling_price(), 0.0);
        assert_eq!(events1, events2);
    }

    proptest! {
        // best_offer must equal the maximum offer price after any sequence
        // of additions (ascending, so each clears the monotonic floor).
        #[test]
        fn best_offer_is_the_maximum_offer_price(
            prices in proptest::collection::vec(1_000.0f64..1_000_000.0, 1..8)
        ) {
            let mut sorted = prices;
            sorted.sort_by(f64::total_cmp);

            let mut property = listed(1_000_000.0);
            for price in &sorted {
                make_offer(&mut property, *price);
            }

            let max = sorted.last().copied().unwrap();
            prop_assert!((property.best_offer() - max).abs() < 1e-9);
            prop_assert_eq!(property.state(), PropertyState::OfferReceived);
        }
    }
}
