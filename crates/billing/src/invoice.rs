use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use estateflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use estateflow_events::Event;
use estateflow_listings::PropertyId;
use estateflow_parties::PartnerId;

/// Invoice identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Open,
    Paid,
    Void,
}

/// Commission charged on a sale, as a fraction of the selling price.
pub const COMMISSION_RATE: f64 = 0.06;

/// Flat administrative fee charged on every sale.
pub const ADMINISTRATIVE_FEE: f64 = 100.00;

/// Tolerance absorbing float rounding in amount comparisons.
const AMOUNT_TOLERANCE: f64 = 1e-6;

/// An invoice line. Quantities are fractional: the sale commission is billed
/// as quantity 0.06 of the selling price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl InvoiceLine {
    pub fn amount(&self) -> f64 {
        self.quantity * self.unit_price
    }

    /// The commission line of a sale invoice.
    pub fn commission(selling_price: f64) -> Self {
        Self {
            description: "Commission".to_string(),
            quantity: COMMISSION_RATE,
            unit_price: selling_price,
        }
    }

    /// The flat administrative-fee line of a sale invoice.
    pub fn administrative_fee() -> Self {
        Self {
            description: "Administrative fee".to_string(),
            quantity: 1.0,
            unit_price: ADMINISTRATIVE_FEE,
        }
    }
}

/// Aggregate root: Invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    id: InvoiceId,
    buyer: Option<PartnerId>,
    property_id: Option<PropertyId>,
    status: InvoiceStatus,
    lines: Vec<InvoiceLine>,
    total_amount: f64,
    total_paid: f64,
    version: u64,
    created: bool,
}

impl Invoice {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            buyer: None,
            property_id: None,
            status: InvoiceStatus::Open,
            lines: Vec::new(),
            total_amount: 0.0,
            total_paid: 0.0,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn buyer(&self) -> Option<PartnerId> {
        self.buyer
    }

    pub fn property_id(&self) -> Option<PropertyId> {
        self.property_id
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn lines(&self) -> &[InvoiceLine] {
        &self.lines
    }

    pub fn total_amount(&self) -> f64 {
        self.total_amount
    }

    pub fn total_paid(&self) -> f64 {
        self.total_paid
    }

    pub fn outstanding_amount(&self) -> f64 {
        (self.total_amount - self.total_paid).max(0.0)
    }

    /// Void and fully paid invoices cannot accept payments.
    pub fn can_accept_payment(&self) -> bool {
        self.status != InvoiceStatus::Void && self.outstanding_amount() > AMOUNT_TOLERANCE
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: IssueInvoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueInvoice {
    pub invoice_id: InvoiceId,
    pub buyer: PartnerId,
    pub property_id: PropertyId,
    pub lines: Vec<InvoiceLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RegisterPayment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterPayment {
    pub invoice_id: InvoiceId,
    pub amount: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: VoidInvoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidInvoice {
    pub invoice_id: InvoiceId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    IssueInvoice(IssueInvoice),
    RegisterPayment(RegisterPayment),
    VoidInvoice(VoidInvoice),
}

/// Event: InvoiceIssued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceIssued {
    pub invoice_id: InvoiceId,
    pub buyer: PartnerId,
    pub property_id: PropertyId,
    pub lines: Vec<InvoiceLine>,
    pub total_amount: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentRegistered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRegistered {
    pub invoice_id: InvoiceId,
    pub amount: f64,
    pub new_total_paid: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceVoided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceVoided {
    pub invoice_id: InvoiceId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceIssued(InvoiceIssued),
    PaymentRegistered(PaymentRegistered),
    InvoiceVoided(InvoiceVoided),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceIssued(_) => "billing.invoice.issued",
            InvoiceEvent::PaymentRegistered(_) => "billing.invoice.payment_registered",
            InvoiceEvent::InvoiceVoided(_) => "billing.invoice.voided",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceIssued(e) => e.occurred_at,
            InvoiceEvent::PaymentRegistered(e) => e.occurred_at,
            InvoiceEvent::InvoiceVoided(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceIssued(e) => {
                self.id = e.invoice_id;
                self.buyer = Some(e.buyer);
                self.property_id = Some(e.property_id);
                self.lines = e.lines.clone();
                self.total_amount = e.total_amount;
                self.total_paid = 0.0;
                self.status = InvoiceStatus::Open;
                self.created = true;
            }
            InvoiceEvent::PaymentRegistered(e) => {
                self.total_paid = e.new_total_paid;
                if self.total_paid >= self.total_amount - AMOUNT_TOLERANCE {
                    self.status = InvoiceStatus::Paid;
                }
            }
            InvoiceEvent::InvoiceVoided(_) => {
                self.status = InvoiceStatus::Void;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::IssueInvoice(cmd) => self.handle_issue(cmd),
            InvoiceCommand::RegisterPayment(cmd) => self.handle_register_payment(cmd),
            InvoiceCommand::VoidInvoice(cmd) => self.handle_void(cmd),
        }
    }
}

impl Invoice {
    fn ensure_invoice_id(&self, invoice_id: InvoiceId) -> Result<(), DomainError> {
        if self.id != invoice_id {
            return Err(DomainError::conflict("invoice_id mismatch"));
        }
        Ok(())
    }

    fn handle_issue(&self, cmd: &IssueInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("invoice already exists"));
        }

        if cmd.lines.is_empty() {
            return Err(DomainError::validation("cannot issue invoice without lines"));
        }

        let mut total = 0.0;
        for line in &cmd.lines {
            if line.description.trim().is_empty() {
                return Err(DomainError::validation(
                    "invoice line description cannot be empty",
                ));
            }
            if line.quantity <= 0.0 {
                return Err(DomainError::validation(
                    "invoice line quantity must be positive",
                ));
            }
            if line.unit_price <= 0.0 {
                return Err(DomainError::validation(
                    "invoice line unit price must be positive",
                ));
            }
            total += line.amount();
        }

        Ok(vec![InvoiceEvent::InvoiceIssued(InvoiceIssued {
            invoice_id: cmd.invoice_id,
            buyer: cmd.buyer,
            property_id: cmd.property_id,
            lines: cmd.lines.clone(),
            total_amount: total,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_register_payment(
        &self,
        cmd: &RegisterPayment,
    ) -> Result<Vec<InvoiceEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_invoice_id(cmd.invoice_id)?;

        if !self.can_accept_payment() {
            return Err(DomainError::state(
                "cannot register payment on a void or fully paid invoice",
            ));
        }

        if cmd.amount <= 0.0 {
            return Err(DomainError::validation("payment amount must be positive"));
        }

        let new_total_paid = self.total_paid + cmd.amount;
        if new_total_paid > self.total_amount + AMOUNT_TOLERANCE {
            return Err(DomainError::validation("cannot overpay invoice"));
        }

        Ok(vec![InvoiceEvent::PaymentRegistered(PaymentRegistered {
            invoice_id: cmd.invoice_id,
            amount: cmd.amount,
            new_total_paid,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_void(&self, cmd: &VoidInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_invoice_id(cmd.invoice_id)?;

        if self.status == InvoiceStatus::Void {
            return Err(DomainError::conflict("invoice is already void"));
        }

        Ok(vec![InvoiceEvent::InvoiceVoided(InvoiceVoided {
            invoice_id: cmd.invoice_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_invoice_id() -> InvoiceId {
        InvoiceId::new(AggregateId::new())
    }

    fn test_partner_id() -> PartnerId {
        PartnerId::new(AggregateId::new())
    }

    fn test_property_id() -> PropertyId {
        PropertyId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn sale_lines(selling_price: f64) -> Vec<InvoiceLine> {
        vec![
            InvoiceLine::commission(selling_price),
            InvoiceLine::administrative_fee(),
        ]
    }

    fn issued(invoice_id: InvoiceId, selling_price: f64) -> Invoice {
        let mut invoice = Invoice::empty(invoice_id);
        let cmd = IssueInvoice {
            invoice_id,
            buyer: test_partner_id(),
            property_id: test_property_id(),
            lines: sale_lines(selling_price),
            occurred_at: test_time(),
        };
        let events = invoice.handle(&InvoiceCommand::IssueInvoice(cmd)).unwrap();
        invoice.apply(&events[0]);
        invoice
    }

    #[test]
    fn issue_invoice_totals_commission_and_fee() {
        let invoice_id = test_invoice_id();
        let invoice = Invoice::empty(invoice_id);
        let buyer = test_partner_id();
        let property_id = test_property_id();
        let cmd = IssueInvoice {
            invoice_id,
            buyer,
            property_id,
            lines: sale_lines(290_000.0),
            occurred_at: test_time(),
        };

        let events = invoice.handle(&InvoiceCommand::IssueInvoice(cmd)).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            InvoiceEvent::InvoiceIssued(e) => {
                assert_eq!(e.buyer, buyer);
                assert_eq!(e.property_id, property_id);
                assert_eq!(e.lines.len(), 2);
                assert_eq!(e.lines[0].description, "Commission");
                assert_eq!(e.lines[0].quantity, COMMISSION_RATE);
                assert_eq!(e.lines[0].unit_price, 290_000.0);
                assert_eq!(e.lines[1].description, "Administrative fee");
                assert_eq!(e.lines[1].quantity, 1.0);
                assert_eq!(e.lines[1].unit_price, ADMINISTRATIVE_FEE);
                let expected_total = 0.06 * 290_000.0 + 100.0;
                assert!((e.total_amount - expected_total).abs() < 1e-6);
            }
            _ => panic!("Expected InvoiceIssued event"),
        }
    }

    #[test]
    fn issue_invoice_rejects_empty_lines() {
        let invoice = Invoice::empty(test_invoice_id());
        let cmd = IssueInvoice {
            invoice_id: test_invoice_id(),
            buyer: test_partner_id(),
            property_id: test_property_id(),
            lines: vec![],
            occurred_at: test_time(),
        };

        let err = invoice
            .handle(&InvoiceCommand::IssueInvoice(cmd))
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty lines"),
        }
    }

    #[test]
    fn issue_invoice_rejects_non_positive_amounts() {
        let invoice = Invoice::empty(test_invoice_id());
        let cmd = IssueInvoice {
            invoice_id: test_invoice_id(),
            buyer: test_partner_id(),
            property_id: test_property_id(),
            lines: vec![InvoiceLine {
                description: "Commission".to_string(),
                quantity: 0.06,
                unit_price: 0.0,
            }],
            occurred_at: test_time(),
        };

        let err = invoice
            .handle(&InvoiceCommand::IssueInvoice(cmd))
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for zero unit price"),
        }
    }

    #[test]
    fn cannot_pay_void_invoice() {
        let invoice_id = test_invoice_id();
        let mut invoice = issued(invoice_id, 290_000.0);

        let cmd_void = VoidInvoice {
            invoice_id,
            reason: Some("sale aborted".to_string()),
            occurred_at: test_time(),
        };
        let events = invoice.handle(&InvoiceCommand::VoidInvoice(cmd_void)).unwrap();
        invoice.apply(&events[0]);
        assert_eq!(invoice.status(), InvoiceStatus::Void);

        let cmd_pay = RegisterPayment {
            invoice_id,
            amount: 50.0,
            occurred_at: test_time(),
        };
        let err = invoice
            .handle(&InvoiceCommand::RegisterPayment(cmd_pay))
            .unwrap_err();
        match err {
            DomainError::State(_) => {}
            _ => panic!("Expected State error for paying a void invoice"),
        }
    }

    #[test]
    fn cannot_void_twice() {
        let invoice_id = test_invoice_id();
        let mut invoice = issued(invoice_id, 290_000.0);

        let cmd = VoidInvoice {
            invoice_id,
            reason: None,
            occurred_at: test_time(),
        };
        let events = invoice
            .handle(&InvoiceCommand::VoidInvoice(cmd.clone()))
            .unwrap();
        invoice.apply(&events[0]);

        let err = invoice.handle(&InvoiceCommand::VoidInvoice(cmd)).unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for voiding twice"),
        }
    }

    #[test]
    fn cannot_overpay_invoice() {
        let invoice_id = test_invoice_id();
        let invoice = issued(invoice_id, 290_000.0);
        let total = invoice.total_amount();

        let cmd = RegisterPayment {
            invoice_id,
            amount: total + 1.0,
            occurred_at: test_time(),
        };
        let err = invoice
            .handle(&InvoiceCommand::RegisterPayment(cmd))
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for overpaying"),
        }
    }

    #[test]
    fn paying_to_total_marks_invoice_paid() {
        let invoice_id = test_invoice_id();
        let mut invoice = issued(invoice_id, 290_000.0);
        let total = invoice.total_amount();

        let cmd_pay1 = RegisterPayment {
            invoice_id,
            amount: 100.0,
            occurred_at: test_time(),
        };
        let events = invoice
            .handle(&InvoiceCommand::RegisterPayment(cmd_pay1))
            .unwrap();
        invoice.apply(&events[0]);
        assert_eq!(invoice.status(), InvoiceStatus::Open);

        let cmd_pay2 = RegisterPayment {
            invoice_id,
            amount: total - 100.0,
            occurred_at: test_time(),
        };
        let events = invoice
            .handle(&InvoiceCommand::RegisterPayment(cmd_pay2))
            .unwrap();
        invoice.apply(&events[0]);
        assert_eq!(invoice.status(), InvoiceStatus::Paid);
        assert!(!invoice.can_accept_payment());
    }

    #[test]
    fn version_increments_on_apply() {
        let invoice_id = test_invoice_id();
        let mut invoice = issued(invoice_id, 290_000.0);
        assert_eq!(invoice.version(), 1);

        let cmd = VoidInvoice {
            invoice_id,
            reason: None,
            occurred_at: test_time(),
        };
        let events = invoice.handle(&InvoiceCommand::VoidInvoice(cmd)).unwrap();
        invoice.apply(&events[0]);
        assert_eq!(invoice.version(), 2);
    }
}
