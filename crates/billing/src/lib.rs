//! `estateflow-billing` — customer invoices.
//!
//! The billing side of a completed sale: when a property is sold, the
//! lifecycle service issues an invoice to the buyer with a commission line
//! (6% of the selling price) and a fixed administrative fee. Invoices can
//! also be voided — the compensating action when a sale fails to commit
//! after its invoice was issued — and accept payments.

pub mod invoice;

pub use invoice::{
    ADMINISTRATIVE_FEE, COMMISSION_RATE, Invoice, InvoiceCommand, InvoiceEvent, InvoiceId,
    InvoiceLine, InvoiceStatus, IssueInvoice, RegisterPayment, VoidInvoice,
};
