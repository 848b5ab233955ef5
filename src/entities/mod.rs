mod booking;
mod catalog;
mod clock;
mod credit_account;
mod quote;
mod quote_session;

pub use booking::{
    generate_reference, Booking, Checkout, PaymentMethod, PaymentReference, PaymentStatus,
    Status as BookingStatus,
};
pub use catalog::{Catalog, CatalogHandle, ServiceTier, VehicleClass};
pub use clock::ClockTime;
pub use credit_account::{CreditAccount, LedgerEntry, Status as CreditAccountStatus};
pub use quote::{Contact, Details, DistanceSource, Payer, Quotation, Quote, RouteFacts, Selection};
pub use quote_session::{QuoteSession, Stage, TimeChanges};
