use chrono::{DateTime, NaiveDate, Utc};
use rand::{distributions::Uniform, Rng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{ClockTime, Contact, Payer, Quote};
use crate::error::{invalid_state_error, Error};
use crate::pricing::Breakdown;

// no 0/O or 1/I
const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const REFERENCE_LENGTH: usize = 8;

pub fn generate_reference() -> String {
    let mut rng = rand::thread_rng();
    let index = Uniform::from(0..REFERENCE_ALPHABET.len());
    let code: String = (0..REFERENCE_LENGTH)
        .map(|_| REFERENCE_ALPHABET[rng.sample(&index)] as char)
        .collect();

    format!("CX-{}", code)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn name(&self) -> String {
        match self {
            Self::Unpaid => "unpaid".into(),
            Self::Paid => "paid".into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Credit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Confirmed,
    Cancelled,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Pending => "pending".into(),
            Self::Confirmed => "confirmed".into(),
            Self::Cancelled => "cancelled".into(),
        }
    }
}

/// Evidence that money actually moved for a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentReference {
    LedgerEntry { entry_id: Uuid, account_id: Uuid },
    GatewayCapture { session_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    pub session_id: String,
    pub redirect_url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub reference: String,
    pub idempotency_token: Uuid,
    pub collection_postcode: String,
    pub delivery_postcode: String,
    pub collection_address: String,
    pub delivery_address: String,
    pub contact: Contact,
    pub collection_date: NaiveDate,
    pub collection_time: Option<ClockTime>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_time: Option<ClockTime>,
    pub distance_miles: Decimal,
    pub vehicle_id: String,
    pub service_id: String,
    pub base_price: Decimal,
    pub breakdown: Breakdown,
    pub total_price: Decimal,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<PaymentReference>,
    pub checkout: Option<Checkout>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Builds an unpaid, pending booking from a frozen quote and its
    /// freshly computed price.
    pub fn draft(quote: &Quote, breakdown: Breakdown) -> Self {
        let payment_method = match quote.payer {
            Payer::Card => PaymentMethod::Card,
            Payer::Credit { .. } => PaymentMethod::Credit,
        };

        Self {
            id: Uuid::new_v4(),
            reference: generate_reference(),
            idempotency_token: quote.idempotency_token,
            collection_postcode: quote.route.collection_postcode.clone(),
            delivery_postcode: quote.route.delivery_postcode.clone(),
            collection_address: quote.details.collection_address.clone(),
            delivery_address: quote.details.delivery_address.clone(),
            contact: quote.details.contact.clone(),
            collection_date: quote.route.collection_date,
            collection_time: quote.route.collection_time,
            delivery_date: quote.details.delivery_date,
            delivery_time: quote.route.delivery_time,
            distance_miles: quote.inputs.distance_miles,
            vehicle_id: quote.selection.vehicle_id.clone(),
            service_id: quote.selection.service_id.clone(),
            base_price: breakdown.chargeable_cost,
            total_price: breakdown.total,
            breakdown,
            payment_status: PaymentStatus::Unpaid,
            payment_method,
            payment_reference: None,
            checkout: None,
            status: Status::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    pub fn regenerate_reference(&mut self) {
        self.reference = generate_reference();
    }

    pub fn attach_checkout(&mut self, checkout: Checkout) -> Result<(), Error> {
        match (self.payment_method, self.payment_status) {
            (PaymentMethod::Card, PaymentStatus::Unpaid) => {
                self.checkout = Some(checkout);
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }

    /// Marks the booking paid and confirmed. Requires proof of the money movement.
    #[tracing::instrument(skip(self), fields(booking_id = %self.id))]
    pub fn mark_paid(&mut self, reference: PaymentReference) -> Result<(), Error> {
        match self.payment_status {
            PaymentStatus::Unpaid => {
                self.payment_status = PaymentStatus::Paid;
                self.payment_reference = Some(reference);
                self.status = Status::Confirmed;
                Ok(())
            }
            PaymentStatus::Paid => Err(invalid_state_error()),
        }
    }
}

#[test]
fn references_use_the_unambiguous_alphabet() {
    for _ in 0..100 {
        let reference = generate_reference();
        assert_eq!(reference.len(), 3 + REFERENCE_LENGTH);
        assert!(reference.starts_with("CX-"));
        assert!(reference[3..]
            .bytes()
            .all(|b| REFERENCE_ALPHABET.contains(&b)));
    }
}
