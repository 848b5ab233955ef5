use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use super::BookingStore;
use crate::entities::Booking;
use crate::error::{
    database_error, duplicate_reference_error, invalid_input_error, not_found_error, Error,
};

#[derive(Default)]
pub struct MemoryBookingStore {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bookings.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> Error {
    database_error("booking store poisoned")
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn insert(&self, booking: &Booking) -> Result<(), Error> {
        let mut bookings = self.bookings.write().map_err(poisoned)?;

        if bookings.values().any(|b| b.reference == booking.reference) {
            return Err(duplicate_reference_error());
        }
        if bookings.contains_key(&booking.id)
            || bookings
                .values()
                .any(|b| b.idempotency_token == booking.idempotency_token)
        {
            return Err(invalid_input_error());
        }

        bookings.insert(booking.id, booking.clone());

        Ok(())
    }

    async fn settle(&self, booking: &Booking) -> Result<bool, Error> {
        let mut bookings = self.bookings.write().map_err(poisoned)?;

        match bookings.get_mut(&booking.id) {
            Some(stored) if stored.is_paid() => Ok(false),
            Some(stored) => {
                *stored = booking.clone();
                Ok(true)
            }
            None => Err(not_found_error()),
        }
    }

    async fn find(&self, id: Uuid) -> Result<Booking, Error> {
        let bookings = self.bookings.read().map_err(poisoned)?;

        bookings.get(&id).cloned().ok_or_else(not_found_error)
    }

    async fn find_by_idempotency_token(&self, token: Uuid) -> Result<Option<Booking>, Error> {
        let bookings = self.bookings.read().map_err(poisoned)?;

        Ok(bookings
            .values()
            .find(|b| b.idempotency_token == token)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    use crate::entities::{
        Catalog, Contact, Details, DistanceSource, Payer, PaymentReference, Quote, RouteFacts,
        Selection,
    };
    use crate::pricing::{price_inputs, PricingInputs};

    fn card_booking() -> Booking {
        let route = RouteFacts {
            collection_postcode: "SW1A 1AA".into(),
            delivery_postcode: "M1 1AE".into(),
            distance_miles: dec!(20),
            distance_source: DistanceSource::Provider,
            collection_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            collection_time: Some("10:00".parse().unwrap()),
            delivery_time: None,
        };
        let inputs = PricingInputs {
            distance_miles: route.distance_miles,
            vehicle_id: "small_van".into(),
            service_id: "priority".into(),
            collection_time: route.collection_time,
            delivery_time: None,
            is_credit_payer: false,
        };
        let breakdown = price_inputs(&Catalog::builtin(), &inputs).unwrap();
        let quote = Quote {
            session_id: Uuid::new_v4(),
            inputs,
            route,
            selection: Selection {
                vehicle_id: "small_van".into(),
                service_id: "priority".into(),
            },
            details: Details {
                contact: Contact {
                    name: "Ada Lovelace".into(),
                    email: "ada@example.com".into(),
                    phone: "07700900002".into(),
                },
                collection_address: "1 Horse Guards Rd".into(),
                delivery_address: "2 Piccadilly".into(),
                delivery_date: None,
            },
            payer: Payer::Card,
            agreed_total: Some(breakdown.total),
            idempotency_token: Uuid::new_v4(),
            created_at: Utc::now(),
        };

        Booking::draft(&quote, breakdown)
    }

    #[tokio::test]
    async fn settles_an_unpaid_booking_once() {
        let store = MemoryBookingStore::new();
        let booking = card_booking();
        store.insert(&booking).await.unwrap();

        let mut paid = booking.clone();
        paid.mark_paid(PaymentReference::GatewayCapture {
            session_id: "cs_1".into(),
        })
        .unwrap();

        assert!(store.settle(&paid).await.unwrap());
        assert!(!store.settle(&paid).await.unwrap());
        assert!(store.find(booking.id).await.unwrap().is_paid());

        let missing = card_booking();
        assert!(store.settle(&missing).await.unwrap_err().is_not_found_error());
    }
}
