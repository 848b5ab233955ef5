mod memory;
mod postgres;

pub use memory::MemoryBookingStore;
pub use postgres::PgBookingStore;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::Booking;
use crate::error::Error;

/// Durable booking records.
///
/// `insert` fails with `duplicate_reference_error` when the reference is
/// already taken so the caller can pick a new one. `settle` stores a paid
/// booking only while the stored copy is still unpaid and reports whether
/// it did.
#[async_trait]
pub trait BookingStore {
    async fn insert(&self, booking: &Booking) -> Result<(), Error>;
    async fn settle(&self, booking: &Booking) -> Result<bool, Error>;
    async fn find(&self, id: Uuid) -> Result<Booking, Error>;
    async fn find_by_idempotency_token(&self, token: Uuid) -> Result<Option<Booking>, Error>;
}

pub type DynBookingStore = Arc<dyn BookingStore + Send + Sync>;
