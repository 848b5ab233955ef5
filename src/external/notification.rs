use std::sync::Arc;

use async_trait::async_trait;

use crate::entities::Booking;
use crate::error::Error;

#[async_trait]
pub trait Notifier {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<(), Error>;
}

pub type DynNotifier = Arc<dyn Notifier + Send + Sync>;

/// Writes confirmations to the log instead of sending them.
#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<(), Error> {
        tracing::info!(
            reference = %booking.reference,
            email = %booking.contact.email,
            total = %booking.total_price,
            "booking confirmed"
        );

        Ok(())
    }
}

/// Fire-and-forget dispatch; a failed notification never affects the booking.
pub fn dispatch(notifier: &DynNotifier, booking: &Booking) {
    let notifier = notifier.clone();
    let booking = booking.clone();

    tokio::spawn(async move {
        if let Err(err) = notifier.booking_confirmed(&booking).await {
            tracing::warn!(reference = %booking.reference, error = %err, "confirmation not sent");
        }
    });
}
