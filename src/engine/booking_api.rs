use super::Engine;

use async_trait::async_trait;
use tokio::time::timeout;
use uuid::Uuid;

use crate::{
    api::BookingAPI,
    entities::{Booking, PaymentMethod, PaymentReference},
    error::{invalid_state_error, payment_gateway_unavailable_error, Error},
    external::{notification::dispatch, payment::PaymentOutcome},
};

#[async_trait]
impl BookingAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn find_booking(&self, id: Uuid) -> Result<Booking, Error> {
        self.bookings.find(id).await
    }

    #[tracing::instrument(skip(self))]
    async fn confirm_payment(&self, id: Uuid) -> Result<Booking, Error> {
        let mut booking = self.bookings.find(id).await?;

        if booking.is_paid() {
            return Ok(booking);
        }

        let session_id = match (booking.payment_method, &booking.checkout) {
            (PaymentMethod::Card, Some(checkout)) => checkout.session_id.clone(),
            _ => return Err(invalid_state_error()),
        };

        let outcome = timeout(
            self.settings.external_timeout,
            self.payments.confirm_payment(&session_id),
        )
        .await
        .map_err(payment_gateway_unavailable_error)??;

        match outcome {
            PaymentOutcome::Unpaid => {
                tracing::info!(reference = %booking.reference, "payment not captured yet");
                Ok(booking)
            }
            PaymentOutcome::Paid => {
                booking.mark_paid(PaymentReference::GatewayCapture { session_id })?;

                if !self.bookings.settle(&booking).await? {
                    tracing::info!(reference = %booking.reference, "payment already settled");
                    return self.bookings.find(id).await;
                }

                tracing::info!(reference = %booking.reference, "card payment captured");
                dispatch(&self.notifier, &booking);

                Ok(booking)
            }
        }
    }
}
