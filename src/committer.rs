//! Turns a frozen quote into a booking.
//!
//! Order matters: the price is recomputed before any money moves, money
//! moves before the booking is marked paid, and the booking is persisted
//! only once the debit succeeded or the card checkout exists. A booking is
//! never stored as paid without a ledger entry or gateway capture behind it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use uuid::Uuid;

use crate::bookings::DynBookingStore;
use crate::entities::{Booking, BookingStatus, Catalog, Payer, PaymentReference, Quote};
use crate::error::{
    commit_inconsistency_error, insufficient_credit_error, payment_gateway_unavailable_error,
    price_changed_error, unexpected_error, Error,
};
use crate::external::notification::{dispatch, DynNotifier};
use crate::external::payment::{CheckoutMode, DynPaymentGateway};
use crate::ledger::DynLedger;
use crate::pricing::price_inputs;

const REFERENCE_ATTEMPTS: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub booking: Booking,
    /// Where to send a card payer to pay; `None` for credit bookings.
    pub redirect_url: Option<String>,
}

impl Commitment {
    pub fn new(booking: Booking) -> Self {
        let redirect_url = booking
            .checkout
            .as_ref()
            .filter(|_| !booking.is_paid())
            .map(|checkout| checkout.redirect_url.clone());

        Self {
            booking,
            redirect_url,
        }
    }
}

#[derive(Clone)]
pub struct BookingCommitter {
    ledger: DynLedger,
    bookings: DynBookingStore,
    payments: DynPaymentGateway,
    notifier: DynNotifier,
    mode: CheckoutMode,
    external_timeout: Duration,
    /// Tokens whose debit went through but whose booking was never stored.
    unreconciled: Arc<Mutex<HashSet<Uuid>>>,
}

impl BookingCommitter {
    pub fn new(
        ledger: DynLedger,
        bookings: DynBookingStore,
        payments: DynPaymentGateway,
        notifier: DynNotifier,
        mode: CheckoutMode,
        external_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            bookings,
            payments,
            notifier,
            mode,
            external_timeout,
            unreconciled: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn is_unreconciled(&self, token: Uuid) -> Result<bool, Error> {
        let unreconciled = self.unreconciled.lock().map_err(unexpected_error)?;

        Ok(unreconciled.contains(&token))
    }

    fn mark_unreconciled(&self, token: Uuid) {
        if let Ok(mut unreconciled) = self.unreconciled.lock() {
            unreconciled.insert(token);
        }
    }

    #[tracing::instrument(
        skip(self, quote, catalog),
        fields(session_id = %quote.session_id, token = %quote.idempotency_token)
    )]
    pub async fn commit(&self, quote: &Quote, catalog: &Catalog) -> Result<Commitment, Error> {
        if let Some(existing) = self
            .bookings
            .find_by_idempotency_token(quote.idempotency_token)
            .await?
        {
            tracing::info!(reference = %existing.reference, "token already committed");
            return Ok(Commitment::new(existing));
        }

        if self.is_unreconciled(quote.idempotency_token)? {
            tracing::error!("token already debited without a stored booking, refusing to debit again");
            return Err(commit_inconsistency_error(format!(
                "token {} awaits manual reconciliation",
                quote.idempotency_token
            )));
        }

        let breakdown = price_inputs(catalog, &quote.inputs)?;
        if quote.agreed_total != Some(breakdown.total) {
            tracing::warn!(
                agreed = ?quote.agreed_total,
                authoritative = %breakdown.total,
                "price drift at commit"
            );
            return Err(price_changed_error());
        }

        let mut booking = Booking::draft(quote, breakdown);
        let mut debited = false;

        match &quote.payer {
            Payer::Credit { account_id } => {
                let outcome = self.ledger.debit(*account_id, booking.total_price).await?;

                let entry = match outcome.entry {
                    Some(entry) if outcome.ok => entry,
                    _ => {
                        tracing::warn!(
                            account_id = %account_id,
                            amount = %booking.total_price,
                            balance = %outcome.new_balance,
                            "insufficient credit"
                        );
                        return Err(insufficient_credit_error());
                    }
                };

                debited = true;
                booking.mark_paid(PaymentReference::LedgerEntry {
                    entry_id: entry.id,
                    account_id: *account_id,
                })?;
            }
            Payer::Card => {
                let checkout = timeout(
                    self.external_timeout,
                    self.payments
                        .create_checkout(&booking, booking.total_price, self.mode),
                )
                .await
                .map_err(payment_gateway_unavailable_error)??;

                booking.attach_checkout(checkout)?;
            }
        }

        if let Err(err) = self.persist(&mut booking).await {
            if debited {
                self.mark_unreconciled(quote.idempotency_token);
                tracing::error!(
                    booking_id = %booking.id,
                    reference = %booking.reference,
                    amount = %booking.total_price,
                    payment_reference = ?booking.payment_reference,
                    cause = %err,
                    "credit debited but booking not persisted, manual reconciliation required"
                );
                return Err(commit_inconsistency_error(format!(
                    "debit recorded for booking {} but the booking was not stored",
                    booking.id
                )));
            }

            return Err(err);
        }

        tracing::info!(
            booking_id = %booking.id,
            reference = %booking.reference,
            total = %booking.total_price,
            status = %booking.status.name(),
            "booking committed"
        );

        if booking.status == BookingStatus::Confirmed {
            dispatch(&self.notifier, &booking);
        }

        Ok(Commitment::new(booking))
    }

    async fn persist(&self, booking: &mut Booking) -> Result<(), Error> {
        for _ in 1..REFERENCE_ATTEMPTS {
            match self.bookings.insert(booking).await {
                Err(err) if err.is_duplicate_reference_error() => {
                    tracing::info!(reference = %booking.reference, "reference taken, regenerating");
                    booking.regenerate_reference();
                }
                result => return result,
            }
        }

        self.bookings.insert(booking).await
    }
}
