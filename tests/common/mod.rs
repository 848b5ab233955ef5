#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use courier::api::{DetailsRequest, QuoteAPI, RouteRequest};
use courier::bookings::{BookingStore, DynBookingStore, MemoryBookingStore};
use courier::config::Settings;
use courier::engine::{Collaborators, Engine};
use courier::entities::{
    Booking, Catalog, CatalogHandle, Checkout, Contact, CreditAccount, LedgerEntry, Payer,
    PaymentReference, Selection,
};
use courier::error::{
    database_error, ledger_unavailable_error, not_found_error, payment_gateway_unavailable_error,
    upstream_error, Error,
};
use courier::external::address::AddressLookup;
use courier::external::distance::DistanceProvider;
use courier::external::notification::{DynNotifier, LogNotifier, Notifier};
use courier::external::payment::{CheckoutMode, PaymentGateway, PaymentOutcome};
use courier::ledger::{CreditLedger, DebitOutcome, DynLedger, MemoryLedger};

/// Distance provider that fails its first `failures` calls.
pub struct ScriptedDistance {
    pub miles: Decimal,
    pub failures: usize,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl ScriptedDistance {
    pub fn answering(miles: Decimal) -> Self {
        Self {
            miles,
            failures: 0,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(failures: usize, miles: Decimal) -> Self {
        Self {
            failures,
            ..Self::answering(miles)
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::answering(dec!(20))
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DistanceProvider for ScriptedDistance {
    async fn distance_miles(&self, _origin: &str, _destination: &str) -> Result<Decimal, Error> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if call < self.failures {
            return Err(upstream_error());
        }

        Ok(self.miles)
    }
}

pub struct ScriptedGateway {
    pub outcome: Mutex<PaymentOutcome>,
    pub available: bool,
    pub checkouts: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            outcome: Mutex::new(PaymentOutcome::Unpaid),
            available: true,
            checkouts: AtomicUsize::new(0),
        }
    }

    pub fn down() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn settle(&self, outcome: PaymentOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_checkout(
        &self,
        booking: &Booking,
        _amount: Decimal,
        _mode: CheckoutMode,
    ) -> Result<Checkout, Error> {
        if !self.available {
            return Err(payment_gateway_unavailable_error("connection refused"));
        }

        self.checkouts.fetch_add(1, Ordering::SeqCst);

        Ok(Checkout {
            session_id: format!("cs_test_{}", booking.reference),
            redirect_url: format!("https://pay.test/c/{}", booking.reference),
        })
    }

    async fn confirm_payment(&self, _session_id: &str) -> Result<PaymentOutcome, Error> {
        tokio::task::yield_now().await;
        Ok(*self.outcome.lock().unwrap())
    }
}

/// Notifier that only counts confirmations.
#[derive(Default)]
pub struct CountingNotifier {
    pub confirmations: AtomicUsize,
}

impl CountingNotifier {
    pub fn sent(&self) -> usize {
        self.confirmations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn booking_confirmed(&self, _booking: &Booking) -> Result<(), Error> {
        self.confirmations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Booking store that checks, at the moment of every write, that a paid
/// booking already has its ledger entry behind it.
pub struct AuditingStore {
    pub inner: MemoryBookingStore,
    pub ledger: Arc<MemoryLedger>,
    pub violations: Mutex<Vec<Uuid>>,
}

impl AuditingStore {
    pub fn new(ledger: Arc<MemoryLedger>) -> Self {
        Self {
            inner: MemoryBookingStore::new(),
            ledger,
            violations: Mutex::new(vec![]),
        }
    }

    async fn audit(&self, booking: &Booking) {
        if !booking.is_paid() {
            return;
        }

        let backed = match &booking.payment_reference {
            Some(PaymentReference::LedgerEntry {
                entry_id,
                account_id,
            }) => self
                .ledger
                .entries(*account_id)
                .await
                .map(|entries| entries.iter().any(|entry| entry.id == *entry_id))
                .unwrap_or(false),
            Some(PaymentReference::GatewayCapture { .. }) => true,
            None => false,
        };

        if !backed {
            self.violations.lock().unwrap().push(booking.id);
        }
    }
}

#[async_trait]
impl BookingStore for AuditingStore {
    async fn insert(&self, booking: &Booking) -> Result<(), Error> {
        self.audit(booking).await;
        self.inner.insert(booking).await
    }

    async fn settle(&self, booking: &Booking) -> Result<bool, Error> {
        self.audit(booking).await;
        self.inner.settle(booking).await
    }

    async fn find(&self, id: Uuid) -> Result<Booking, Error> {
        self.inner.find(id).await
    }

    async fn find_by_idempotency_token(&self, token: Uuid) -> Result<Option<Booking>, Error> {
        self.inner.find_by_idempotency_token(token).await
    }
}

/// Store whose writes always fail.
pub struct BrokenStore;

#[async_trait]
impl BookingStore for BrokenStore {
    async fn insert(&self, _booking: &Booking) -> Result<(), Error> {
        Err(database_error("disk full"))
    }

    async fn settle(&self, _booking: &Booking) -> Result<bool, Error> {
        Err(database_error("disk full"))
    }

    async fn find(&self, _id: Uuid) -> Result<Booking, Error> {
        Err(not_found_error())
    }

    async fn find_by_idempotency_token(&self, _token: Uuid) -> Result<Option<Booking>, Error> {
        Ok(None)
    }
}

/// Ledger whose storage is unreachable.
pub struct UnreachableLedger;

#[async_trait]
impl CreditLedger for UnreachableLedger {
    async fn open_account(&self, _account: CreditAccount) -> Result<CreditAccount, Error> {
        Err(ledger_unavailable_error("connection reset"))
    }

    async fn find_account(&self, _account_id: Uuid) -> Result<CreditAccount, Error> {
        Err(ledger_unavailable_error("connection reset"))
    }

    async fn debit(&self, _account_id: Uuid, _amount: Decimal) -> Result<DebitOutcome, Error> {
        Err(ledger_unavailable_error("connection reset"))
    }

    async fn credit(&self, _account_id: Uuid, _amount: Decimal) -> Result<Decimal, Error> {
        Err(ledger_unavailable_error("connection reset"))
    }

    async fn entries(&self, _account_id: Uuid) -> Result<Vec<LedgerEntry>, Error> {
        Err(ledger_unavailable_error("connection reset"))
    }
}

pub fn settings() -> Settings {
    Settings {
        external_timeout: Duration::from_millis(200),
        distance_retry_backoff: Duration::from_millis(5),
        ..Settings::default()
    }
}

pub fn engine(
    distances: Arc<ScriptedDistance>,
    ledger: DynLedger,
    bookings: DynBookingStore,
    gateway: Arc<ScriptedGateway>,
    settings: Settings,
) -> Engine {
    Engine::new(
        Collaborators {
            distances,
            addresses: AddressLookup::default(),
            ledger,
            bookings,
            payments: gateway,
            notifier: Arc::new(LogNotifier),
        },
        CatalogHandle::new(Catalog::builtin()),
        settings,
    )
}

pub fn engine_with_notifier(
    ledger: DynLedger,
    bookings: DynBookingStore,
    gateway: Arc<ScriptedGateway>,
    notifier: DynNotifier,
) -> Engine {
    Engine::new(
        Collaborators {
            distances: Arc::new(ScriptedDistance::answering(dec!(20))),
            addresses: AddressLookup::default(),
            ledger,
            bookings,
            payments: gateway,
            notifier,
        },
        CatalogHandle::new(Catalog::builtin()),
        settings(),
    )
}

pub fn route(payer: Payer, estimated_distance: Option<Decimal>) -> RouteRequest {
    RouteRequest {
        collection_postcode: "sw1a  1aa".into(),
        delivery_postcode: "M1 1AE".into(),
        collection_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
        collection_time: Some("10:00".parse().unwrap()),
        delivery_time: None,
        estimated_distance,
        payer,
    }
}

pub fn small_van_priority() -> Selection {
    Selection {
        vehicle_id: "small_van".into(),
        service_id: "priority".into(),
    }
}

pub fn details() -> DetailsRequest {
    DetailsRequest {
        contact: Contact {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "07700900000".into(),
        },
        collection_address: "1 Horse Guards Rd, London".into(),
        delivery_address: "2 Piccadilly, Manchester".into(),
        delivery_date: None,
        collection_time: None,
        delivery_time: None,
        payer: None,
    }
}

/// Walks a fresh session up to the commit step and returns its id and token.
pub async fn ready_to_commit(engine: &Engine, payer: Payer) -> (Uuid, Uuid) {
    let session = engine.create_quote().await.unwrap();
    engine.submit_route(session.id, route(payer, None)).await.unwrap();
    engine
        .select_vehicle(session.id, small_van_priority())
        .await
        .unwrap();
    let session = engine.submit_details(session.id, details()).await.unwrap();

    (session.id, session.idempotency_token.unwrap())
}
