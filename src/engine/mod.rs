mod address_api;
mod booking_api;
mod catalog_api;
mod credit_api;
mod distance;
mod quote_api;

use crate::api::API;
use crate::bookings::DynBookingStore;
use crate::committer::BookingCommitter;
use crate::config::Settings;
use crate::entities::CatalogHandle;
use crate::external::address::AddressLookup;
use crate::external::distance::{DistanceCache, DynDistanceProvider};
use crate::external::notification::DynNotifier;
use crate::external::payment::DynPaymentGateway;
use crate::ledger::DynLedger;
use crate::sessions::SessionStore;

/// Outside services the engine talks to.
pub struct Collaborators {
    pub distances: DynDistanceProvider,
    pub addresses: AddressLookup,
    pub ledger: DynLedger,
    pub bookings: DynBookingStore,
    pub payments: DynPaymentGateway,
    pub notifier: DynNotifier,
}

pub struct Engine {
    catalog: CatalogHandle,
    sessions: SessionStore,
    distances: DynDistanceProvider,
    distance_cache: DistanceCache,
    addresses: AddressLookup,
    ledger: DynLedger,
    bookings: DynBookingStore,
    payments: DynPaymentGateway,
    notifier: DynNotifier,
    committer: BookingCommitter,
    settings: Settings,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub fn new(collaborators: Collaborators, catalog: CatalogHandle, settings: Settings) -> Self {
        let Collaborators {
            distances,
            addresses,
            ledger,
            bookings,
            payments,
            notifier,
        } = collaborators;

        let committer = BookingCommitter::new(
            ledger.clone(),
            bookings.clone(),
            payments.clone(),
            notifier.clone(),
            settings.payment_mode,
            settings.external_timeout,
        );

        tracing::info!(
            quote_ttl_secs = settings.quote_ttl.num_seconds(),
            payment_mode = ?settings.payment_mode,
            "engine ready"
        );

        Self {
            catalog,
            sessions: SessionStore::new(),
            distances,
            distance_cache: DistanceCache::new(settings.distance_cache_ttl),
            addresses,
            ledger,
            bookings,
            payments,
            notifier,
            committer,
            settings,
        }
    }
}

impl API for Engine {}
