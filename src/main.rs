use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use courier::bookings::PgBookingStore;
use courier::config::Config;
use courier::db::{migrate, PgPool};
use courier::engine::{Collaborators, Engine};
use courier::entities::CatalogHandle;
use courier::error::Error;
use courier::external::address::{AddressLookup, DynAddressProvider, HttpAddressProvider};
use courier::external::google_maps::GoogleMaps;
use courier::external::notification::LogNotifier;
use courier::external::payment::HttpPaymentGateway;
use courier::ledger::PgLedger;
use courier::server::serve;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("courier=info")),
        )
        .init();

    let config = Config::from_env()?;

    let PgPool(pool) = PgPool::new(&config.database_url, config.database_max_connections).await?;
    migrate(&pool).await?;

    let client = reqwest::Client::new();

    let addresses = config
        .address_backends
        .iter()
        .map(|backend| {
            Arc::new(HttpAddressProvider::new(
                client.clone(),
                backend.name.clone(),
                backend.api_base.clone(),
                config.address_api_key.clone(),
            )) as DynAddressProvider
        })
        .collect();

    let collaborators = Collaborators {
        distances: Arc::new(GoogleMaps::new(
            client.clone(),
            config.google_maps_api_base.clone(),
            config.google_maps_api_key.clone(),
        )),
        addresses: AddressLookup::new(addresses),
        ledger: Arc::new(PgLedger::new(pool.clone())),
        bookings: Arc::new(PgBookingStore::new(pool)),
        payments: Arc::new(HttpPaymentGateway::new(
            client,
            config.payment_api_base.clone(),
            config.payment_api_key.clone(),
        )),
        notifier: Arc::new(LogNotifier),
    };

    let catalog = CatalogHandle::load(config.catalog_path.as_deref())?;
    let engine = Engine::new(collaborators, catalog, config.settings.clone());

    serve(engine, config.listen_addr).await
}
