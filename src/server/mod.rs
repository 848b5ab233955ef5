mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post, put},
    Router,
};

use crate::api::API;
use crate::error::{unexpected_error, Error};
use crate::server::handlers::{addresses, bookings, catalog, credit_accounts, quotes};

type DynAPI = Arc<dyn API + Send + Sync>;

pub fn router(api: DynAPI) -> Router {
    Router::new()
        .route("/catalog", get(catalog::list).put(catalog::replace))
        .route("/addresses/:postcode", get(addresses::lookup))
        .route("/quotes", post(quotes::create))
        .route("/quotes/:id", get(quotes::find))
        .route("/quotes/:id/route", put(quotes::submit_route))
        .route("/quotes/:id/vehicle", put(quotes::select_vehicle))
        .route("/quotes/:id/details", put(quotes::submit_details))
        .route("/quotes/:id/commit", post(quotes::commit))
        .route("/bookings/:id", get(bookings::find))
        .route("/bookings/:id/confirm-payment", post(bookings::confirm_payment))
        .route("/credit-accounts", post(credit_accounts::open))
        .route("/credit-accounts/:id", get(credit_accounts::find))
        .route("/credit-accounts/:id/refunds", post(credit_accounts::refund))
        .layer(Extension(api))
}

pub async fn serve<T: API + Sync + Send + 'static>(api: T, addr: SocketAddr) -> Result<(), Error> {
    let app = router(Arc::new(api) as DynAPI);

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(unexpected_error)
}
