use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::committer::Commitment;
use crate::entities::{
    Booking, Catalog, ClockTime, Contact, CreditAccount, CreditAccountStatus, Payer, QuoteSession,
    Selection,
};
use crate::error::Error;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteRequest {
    pub collection_postcode: String,
    pub delivery_postcode: String,
    pub collection_date: NaiveDate,
    pub collection_time: Option<ClockTime>,
    pub delivery_time: Option<ClockTime>,
    /// Used only when the distance provider cannot answer.
    pub estimated_distance: Option<Decimal>,
    #[serde(default)]
    pub payer: Payer,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetailsRequest {
    pub contact: Contact,
    pub collection_address: String,
    pub delivery_address: String,
    pub delivery_date: Option<NaiveDate>,
    pub collection_time: Option<ClockTime>,
    pub delivery_time: Option<ClockTime>,
    pub payer: Option<Payer>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitRequest {
    pub idempotency_token: Uuid,
    pub accepted_total: Option<Decimal>,
}

#[async_trait]
pub trait QuoteAPI {
    async fn create_quote(&self) -> Result<QuoteSession, Error>;

    async fn find_quote(&self, id: Uuid) -> Result<QuoteSession, Error>;

    async fn submit_route(&self, id: Uuid, request: RouteRequest) -> Result<QuoteSession, Error>;

    async fn select_vehicle(&self, id: Uuid, selection: Selection) -> Result<QuoteSession, Error>;

    async fn submit_details(&self, id: Uuid, request: DetailsRequest)
        -> Result<QuoteSession, Error>;

    async fn commit_quote(&self, id: Uuid, request: CommitRequest) -> Result<Commitment, Error>;
}

#[async_trait]
pub trait BookingAPI {
    async fn find_booking(&self, id: Uuid) -> Result<Booking, Error>;

    async fn confirm_payment(&self, id: Uuid) -> Result<Booking, Error>;
}

#[async_trait]
pub trait CreditAPI {
    async fn open_credit_account(
        &self,
        credit_limit: Decimal,
        status: CreditAccountStatus,
    ) -> Result<CreditAccount, Error>;

    async fn find_credit_account(&self, id: Uuid) -> Result<CreditAccount, Error>;

    async fn refund_credit(&self, id: Uuid, amount: Decimal) -> Result<CreditAccount, Error>;
}

#[async_trait]
pub trait CatalogAPI {
    async fn list_catalog(&self) -> Result<Catalog, Error>;

    async fn replace_catalog(&self, catalog: Catalog) -> Result<Catalog, Error>;
}

#[async_trait]
pub trait AddressAPI {
    async fn lookup_addresses(&self, postcode: &str) -> Result<Vec<String>, Error>;
}

pub trait API: QuoteAPI + BookingAPI + CreditAPI + CatalogAPI + AddressAPI {}
