use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::ClockTime;
use crate::pricing::{Breakdown, PricingInputs};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Payer {
    Card,
    Credit { account_id: Uuid },
}

impl Default for Payer {
    fn default() -> Self {
        Self::Card
    }
}

impl Payer {
    pub fn is_credit(&self) -> bool {
        matches!(self, Self::Credit { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSource {
    Provider,
    Cache,
    Session,
    ClientEstimate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteFacts {
    pub collection_postcode: String,
    pub delivery_postcode: String,
    pub distance_miles: Decimal,
    pub distance_source: DistanceSource,
    pub collection_date: NaiveDate,
    pub collection_time: Option<ClockTime>,
    pub delivery_time: Option<ClockTime>,
}

impl RouteFacts {
    pub fn same_pair(&self, collection_postcode: &str, delivery_postcode: &str) -> bool {
        self.collection_postcode == collection_postcode
            && self.delivery_postcode == delivery_postcode
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub vehicle_id: String,
    pub service_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Details {
    pub contact: Contact,
    pub collection_address: String,
    pub delivery_address: String,
    pub delivery_date: Option<NaiveDate>,
}

/// A price tagged with the inputs that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    pub inputs: PricingInputs,
    pub breakdown: Breakdown,
    pub distance_estimated: bool,
    pub stale: bool,
}

impl Quotation {
    pub fn new(inputs: PricingInputs, breakdown: Breakdown, distance_estimated: bool) -> Self {
        Self {
            inputs,
            breakdown,
            distance_estimated,
            stale: false,
        }
    }

    pub fn total(&self) -> Decimal {
        self.breakdown.total
    }
}

/// Frozen draft handed over for commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub session_id: Uuid,
    pub route: RouteFacts,
    pub selection: Selection,
    pub details: Details,
    pub payer: Payer,
    pub inputs: PricingInputs,
    /// Total the client agreed to; `None` when the stored price went stale.
    pub agreed_total: Option<Decimal>,
    pub idempotency_token: Uuid,
    pub created_at: DateTime<Utc>,
}
