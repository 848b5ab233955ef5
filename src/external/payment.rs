use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::entities::{Booking, Checkout};
use crate::error::{config_error, invalid_input_error, payment_gateway_unavailable_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    Test,
    Live,
}

impl FromStr for CheckoutMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test" => Ok(Self::Test),
            "live" => Ok(Self::Live),
            _ => Err(config_error("PAYMENT_MODE")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Paid,
    Unpaid,
}

#[async_trait]
pub trait PaymentGateway {
    async fn create_checkout(
        &self,
        booking: &Booking,
        amount: Decimal,
        mode: CheckoutMode,
    ) -> Result<Checkout, Error>;

    async fn confirm_payment(&self, session_id: &str) -> Result<PaymentOutcome, Error>;
}

pub type DynPaymentGateway = Arc<dyn PaymentGateway + Send + Sync>;

/// Amount in pence.
pub fn minor_units(amount: Decimal) -> Result<i64, Error> {
    let pence = (amount * Decimal::ONE_HUNDRED).round();

    pence.to_i64().ok_or_else(invalid_input_error)
}

#[derive(Deserialize)]
struct CheckoutResponse {
    id: String,
    url: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    payment_status: String,
}

#[derive(Clone, Debug)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl HttpPaymentGateway {
    pub fn new(client: reqwest::Client, api_base: String, api_key: String) -> Self {
        Self {
            client,
            api_base,
            api_key,
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[tracing::instrument(skip(self, booking), fields(reference = %booking.reference))]
    async fn create_checkout(
        &self,
        booking: &Booking,
        amount: Decimal,
        mode: CheckoutMode,
    ) -> Result<Checkout, Error> {
        let res = self
            .client
            .post(format!("https://{}/checkouts", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "reference": booking.reference,
                "amount": minor_units(amount)?,
                "currency": "gbp",
                "mode": mode,
                "customer_email": booking.contact.email,
            }))
            .send()
            .await
            .map_err(payment_gateway_unavailable_error)?;

        if !res.status().is_success() {
            return Err(payment_gateway_unavailable_error(res.status()));
        }

        let data: CheckoutResponse = res
            .json()
            .await
            .map_err(payment_gateway_unavailable_error)?;

        Ok(Checkout {
            session_id: data.id,
            redirect_url: data.url,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn confirm_payment(&self, session_id: &str) -> Result<PaymentOutcome, Error> {
        let res = self
            .client
            .get(format!("https://{}/checkouts/{}", self.api_base, session_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(payment_gateway_unavailable_error)?;

        if !res.status().is_success() {
            return Err(payment_gateway_unavailable_error(res.status()));
        }

        let data: StatusResponse = res
            .json()
            .await
            .map_err(payment_gateway_unavailable_error)?;

        match data.payment_status.as_str() {
            "paid" => Ok(PaymentOutcome::Paid),
            _ => Ok(PaymentOutcome::Unpaid),
        }
    }
}

#[test]
fn converts_to_pence() {
    use rust_decimal_macros::dec;

    assert_eq!(minor_units(dec!(60.00)).unwrap(), 6000);
    assert_eq!(minor_units(dec!(45.5)).unwrap(), 4550);
    assert_eq!(minor_units(dec!(0.01)).unwrap(), 1);
}
