use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    error::{invalid_input_error, upstream_error, Error},
    external::distance::{metres_to_miles, DistanceProvider},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Measure {
    value: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Element {
    status: String,
    distance: Option<Measure>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Row {
    elements: Vec<Element>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Response {
    status: String,
    rows: Vec<Row>,
}

/// Distance Matrix client. Requests are bounded by the client's timeout.
#[derive(Clone, Debug)]
pub struct GoogleMaps {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl GoogleMaps {
    pub fn new(client: reqwest::Client, api_base: String, api_key: String) -> Self {
        Self {
            client,
            api_base,
            api_key,
        }
    }
}

#[async_trait]
impl DistanceProvider for GoogleMaps {
    #[tracing::instrument(skip(self))]
    async fn distance_miles(&self, origin: &str, destination: &str) -> Result<Decimal, Error> {
        let url = format!("https://{}/maps/api/distancematrix/json", self.api_base);

        let res = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .query(&[("origins", origin)])
            .query(&[("destinations", destination)])
            .query(&[("units", "imperial")])
            .query(&[("region", "uk")])
            .send()
            .await?;

        let status_code = res.status().as_u16();

        if (400..500).contains(&status_code) {
            return Err(invalid_input_error());
        } else if status_code != 200 {
            return Err(upstream_error());
        }

        let data: Response = res.json().await?;

        if data.status != "OK" {
            return Err(upstream_error());
        }

        let element = data
            .rows
            .first()
            .and_then(|row| row.elements.first())
            .ok_or_else(upstream_error)?;

        match (element.status.as_str(), &element.distance) {
            ("OK", Some(distance)) => metres_to_miles(distance.value),
            ("NOT_FOUND", _) | ("ZERO_RESULTS", _) => Err(invalid_input_error()),
            _ => Err(upstream_error()),
        }
    }
}
