use super::Engine;

use rust_decimal::Decimal;
use tokio::time::{sleep, timeout};

use crate::entities::{DistanceSource, RouteFacts};
use crate::error::{distance_provider_unavailable_error, invalid_distance_error, Error};
use crate::pricing::round_money;

impl Engine {
    /// Session distance for the same pair, then the cache, then the provider
    /// (one retry), then the client's estimate.
    #[tracing::instrument(skip(self, on_file))]
    pub(super) async fn resolve_distance(
        &self,
        on_file: Option<&RouteFacts>,
        origin: &str,
        destination: &str,
        estimate: Option<Decimal>,
    ) -> Result<(Decimal, DistanceSource), Error> {
        if let Some(route) = on_file.filter(|route| route.same_pair(origin, destination)) {
            return Ok((route.distance_miles, DistanceSource::Session));
        }

        if let Some(miles) = self.distance_cache.get(origin, destination) {
            return Ok((miles, DistanceSource::Cache));
        }

        match self.ask_provider(origin, destination).await {
            Ok(miles) => {
                self.distance_cache.put(origin, destination, miles);
                Ok((miles, DistanceSource::Provider))
            }
            Err(err) => match estimate.map(round_money) {
                Some(miles) if miles > Decimal::ZERO => {
                    tracing::warn!(
                        estimate = %miles,
                        cause = %err,
                        "distance provider down, pricing on client estimate"
                    );
                    Ok((miles, DistanceSource::ClientEstimate))
                }
                Some(_) => Err(invalid_distance_error()),
                None => Err(err),
            },
        }
    }

    async fn ask_provider(&self, origin: &str, destination: &str) -> Result<Decimal, Error> {
        match self.provider_call(origin, destination).await {
            Ok(miles) => Ok(miles),
            Err(err) => {
                tracing::info!(cause = %err, "distance lookup failed, retrying once");
                sleep(self.settings.distance_retry_backoff).await;
                self.provider_call(origin, destination).await
            }
        }
    }

    async fn provider_call(&self, origin: &str, destination: &str) -> Result<Decimal, Error> {
        timeout(
            self.settings.external_timeout,
            self.distances.distance_miles(origin, destination),
        )
        .await
        .map_err(distance_provider_unavailable_error)?
        .map_err(distance_provider_unavailable_error)
    }
}
