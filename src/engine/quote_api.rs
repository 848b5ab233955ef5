use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    api::{CommitRequest, DetailsRequest, QuoteAPI, RouteRequest},
    committer::Commitment,
    entities::{Details, QuoteSession, RouteFacts, Selection, Stage, TimeChanges},
    error::{invalid_input_error, invalid_state_error, missing_time_error, Error},
    external::distance::normalize_postcode,
};

#[async_trait]
impl QuoteAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_quote(&self) -> Result<QuoteSession, Error> {
        let session = self.sessions.create(Utc::now())?;

        tracing::info!(session_id = %session.id, "quote session opened");

        Ok(session)
    }

    #[tracing::instrument(skip(self))]
    async fn find_quote(&self, id: Uuid) -> Result<QuoteSession, Error> {
        let handle = self.sessions.get(id)?;
        let mut session = handle.lock().await;

        let now = Utc::now();
        if session.is_expired(now) {
            session.ensure_live(now)?;
        }

        Ok(session.clone())
    }

    #[tracing::instrument(skip(self, request))]
    async fn submit_route(&self, id: Uuid, request: RouteRequest) -> Result<QuoteSession, Error> {
        let handle = self.sessions.get(id)?;
        let mut session = handle.lock().await;
        session.ensure_live(Utc::now())?;

        let collection_postcode = normalize_postcode(&request.collection_postcode);
        let delivery_postcode = normalize_postcode(&request.delivery_postcode);
        if collection_postcode.is_empty() || delivery_postcode.is_empty() {
            return Err(invalid_input_error());
        }
        if request.collection_time.is_none() && request.delivery_time.is_none() {
            return Err(missing_time_error());
        }

        let (distance_miles, distance_source) = self
            .resolve_distance(
                session.route.as_ref(),
                &collection_postcode,
                &delivery_postcode,
                request.estimated_distance,
            )
            .await?;

        let route = RouteFacts {
            collection_postcode,
            delivery_postcode,
            distance_miles,
            distance_source,
            collection_date: request.collection_date,
            collection_time: request.collection_time,
            delivery_time: request.delivery_time,
        };

        session.submit_route(route, request.payer, Utc::now(), self.settings.quote_ttl)?;

        tracing::info!(
            distance = %distance_miles,
            source = ?distance_source,
            "route accepted"
        );

        Ok(session.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn select_vehicle(&self, id: Uuid, selection: Selection) -> Result<QuoteSession, Error> {
        let catalog = self.catalog.snapshot()?;
        let handle = self.sessions.get(id)?;
        let mut session = handle.lock().await;

        let quotation = session.select_vehicle(selection, &catalog, Utc::now())?;
        tracing::info!(
            total = %quotation.total(),
            estimated = quotation.distance_estimated,
            "vehicle priced"
        );

        Ok(session.clone())
    }

    #[tracing::instrument(skip(self, request))]
    async fn submit_details(
        &self,
        id: Uuid,
        request: DetailsRequest,
    ) -> Result<QuoteSession, Error> {
        let DetailsRequest {
            contact,
            collection_address,
            delivery_address,
            delivery_date,
            collection_time,
            delivery_time,
            payer,
        } = request;

        if contact.name.trim().is_empty()
            || !contact.email.contains('@')
            || collection_address.trim().is_empty()
            || delivery_address.trim().is_empty()
        {
            return Err(invalid_input_error());
        }

        let handle = self.sessions.get(id)?;
        let mut session = handle.lock().await;

        session.submit_details(
            Details {
                contact,
                collection_address,
                delivery_address,
                delivery_date,
            },
            TimeChanges {
                collection_time,
                delivery_time,
            },
            payer,
            Utc::now(),
        )?;

        Ok(session.clone())
    }

    #[tracing::instrument(skip(self, request), fields(token = %request.idempotency_token))]
    async fn commit_quote(&self, id: Uuid, request: CommitRequest) -> Result<Commitment, Error> {
        let handle = self.sessions.get(id)?;
        let mut session = handle.lock().await;

        if session.stage == Stage::Committed {
            return match session.booking_id {
                Some(booking_id) if session.idempotency_token == Some(request.idempotency_token) => {
                    Ok(Commitment::new(self.bookings.find(booking_id).await?))
                }
                _ => Err(invalid_state_error()),
            };
        }

        let catalog = self.catalog.snapshot()?;
        let quote = session.freeze(request.idempotency_token, request.accepted_total, Utc::now())?;

        match self.committer.commit(&quote, &catalog).await {
            Ok(commitment) => {
                session.mark_committed(commitment.booking.id);
                Ok(commitment)
            }
            Err(err) if err.is_price_changed_error() => {
                let quotation = session.requote(&catalog)?;
                tracing::info!(total = %quotation.total(), "session requoted after price change");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}
