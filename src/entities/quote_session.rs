use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{
    Catalog, ClockTime, Details, DistanceSource, Payer, Quotation, Quote, RouteFacts, Selection,
};
use crate::error::{invalid_input_error, invalid_state_error, quote_expired_error, Error};
use crate::pricing::{price_inputs, PricingInputs};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CollectingRoute,
    RouteReady,
    VehicleSelected,
    DetailsEntered,
    Committed,
    Expired,
}

impl Stage {
    pub fn name(&self) -> String {
        match self {
            Self::CollectingRoute => "collecting_route".into(),
            Self::RouteReady => "route_ready".into(),
            Self::VehicleSelected => "vehicle_selected".into(),
            Self::DetailsEntered => "details_entered".into(),
            Self::Committed => "committed".into(),
            Self::Expired => "expired".into(),
        }
    }
}

/// Optional time edits made on the details step.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeChanges {
    pub collection_time: Option<ClockTime>,
    pub delivery_time: Option<ClockTime>,
}

/// Server-held draft of one client's quote, advanced one step at a time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuoteSession {
    pub id: Uuid,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub payer: Payer,
    pub route: Option<RouteFacts>,
    pub selection: Option<Selection>,
    pub details: Option<Details>,
    pub quotation: Option<Quotation>,
    pub idempotency_token: Option<Uuid>,
    pub booking_id: Option<Uuid>,
}

impl QuoteSession {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: Stage::CollectingRoute,
            created_at: now,
            expires_at: None,
            payer: Payer::Card,
            route: None,
            selection: None,
            details: None,
            quotation: None,
            idempotency_token: None,
            booking_id: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (self.stage, self.expires_at) {
            (Stage::Expired, _) => true,
            (Stage::Committed, _) => false,
            (_, Some(expires_at)) => now >= expires_at,
            (_, None) => false,
        }
    }

    /// Fails with `QuoteExpired` once the clock started by `submit_route` has
    /// run out, discarding the whole draft.
    pub fn ensure_live(&mut self, now: DateTime<Utc>) -> Result<(), Error> {
        if self.is_expired(now) {
            self.expire();
            return Err(quote_expired_error());
        }

        match self.stage {
            Stage::Committed => Err(invalid_state_error()),
            _ => Ok(()),
        }
    }

    fn expire(&mut self) {
        self.stage = Stage::Expired;
        self.route = None;
        self.selection = None;
        self.details = None;
        self.quotation = None;
        self.idempotency_token = None;
    }

    #[tracing::instrument(skip(self), fields(session_id = %self.id))]
    pub fn submit_route(
        &mut self,
        route: RouteFacts,
        payer: Payer,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), Error> {
        self.ensure_live(now)?;

        self.route = Some(route);
        self.payer = payer;
        self.selection = None;
        self.details = None;
        self.quotation = None;
        self.idempotency_token = None;
        self.expires_at = Some(now + ttl);
        self.stage = Stage::RouteReady;

        Ok(())
    }

    #[tracing::instrument(skip(self, catalog), fields(session_id = %self.id))]
    pub fn select_vehicle(
        &mut self,
        selection: Selection,
        catalog: &Catalog,
        now: DateTime<Utc>,
    ) -> Result<&Quotation, Error> {
        self.ensure_live(now)?;

        match self.stage {
            Stage::RouteReady | Stage::VehicleSelected | Stage::DetailsEntered => {}
            _ => return Err(invalid_state_error()),
        }

        let route = self.route.as_ref().ok_or_else(invalid_state_error)?;
        let inputs = pricing_inputs(route, &selection, &self.payer);
        let breakdown = price_inputs(catalog, &inputs)?;
        let estimated = route.distance_source == DistanceSource::ClientEstimate;

        self.selection = Some(selection);
        self.stage = Stage::VehicleSelected;

        Ok(&*self
            .quotation
            .insert(Quotation::new(inputs, breakdown, estimated)))
    }

    /// Records contact and address details. Any change to a pricing input
    /// (a time, or the payer type) marks the stored quotation stale so it is
    /// recomputed before money moves. Returns the session's idempotency token.
    #[tracing::instrument(skip(self, details), fields(session_id = %self.id))]
    pub fn submit_details(
        &mut self,
        details: Details,
        times: TimeChanges,
        payer: Option<Payer>,
        now: DateTime<Utc>,
    ) -> Result<Uuid, Error> {
        self.ensure_live(now)?;

        match self.stage {
            Stage::VehicleSelected | Stage::DetailsEntered => {}
            _ => return Err(invalid_state_error()),
        }

        let route = self.route.as_mut().ok_or_else(invalid_state_error)?;
        if let Some(collection_time) = times.collection_time {
            route.collection_time = Some(collection_time);
        }
        if let Some(delivery_time) = times.delivery_time {
            route.delivery_time = Some(delivery_time);
        }
        if let Some(payer) = payer {
            self.payer = payer;
        }

        let current = self.current_inputs();
        if let Some(quotation) = self.quotation.as_mut() {
            if Some(&quotation.inputs) != current.as_ref() {
                tracing::info!("pricing inputs changed, quotation marked stale");
                quotation.stale = true;
            }
        }

        self.details = Some(details);
        self.stage = Stage::DetailsEntered;

        Ok(*self.idempotency_token.get_or_insert_with(Uuid::new_v4))
    }

    pub fn current_inputs(&self) -> Option<PricingInputs> {
        match (&self.route, &self.selection) {
            (Some(route), Some(selection)) => Some(pricing_inputs(route, selection, &self.payer)),
            _ => None,
        }
    }

    /// Replaces the stored quotation with a fresh price for the current inputs.
    pub fn requote(&mut self, catalog: &Catalog) -> Result<&Quotation, Error> {
        let inputs = self.current_inputs().ok_or_else(invalid_state_error)?;
        let breakdown = price_inputs(catalog, &inputs)?;
        let estimated = self
            .route
            .as_ref()
            .map(|route| route.distance_source == DistanceSource::ClientEstimate)
            .unwrap_or(false);

        Ok(&*self
            .quotation
            .insert(Quotation::new(inputs, breakdown, estimated)))
    }

    /// Snapshots the draft for commit. The session itself is left in
    /// `DetailsEntered` so a failed commit can be retried.
    pub fn freeze(
        &mut self,
        idempotency_token: Uuid,
        accepted_total: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<Quote, Error> {
        self.ensure_live(now)?;

        if self.stage != Stage::DetailsEntered {
            return Err(invalid_state_error());
        }
        if self.idempotency_token != Some(idempotency_token) {
            return Err(invalid_input_error());
        }

        let inputs = self.current_inputs().ok_or_else(invalid_state_error)?;
        let (route, selection, details) = match (&self.route, &self.selection, &self.details) {
            (Some(route), Some(selection), Some(details)) => {
                (route.clone(), selection.clone(), details.clone())
            }
            _ => return Err(invalid_state_error()),
        };

        let agreed_total = match &self.quotation {
            Some(quotation) if !quotation.stale && quotation.inputs == inputs => {
                Some(accepted_total.unwrap_or_else(|| quotation.total()))
            }
            _ => None,
        };

        Ok(Quote {
            session_id: self.id,
            route,
            selection,
            details,
            payer: self.payer.clone(),
            inputs,
            agreed_total,
            idempotency_token,
            created_at: self.created_at,
        })
    }

    pub fn mark_committed(&mut self, booking_id: Uuid) {
        self.stage = Stage::Committed;
        self.booking_id = Some(booking_id);
    }
}

fn pricing_inputs(route: &RouteFacts, selection: &Selection, payer: &Payer) -> PricingInputs {
    PricingInputs {
        distance_miles: route.distance_miles,
        vehicle_id: selection.vehicle_id.clone(),
        service_id: selection.service_id.clone(),
        collection_time: route.collection_time,
        delivery_time: route.delivery_time,
        is_credit_payer: payer.is_credit(),
    }
}
