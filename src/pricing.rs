//! Courier price calculation.
//!
//! Pure and deterministic: the same inputs always produce the same breakdown.
//! The steps run in a fixed order because the service multiplier and the
//! vehicle minimum charge do not commute:
//!
//! 1. night flag from the delivery time, or the collection time when there
//!    is no delivery time
//! 2. per-mile rate, doubled at night
//! 3. distance cost
//! 4. service multiplier
//! 5. vehicle minimum charge as a floor
//! 6. flat admin fee, waived for credit-account payers

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::entities::{Catalog, ClockTime, ServiceTier, VehicleClass};
use crate::error::{
    invalid_distance_error, missing_time_error, unknown_service_error, unknown_vehicle_error, Error,
};

pub const NIGHT_RATE_MULTIPLIER: u32 = 2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub distance_miles: Decimal,
    pub night: bool,
    pub effective_rate: Decimal,
    pub distance_cost: Decimal,
    pub service_multiplier: Decimal,
    pub service_adjusted_cost: Decimal,
    pub min_charge: Decimal,
    pub min_charge_applied: bool,
    pub chargeable_cost: Decimal,
    pub admin_fee: Decimal,
    pub admin_fee_waived: bool,
    pub total: Decimal,
}

/// Everything a price depends on, by reference-data id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingInputs {
    pub distance_miles: Decimal,
    pub vehicle_id: String,
    pub service_id: String,
    pub collection_time: Option<ClockTime>,
    pub delivery_time: Option<ClockTime>,
    pub is_credit_payer: bool,
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn is_night(collection_time: Option<ClockTime>, delivery_time: Option<ClockTime>) -> bool {
    delivery_time
        .or(collection_time)
        .map(|time| time.is_night())
        .unwrap_or(false)
}

pub fn price(
    distance_miles: Decimal,
    vehicle: &VehicleClass,
    collection_time: Option<ClockTime>,
    delivery_time: Option<ClockTime>,
    service: &ServiceTier,
    is_credit_payer: bool,
) -> Result<Breakdown, Error> {
    if distance_miles <= Decimal::ZERO {
        return Err(invalid_distance_error());
    }
    if !vehicle.active {
        return Err(unknown_vehicle_error());
    }
    if !service.active {
        return Err(unknown_service_error());
    }
    if collection_time.is_none() && delivery_time.is_none() {
        return Err(missing_time_error());
    }

    let night = is_night(collection_time, delivery_time);

    let effective_rate = if night {
        vehicle.base_rate * Decimal::from(NIGHT_RATE_MULTIPLIER)
    } else {
        vehicle.base_rate
    };

    let distance_cost = round_money(distance_miles * effective_rate);
    let service_adjusted_cost = round_money(distance_cost * service.multiplier);

    let min_charge_applied = service_adjusted_cost < vehicle.min_charge;
    let chargeable_cost = if min_charge_applied {
        round_money(vehicle.min_charge)
    } else {
        service_adjusted_cost
    };

    let admin_fee = if is_credit_payer {
        Decimal::ZERO
    } else {
        round_money(vehicle.admin_fee)
    };

    Ok(Breakdown {
        distance_miles,
        night,
        effective_rate,
        distance_cost,
        service_multiplier: service.multiplier,
        service_adjusted_cost,
        min_charge: vehicle.min_charge,
        min_charge_applied,
        chargeable_cost,
        admin_fee,
        admin_fee_waived: is_credit_payer,
        total: chargeable_cost + admin_fee,
    })
}

/// Resolves reference data from the snapshot and prices the inputs.
pub fn price_inputs(catalog: &Catalog, inputs: &PricingInputs) -> Result<Breakdown, Error> {
    let vehicle = catalog.vehicle(&inputs.vehicle_id)?;
    let service = catalog.service(&inputs.service_id)?;

    price(
        inputs.distance_miles,
        vehicle,
        inputs.collection_time,
        inputs.delivery_time,
        service,
        inputs.is_credit_payer,
    )
}
