use axum::extract::{Extension, Json, Path};
use uuid::Uuid;

use crate::entities::Booking;
use crate::error::Error;
use crate::server::DynAPI;

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let booking = api.find_booking(id).await?;

    Ok(booking.into())
}

pub async fn confirm_payment(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let booking = api.confirm_payment(id).await?;

    Ok(booking.into())
}
