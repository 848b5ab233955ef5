use async_trait::async_trait;
use sqlx::{types::Json, Executor, Pool, Postgres, Row};
use uuid::Uuid;

use super::BookingStore;
use crate::entities::Booking;
use crate::error::{duplicate_reference_error, not_found_error, Error};

const UNIQUE_VIOLATION: &str = "23505";
const REFERENCE_CONSTRAINT: &str = "bookings_reference_key";

#[derive(Debug, Clone)]
pub struct PgBookingStore {
    pool: Pool<Postgres>,
}

impl PgBookingStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn is_reference_clash(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
                && db_err.message().contains(REFERENCE_CONSTRAINT)
        }
        _ => false,
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    #[tracing::instrument(skip(self, booking), fields(booking_id = %booking.id))]
    async fn insert(&self, booking: &Booking) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        let result = conn
            .execute(
                sqlx::query(
                    "INSERT INTO bookings (id, reference, idempotency_token, status, payment_status, checkout_session, data) VALUES ($1, $2, $3, $4, $5, $6, $7)",
                )
                .bind(&booking.id)
                .bind(&booking.reference)
                .bind(&booking.idempotency_token)
                .bind(booking.status.name())
                .bind(booking.payment_status.name())
                .bind(booking.checkout.as_ref().map(|c| c.session_id.clone()))
                .bind(Json(booking)),
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_reference_clash(&err) => Err(duplicate_reference_error()),
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(skip(self, booking), fields(booking_id = %booking.id))]
    async fn settle(&self, booking: &Booking) -> Result<bool, Error> {
        let mut conn = self.pool.acquire().await?;

        let result = conn
            .execute(
                sqlx::query(
                    "UPDATE bookings SET status = $2, payment_status = $3, checkout_session = $4, data = $5 WHERE id = $1 AND payment_status = 'unpaid'",
                )
                .bind(&booking.id)
                .bind(booking.status.name())
                .bind(booking.payment_status.name())
                .bind(booking.checkout.as_ref().map(|c| c.session_id.clone()))
                .bind(Json(booking)),
            )
            .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // already paid, or missing
        self.find(booking.id).await.map(|_| false)
    }

    #[tracing::instrument(skip(self))]
    async fn find(&self, id: Uuid) -> Result<Booking, Error> {
        let mut conn = self.pool.acquire().await?;

        let Json(booking): Json<Booking> = conn
            .fetch_optional(sqlx::query("SELECT data FROM bookings WHERE id = $1").bind(&id))
            .await?
            .ok_or_else(not_found_error)?
            .try_get("data")?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_idempotency_token(&self, token: Uuid) -> Result<Option<Booking>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_result = conn
            .fetch_optional(
                sqlx::query("SELECT data FROM bookings WHERE idempotency_token = $1").bind(&token),
            )
            .await?;

        match maybe_result {
            Some(row) => {
                let Json(booking): Json<Booking> = row.try_get("data")?;
                Ok(Some(booking))
            }
            None => Ok(None),
        }
    }
}
