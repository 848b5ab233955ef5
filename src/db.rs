use sqlx::{postgres::PgPoolOptions, Executor, Pool, Postgres};

use crate::error::Error;

pub struct PgPool(pub Pool<Postgres>);

impl PgPool {
    pub async fn new(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        Ok(Self(pool))
    }
}

#[tracing::instrument(skip_all)]
pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), Error> {
    // credit ledger
    pool.execute(
        "CREATE TABLE IF NOT EXISTS credit_accounts (
            id UUID PRIMARY KEY,
            credit_limit NUMERIC(12, 2) NOT NULL CHECK (credit_limit >= 0),
            balance NUMERIC(12, 2) NOT NULL DEFAULT 0 CHECK (balance >= 0 AND balance <= credit_limit),
            status VARCHAR NOT NULL
        )",
    )
    .await?;
    pool.execute(
        "CREATE TABLE IF NOT EXISTS credit_entries (
            id UUID PRIMARY KEY,
            account_id UUID NOT NULL REFERENCES credit_accounts(id),
            amount NUMERIC(12, 2) NOT NULL,
            balance_after NUMERIC(12, 2) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )",
    )
    .await?;
    pool.execute(
        "CREATE INDEX IF NOT EXISTS credit_entries_account_idx ON credit_entries (account_id, created_at)",
    )
    .await?;

    // bookings
    pool.execute(
        "CREATE TABLE IF NOT EXISTS bookings (
            id UUID PRIMARY KEY,
            reference VARCHAR NOT NULL,
            idempotency_token UUID NOT NULL,
            status VARCHAR NOT NULL,
            payment_status VARCHAR NOT NULL,
            checkout_session VARCHAR,
            data JSONB NOT NULL,
            CONSTRAINT bookings_reference_key UNIQUE (reference),
            CONSTRAINT bookings_idempotency_token_key UNIQUE (idempotency_token)
        )",
    )
    .await?;

    Ok(())
}
