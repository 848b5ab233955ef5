use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{postgres::PgRow, Executor, Pool, Postgres, Row};
use uuid::Uuid;

use super::{ensure_positive, CreditLedger, DebitOutcome};
use crate::entities::{CreditAccount, CreditAccountStatus, LedgerEntry};
use crate::error::{
    account_not_approved_error, invalid_input_error, ledger_unavailable_error, not_found_error,
    Error,
};

/// Ledger backed by the `credit_accounts` and `credit_entries` tables.
///
/// The balance change and its entry are written by one statement: the
/// conditional `UPDATE` takes the row lock, so concurrent debits on the same
/// account queue behind each other and re-check the limit against the
/// committed balance.
#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: Pool<Postgres>,
}

impl PgLedger {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn account_from_row(row: &PgRow) -> Result<CreditAccount, Error> {
    let status: String = row.try_get("status").map_err(ledger_unavailable_error)?;

    Ok(CreditAccount {
        id: row.try_get("id").map_err(ledger_unavailable_error)?,
        credit_limit: row
            .try_get("credit_limit")
            .map_err(ledger_unavailable_error)?,
        balance: row.try_get("balance").map_err(ledger_unavailable_error)?,
        status: CreditAccountStatus::parse(&status)?,
    })
}

fn entry_from_row(row: &PgRow) -> Result<LedgerEntry, Error> {
    Ok(LedgerEntry {
        id: row.try_get("id").map_err(ledger_unavailable_error)?,
        account_id: row
            .try_get("account_id")
            .map_err(ledger_unavailable_error)?,
        amount: row.try_get("amount").map_err(ledger_unavailable_error)?,
        balance_after: row
            .try_get("balance_after")
            .map_err(ledger_unavailable_error)?,
        created_at: row
            .try_get("created_at")
            .map_err(ledger_unavailable_error)?,
    })
}

#[async_trait]
impl CreditLedger for PgLedger {
    #[tracing::instrument(skip(self))]
    async fn open_account(&self, account: CreditAccount) -> Result<CreditAccount, Error> {
        if account.credit_limit < Decimal::ZERO
            || account.balance < Decimal::ZERO
            || account.balance > account.credit_limit
        {
            return Err(invalid_input_error());
        }

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(ledger_unavailable_error)?;

        conn.execute(
            sqlx::query(
                "INSERT INTO credit_accounts (id, credit_limit, balance, status) VALUES ($1, $2, $3, $4)",
            )
            .bind(&account.id)
            .bind(account.credit_limit)
            .bind(account.balance)
            .bind(account.status.name()),
        )
        .await
        .map_err(ledger_unavailable_error)?;

        Ok(account)
    }

    #[tracing::instrument(skip(self))]
    async fn find_account(&self, account_id: Uuid) -> Result<CreditAccount, Error> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(ledger_unavailable_error)?;

        let row = conn
            .fetch_optional(
                sqlx::query(
                    "SELECT id, credit_limit, balance, status FROM credit_accounts WHERE id = $1",
                )
                .bind(&account_id),
            )
            .await
            .map_err(ledger_unavailable_error)?
            .ok_or_else(not_found_error)?;

        account_from_row(&row)
    }

    #[tracing::instrument(skip(self))]
    async fn debit(&self, account_id: Uuid, amount: Decimal) -> Result<DebitOutcome, Error> {
        ensure_positive(amount)?;

        let query = "
            WITH debited AS (
                UPDATE credit_accounts
                SET balance = balance + $2
                WHERE id = $1
                    AND status = 'approved'
                    AND balance + $2 <= credit_limit
                RETURNING id, balance
            )
            INSERT INTO credit_entries (id, account_id, amount, balance_after, created_at)
            SELECT $3, debited.id, $2, debited.balance, $4 FROM debited
            RETURNING id, account_id, amount, balance_after, created_at
        ";

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(ledger_unavailable_error)?;

        let maybe_entry = conn
            .fetch_optional(
                sqlx::query(query)
                    .bind(&account_id)
                    .bind(amount)
                    .bind(Uuid::new_v4())
                    .bind(Utc::now()),
            )
            .await
            .map_err(ledger_unavailable_error)?;

        if let Some(row) = maybe_entry {
            return Ok(DebitOutcome::accepted(entry_from_row(&row)?));
        }

        // the update matched nothing; this read only explains why
        let account = self.find_account(account_id).await?;

        if account.status != CreditAccountStatus::Approved {
            return Err(account_not_approved_error());
        }

        tracing::info!(balance = %account.balance, "debit refused, limit reached");

        Ok(DebitOutcome::refused(account.balance))
    }

    #[tracing::instrument(skip(self))]
    async fn credit(&self, account_id: Uuid, amount: Decimal) -> Result<Decimal, Error> {
        ensure_positive(amount)?;

        let query = "
            WITH credited AS (
                UPDATE credit_accounts
                SET balance = balance - $2
                WHERE id = $1
                    AND balance - $2 >= 0
                RETURNING id, balance
            )
            INSERT INTO credit_entries (id, account_id, amount, balance_after, created_at)
            SELECT $3, credited.id, -$2, credited.balance, $4 FROM credited
            RETURNING balance_after
        ";

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(ledger_unavailable_error)?;

        let maybe_row = conn
            .fetch_optional(
                sqlx::query(query)
                    .bind(&account_id)
                    .bind(amount)
                    .bind(Uuid::new_v4())
                    .bind(Utc::now()),
            )
            .await
            .map_err(ledger_unavailable_error)?;

        match maybe_row {
            Some(row) => Ok(row
                .try_get("balance_after")
                .map_err(ledger_unavailable_error)?),
            None => {
                // distinguishes a missing account from an over-refund
                self.find_account(account_id).await?;
                Err(invalid_input_error())
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn entries(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>, Error> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(ledger_unavailable_error)?;

        let rows = conn
            .fetch_all(
                sqlx::query(
                    "SELECT id, account_id, amount, balance_after, created_at FROM credit_entries WHERE account_id = $1 ORDER BY created_at ASC",
                )
                .bind(&account_id),
            )
            .await
            .map_err(ledger_unavailable_error)?;

        rows.iter().map(entry_from_row).collect()
    }
}
