//! Credit-account balances.
//!
//! A debit is a single conditional step: the balance grows by `amount` only
//! if the result stays within the credit limit. Implementations never split
//! this into a read followed by a write. Each account is its own
//! serialization domain; there is no cross-account locking.

mod memory;
mod postgres;

pub use memory::MemoryLedger;
pub use postgres::PgLedger;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{CreditAccount, LedgerEntry};
use crate::error::{invalid_input_error, Error};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebitOutcome {
    pub new_balance: Decimal,
    pub ok: bool,
    /// Entry recorded with the debit; `None` when the debit was refused.
    pub entry: Option<LedgerEntry>,
}

impl DebitOutcome {
    pub fn accepted(entry: LedgerEntry) -> Self {
        Self {
            new_balance: entry.balance_after,
            ok: true,
            entry: Some(entry),
        }
    }

    pub fn refused(balance: Decimal) -> Self {
        Self {
            new_balance: balance,
            ok: false,
            entry: None,
        }
    }
}

#[async_trait]
pub trait CreditLedger {
    async fn open_account(&self, account: CreditAccount) -> Result<CreditAccount, Error>;
    async fn find_account(&self, account_id: Uuid) -> Result<CreditAccount, Error>;
    async fn debit(&self, account_id: Uuid, amount: Decimal) -> Result<DebitOutcome, Error>;
    async fn credit(&self, account_id: Uuid, amount: Decimal) -> Result<Decimal, Error>;
    async fn entries(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>, Error>;
}

pub type DynLedger = Arc<dyn CreditLedger + Send + Sync>;

fn ensure_positive(amount: Decimal) -> Result<(), Error> {
    if amount <= Decimal::ZERO {
        return Err(invalid_input_error());
    }

    Ok(())
}
