use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{ensure_positive, CreditLedger, DebitOutcome};
use crate::entities::{CreditAccount, CreditAccountStatus, LedgerEntry};
use crate::error::{
    account_not_approved_error, invalid_input_error, ledger_unavailable_error, not_found_error,
    Error,
};

struct AccountCell {
    account: CreditAccount,
    entries: Vec<LedgerEntry>,
}

/// Process-local ledger. Every account sits behind its own mutex, so the
/// check against the limit and the balance change happen as one step.
#[derive(Default)]
pub struct MemoryLedger {
    accounts: RwLock<HashMap<Uuid, Arc<Mutex<AccountCell>>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, account_id: Uuid) -> Result<Arc<Mutex<AccountCell>>, Error> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| ledger_unavailable_error("account index poisoned"))?;

        accounts
            .get(&account_id)
            .cloned()
            .ok_or_else(not_found_error)
    }
}

#[async_trait]
impl CreditLedger for MemoryLedger {
    async fn open_account(&self, account: CreditAccount) -> Result<CreditAccount, Error> {
        if account.credit_limit < Decimal::ZERO
            || account.balance < Decimal::ZERO
            || account.balance > account.credit_limit
        {
            return Err(invalid_input_error());
        }

        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| ledger_unavailable_error("account index poisoned"))?;

        if accounts.contains_key(&account.id) {
            return Err(invalid_input_error());
        }

        accounts.insert(
            account.id,
            Arc::new(Mutex::new(AccountCell {
                account: account.clone(),
                entries: vec![],
            })),
        );

        Ok(account)
    }

    async fn find_account(&self, account_id: Uuid) -> Result<CreditAccount, Error> {
        let cell = self.cell(account_id)?;
        let cell = cell
            .lock()
            .map_err(|_| ledger_unavailable_error("account poisoned"))?;

        Ok(cell.account.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn debit(&self, account_id: Uuid, amount: Decimal) -> Result<DebitOutcome, Error> {
        ensure_positive(amount)?;

        let cell = self.cell(account_id)?;
        let mut cell = cell
            .lock()
            .map_err(|_| ledger_unavailable_error("account poisoned"))?;

        if cell.account.status != CreditAccountStatus::Approved {
            return Err(account_not_approved_error());
        }

        if !cell.account.can_draw(amount) {
            tracing::info!(balance = %cell.account.balance, "debit refused, limit reached");
            return Ok(DebitOutcome::refused(cell.account.balance));
        }

        cell.account.balance += amount;
        let entry = LedgerEntry::new(account_id, amount, cell.account.balance);
        cell.entries.push(entry.clone());

        Ok(DebitOutcome::accepted(entry))
    }

    #[tracing::instrument(skip(self))]
    async fn credit(&self, account_id: Uuid, amount: Decimal) -> Result<Decimal, Error> {
        ensure_positive(amount)?;

        let cell = self.cell(account_id)?;
        let mut cell = cell
            .lock()
            .map_err(|_| ledger_unavailable_error("account poisoned"))?;

        if cell.account.balance < amount {
            return Err(invalid_input_error());
        }

        cell.account.balance -= amount;
        let entry = LedgerEntry::new(account_id, -amount, cell.account.balance);
        cell.entries.push(entry);

        Ok(cell.account.balance)
    }

    async fn entries(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>, Error> {
        let cell = self.cell(account_id)?;
        let cell = cell
            .lock()
            .map_err(|_| ledger_unavailable_error("account poisoned"))?;

        Ok(cell.entries.clone())
    }
}
