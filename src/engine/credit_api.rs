use super::Engine;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    api::CreditAPI,
    entities::{CreditAccount, CreditAccountStatus},
    error::Error,
    pricing::round_money,
};

#[async_trait]
impl CreditAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn open_credit_account(
        &self,
        credit_limit: Decimal,
        status: CreditAccountStatus,
    ) -> Result<CreditAccount, Error> {
        let account = self
            .ledger
            .open_account(CreditAccount::new(round_money(credit_limit), status))
            .await?;

        tracing::info!(account_id = %account.id, status = %status.name(), "credit account opened");

        Ok(account)
    }

    #[tracing::instrument(skip(self))]
    async fn find_credit_account(&self, id: Uuid) -> Result<CreditAccount, Error> {
        self.ledger.find_account(id).await
    }

    #[tracing::instrument(skip(self))]
    async fn refund_credit(&self, id: Uuid, amount: Decimal) -> Result<CreditAccount, Error> {
        let balance = self.ledger.credit(id, round_money(amount)).await?;

        tracing::info!(account_id = %id, amount = %amount, balance = %balance, "credit refunded");

        self.ledger.find_account(id).await
    }
}
