use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{unexpected_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Approved,
    Suspended,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Pending => "pending".into(),
            Self::Approved => "approved".into(),
            Self::Suspended => "suspended".into(),
        }
    }

    pub fn parse(name: &str) -> Result<Self, Error> {
        match name {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "suspended" => Ok(Self::Suspended),
            _ => Err(unexpected_error(format!("unknown account status {}", name))),
        }
    }
}

/// Revolving credit line. `balance` is the amount drawn and stays within
/// `0..=credit_limit`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreditAccount {
    pub id: Uuid,
    pub credit_limit: Decimal,
    pub balance: Decimal,
    pub status: Status,
}

impl CreditAccount {
    pub fn new(credit_limit: Decimal, status: Status) -> Self {
        Self {
            id: Uuid::new_v4(),
            credit_limit,
            balance: Decimal::ZERO,
            status,
        }
    }

    pub fn available(&self) -> Decimal {
        self.credit_limit - self.balance
    }

    pub fn can_draw(&self, amount: Decimal) -> bool {
        self.balance + amount <= self.credit_limit
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Positive for a debit (drawing credit), negative for a refund.
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(account_id: Uuid, amount: Decimal, balance_after: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            amount,
            balance_after,
            created_at: Utc::now(),
        }
    }
}
