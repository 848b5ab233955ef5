use axum::extract::{Extension, Json, Path};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{CreditAccount, CreditAccountStatus};
use crate::error::Error;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct OpenParams {
    credit_limit: Decimal,
    status: CreditAccountStatus,
}

#[derive(Serialize, Deserialize)]
pub struct RefundParams {
    amount: Decimal,
}

pub async fn open(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<OpenParams>,
) -> Result<Json<CreditAccount>, Error> {
    let account = api
        .open_credit_account(params.credit_limit, params.status)
        .await?;

    Ok(account.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<CreditAccount>, Error> {
    let account = api.find_credit_account(id).await?;

    Ok(account.into())
}

pub async fn refund(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<RefundParams>,
) -> Result<Json<CreditAccount>, Error> {
    let account = api.refund_credit(id, params.amount).await?;

    Ok(account.into())
}
