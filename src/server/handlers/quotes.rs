use axum::extract::{Extension, Json, Path};
use uuid::Uuid;

use crate::api::{CommitRequest, DetailsRequest, RouteRequest};
use crate::committer::Commitment;
use crate::entities::{QuoteSession, Selection};
use crate::error::Error;
use crate::server::DynAPI;

pub async fn create(Extension(api): Extension<DynAPI>) -> Result<Json<QuoteSession>, Error> {
    let session = api.create_quote().await?;

    Ok(session.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuoteSession>, Error> {
    let session = api.find_quote(id).await?;

    Ok(session.into())
}

pub async fn submit_route(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<RouteRequest>,
) -> Result<Json<QuoteSession>, Error> {
    let session = api.submit_route(id, params).await?;

    Ok(session.into())
}

pub async fn select_vehicle(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<Selection>,
) -> Result<Json<QuoteSession>, Error> {
    let session = api.select_vehicle(id, params).await?;

    Ok(session.into())
}

pub async fn submit_details(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<DetailsRequest>,
) -> Result<Json<QuoteSession>, Error> {
    let session = api.submit_details(id, params).await?;

    Ok(session.into())
}

pub async fn commit(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<CommitRequest>,
) -> Result<Json<Commitment>, Error> {
    let commitment = api.commit_quote(id, params).await?;

    Ok(commitment.into())
}
