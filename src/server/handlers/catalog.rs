use axum::extract::{Extension, Json};

use crate::entities::Catalog;
use crate::error::Error;
use crate::server::DynAPI;

pub async fn list(Extension(api): Extension<DynAPI>) -> Result<Json<Catalog>, Error> {
    let catalog = api.list_catalog().await?;

    Ok(catalog.into())
}

pub async fn replace(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<Catalog>,
) -> Result<Json<Catalog>, Error> {
    let catalog = api.replace_catalog(params).await?;

    Ok(catalog.into())
}
