use axum::extract::{Extension, Json, Path};

use crate::error::Error;
use crate::server::DynAPI;

pub async fn lookup(
    Extension(api): Extension<DynAPI>,
    Path(postcode): Path<String>,
) -> Result<Json<Vec<String>>, Error> {
    let addresses = api.lookup_addresses(&postcode).await?;

    Ok(addresses.into())
}
