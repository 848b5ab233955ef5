use super::Engine;

use async_trait::async_trait;

use crate::{api::CatalogAPI, entities::Catalog, error::Error};

#[async_trait]
impl CatalogAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn list_catalog(&self) -> Result<Catalog, Error> {
        Ok(self.catalog.snapshot()?.active())
    }

    #[tracing::instrument(skip(self, catalog))]
    async fn replace_catalog(&self, catalog: Catalog) -> Result<Catalog, Error> {
        catalog.validate()?;

        let active = catalog.active();
        self.catalog.replace(catalog)?;

        tracing::info!(
            vehicles = active.vehicles.len(),
            services = active.services.len(),
            "catalog replaced"
        );

        Ok(active)
    }
}
