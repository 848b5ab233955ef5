use super::Engine;

use async_trait::async_trait;

use crate::{
    api::AddressAPI,
    error::{invalid_input_error, Error},
    external::distance::normalize_postcode,
};

#[async_trait]
impl AddressAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn lookup_addresses(&self, postcode: &str) -> Result<Vec<String>, Error> {
        let postcode = normalize_postcode(postcode);
        if postcode.is_empty() {
            return Err(invalid_input_error());
        }

        self.addresses.lookup(&postcode).await
    }
}
