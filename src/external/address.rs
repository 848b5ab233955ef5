use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{upstream_error, Error};

#[async_trait]
pub trait AddressProvider {
    fn name(&self) -> &str;
    async fn lookup(&self, postcode: &str) -> Result<Vec<String>, Error>;
}

pub type DynAddressProvider = Arc<dyn AddressProvider + Send + Sync>;

/// Tries each provider in priority order. An error or an empty answer falls
/// through to the next provider; the first non-empty list wins.
#[derive(Clone, Default)]
pub struct AddressLookup {
    providers: Vec<DynAddressProvider>,
}

impl AddressLookup {
    pub fn new(providers: Vec<DynAddressProvider>) -> Self {
        Self { providers }
    }

    #[tracing::instrument(skip(self))]
    pub async fn lookup(&self, postcode: &str) -> Result<Vec<String>, Error> {
        let mut failures = 0;

        for provider in self.providers.iter() {
            match provider.lookup(postcode).await {
                Ok(addresses) if !addresses.is_empty() => return Ok(addresses),
                Ok(_) => {
                    tracing::info!(provider = provider.name(), "no addresses, trying next provider");
                }
                Err(err) => {
                    failures += 1;
                    tracing::warn!(provider = provider.name(), error = %err, "address provider failed");
                }
            }
        }

        if failures > 0 && failures == self.providers.len() {
            return Err(upstream_error());
        }

        Ok(vec![])
    }
}

#[derive(Deserialize)]
struct Response {
    addresses: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct HttpAddressProvider {
    client: reqwest::Client,
    name: String,
    api_base: String,
    api_key: String,
}

impl HttpAddressProvider {
    pub fn new(client: reqwest::Client, name: String, api_base: String, api_key: String) -> Self {
        Self {
            client,
            name,
            api_base,
            api_key,
        }
    }
}

#[async_trait]
impl AddressProvider for HttpAddressProvider {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self), fields(provider = %self.name))]
    async fn lookup(&self, postcode: &str) -> Result<Vec<String>, Error> {
        let res = self
            .client
            .get(format!("{}/addresses/{}", self.api_base, postcode))
            .query(&[("api-key", self.api_key.as_str())])
            .send()
            .await?;

        let status_code = res.status().as_u16();

        if status_code == 404 {
            return Ok(vec![]);
        } else if status_code != 200 {
            return Err(upstream_error());
        }

        let data: Response = res.json().await?;

        Ok(data.addresses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted {
        name: &'static str,
        answer: Option<Vec<&'static str>>,
    }

    #[async_trait]
    impl AddressProvider for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn lookup(&self, _postcode: &str) -> Result<Vec<String>, Error> {
            match &self.answer {
                Some(list) => Ok(list.iter().map(|s| s.to_string()).collect()),
                None => Err(upstream_error()),
            }
        }
    }

    fn provider(name: &'static str, answer: Option<Vec<&'static str>>) -> DynAddressProvider {
        Arc::new(Scripted { name, answer })
    }

    #[tokio::test]
    async fn falls_through_failures_and_empty_answers() {
        let lookup = AddressLookup::new(vec![
            provider("primary", None),
            provider("secondary", Some(vec![])),
            provider("tertiary", Some(vec!["1 High St", "2 High St"])),
            provider("never", Some(vec!["unreachable"])),
        ]);

        assert_eq!(
            lookup.lookup("AB1 2CD").await.unwrap(),
            vec!["1 High St".to_string(), "2 High St".to_string()]
        );
    }

    #[tokio::test]
    async fn all_failing_is_an_upstream_error() {
        let lookup = AddressLookup::new(vec![provider("a", None), provider("b", None)]);
        assert!(lookup.lookup("AB1 2CD").await.is_err());

        let lookup = AddressLookup::new(vec![provider("a", None), provider("b", Some(vec![]))]);
        assert!(lookup.lookup("AB1 2CD").await.unwrap().is_empty());
    }
}
