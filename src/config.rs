use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{config_error, Error};
use crate::external::payment::CheckoutMode;

#[derive(Clone, Debug)]
pub struct AddressBackend {
    pub name: String,
    pub api_base: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub listen_addr: SocketAddr,
    pub google_maps_api_base: String,
    pub google_maps_api_key: String,
    pub payment_api_base: String,
    pub payment_api_key: String,
    pub address_backends: Vec<AddressBackend>,
    pub address_api_key: String,
    pub catalog_path: Option<String>,
    pub settings: Settings,
}

/// Timing knobs the engine runs with.
#[derive(Clone, Debug)]
pub struct Settings {
    pub quote_ttl: chrono::Duration,
    pub distance_cache_ttl: Duration,
    pub external_timeout: Duration,
    pub distance_retry_backoff: Duration,
    pub payment_mode: CheckoutMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quote_ttl: chrono::Duration::minutes(15),
            distance_cache_ttl: Duration::from_secs(24 * 60 * 60),
            external_timeout: Duration::from_secs(5),
            distance_retry_backoff: Duration::from_millis(250),
            payment_mode: CheckoutMode::Test,
        }
    }
}

fn parsed_or<T: FromStr>(name: &str, default: T) -> Result<T, Error> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| config_error(name)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err.into()),
    }
}

/// Parses `name=https://base,other=https://base2`.
fn address_backends(raw: &str) -> Result<Vec<AddressBackend>, Error> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((name, api_base)) if !name.is_empty() && !api_base.is_empty() => {
                Ok(AddressBackend {
                    name: name.trim().to_string(),
                    api_base: api_base.trim().to_string(),
                })
            }
            _ => Err(config_error("ADDRESS_PROVIDERS")),
        })
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        let payment_mode: CheckoutMode = parsed_or("PAYMENT_MODE", CheckoutMode::Test)?;

        let settings = Settings {
            quote_ttl: chrono::Duration::seconds(parsed_or("QUOTE_TTL_SECS", 900)?),
            distance_cache_ttl: Duration::from_secs(parsed_or("DISTANCE_CACHE_TTL_SECS", 86400)?),
            external_timeout: Duration::from_millis(parsed_or("EXTERNAL_TIMEOUT_MS", 5000)?),
            distance_retry_backoff: Duration::from_millis(parsed_or(
                "DISTANCE_RETRY_BACKOFF_MS",
                250,
            )?),
            payment_mode,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            database_max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 5)?,
            listen_addr: parsed_or("LISTEN_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            google_maps_api_base: env::var("GOOGLE_MAPS_API_BASE")?,
            google_maps_api_key: env::var("GOOGLE_MAPS_API_KEY")?,
            payment_api_base: env::var("PAYMENT_API_BASE")?,
            payment_api_key: env::var("PAYMENT_API_KEY")?,
            address_backends: address_backends(&env::var("ADDRESS_PROVIDERS").unwrap_or_default())?,
            address_api_key: env::var("ADDRESS_API_KEY").unwrap_or_default(),
            catalog_path: env::var("CATALOG_PATH").ok(),
            settings,
        })
    }
}

#[test]
fn parses_address_backends() {
    let backends = address_backends("ideal=https://api.ideal.test, getaddress=https://ga.test").unwrap();
    assert_eq!(backends.len(), 2);
    assert_eq!(backends[0].name, "ideal");
    assert_eq!(backends[1].api_base, "https://ga.test");

    assert!(address_backends("").unwrap().is_empty());
    assert!(address_backends("broken").is_err());
}
