use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::{upstream_error, Error};

#[async_trait]
pub trait DistanceProvider {
    async fn distance_miles(&self, origin: &str, destination: &str) -> Result<Decimal, Error>;
}

pub type DynDistanceProvider = Arc<dyn DistanceProvider + Send + Sync>;

const METRES_PER_MILE: f64 = 1609.344;

pub fn metres_to_miles(metres: f64) -> Result<Decimal, Error> {
    Decimal::from_f64_retain(metres / METRES_PER_MILE)
        .map(|miles| miles.round_dp(2))
        .ok_or_else(upstream_error)
}

/// Uppercases, trims and collapses inner whitespace: ` sw1a   1aa` → `SW1A 1AA`.
pub fn normalize_postcode(postcode: &str) -> String {
    postcode
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Distances keyed by normalised postcode pair, each entry living for `ttl`.
pub struct DistanceCache {
    ttl: Duration,
    entries: Mutex<HashMap<(String, String), (Decimal, Instant)>>,
}

impl DistanceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, origin: &str, destination: &str) -> Option<Decimal> {
        let mut entries = self.entries.lock().ok()?;
        let key = (origin.to_string(), destination.to_string());

        match entries.get(&key) {
            Some((miles, stored_at)) if stored_at.elapsed() < self.ttl => Some(*miles),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, origin: &str, destination: &str, miles: Decimal) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|_, (_, stored_at)| stored_at.elapsed() < self.ttl);
            entries.insert(
                (origin.to_string(), destination.to_string()),
                (miles, Instant::now()),
            );
        }
    }
}

#[test]
fn normalizes_postcodes() {
    assert_eq!(normalize_postcode(" sw1a   1aa "), "SW1A 1AA");
    assert_eq!(normalize_postcode("M1 1AE"), "M1 1AE");
}

#[test]
fn converts_metres() {
    use rust_decimal_macros::dec;

    assert_eq!(metres_to_miles(32186.88).unwrap(), dec!(20));
    assert_eq!(metres_to_miles(1000.0).unwrap(), dec!(0.62));
}

#[test]
fn cache_entries_expire() {
    use rust_decimal_macros::dec;

    let cache = DistanceCache::new(Duration::from_millis(20));
    cache.put("SW1A 1AA", "M1 1AE", dec!(163.2));
    assert_eq!(cache.get("SW1A 1AA", "M1 1AE"), Some(dec!(163.2)));
    assert_eq!(cache.get("M1 1AE", "SW1A 1AA"), None);

    std::thread::sleep(Duration::from_millis(40));
    assert_eq!(cache.get("SW1A 1AA", "M1 1AE"), None);
}
