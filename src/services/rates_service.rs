//! Cached USD to PHP exchange rate.
//!
//! The rate collaborator is refreshed at most once an hour, with a bounded
//! request timeout. Any failure keeps the cached value — callers always get
//! a rate, never an error.

use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Refresh interval
const RATE_TTL: Duration = Duration::from_secs(3600);

/// Outbound request timeout
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct RatesResponse {
    rates: std::collections::HashMap<String, f64>,
}

struct RateCache {
    rate: f64,
    fetched_at: Option<Instant>,
}

/// Currency rate service
pub struct RatesService {
    http: reqwest::Client,
    endpoint: String,
    cache: RwLock<RateCache>,
}

impl RatesService {
    /// Create a service with a fallback rate served until the first
    /// successful fetch.
    pub fn new(endpoint: String, fallback_rate: f64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            endpoint,
            cache: RwLock::new(RateCache {
                rate: fallback_rate,
                fetched_at: None,
            }),
        }
    }

    /// Current USD to PHP rate, refreshing the cache when stale.
    pub async fn usd_to_php(&self) -> f64 {
        {
            let cache = self.cache.read().await;
            if let Some(fetched_at) = cache.fetched_at {
                if fetched_at.elapsed() < RATE_TTL {
                    return cache.rate;
                }
            }
        }

        match self.fetch().await {
            Some(rate) => {
                let mut cache = self.cache.write().await;
                cache.rate = rate;
                cache.fetched_at = Some(Instant::now());
                tracing::info!(rate, "Currency rate updated");
                rate
            }
            None => {
                // Keep serving the cached value; retry on the next call.
                let mut cache = self.cache.write().await;
                cache.fetched_at = Some(Instant::now());
                cache.rate
            }
        }
    }

    async fn fetch(&self) -> Option<f64> {
        let resp = match self.http.get(&self.endpoint).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "Could not fetch currency rate");
                return None;
            }
        };
        let resp = match resp.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "Currency rate endpoint error");
                return None;
            }
        };
        match resp.json::<RatesResponse>().await {
            Ok(parsed) => parsed.rates.get("PHP").copied(),
            Err(e) => {
                tracing::warn!(error = %e, "Malformed currency rate response");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unresolvable_endpoint_degrades_to_fallback() {
        // .invalid never resolves, so the fetch fails and the fallback
        // value is served.
        let rates = RatesService::new("http://rates.invalid/latest/USD".into(), 58.0);
        assert_eq!(rates.usd_to_php().await, 58.0);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_retried_within_ttl() {
        let rates = RatesService::new("http://rates.invalid/latest/USD".into(), 58.0);
        let _ = rates.usd_to_php().await;
        // Second call hits the cache and returns immediately.
        let start = Instant::now();
        assert_eq!(rates.usd_to_php().await, 58.0);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
