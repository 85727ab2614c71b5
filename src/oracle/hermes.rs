//! Pyth Hermes REST oracle adapter.
//!
//! Fetches the latest published price for a feed from a Hermes endpoint
//! (`/v2/updates/price/latest`). A short-lived in-process cache coalesces
//! the orchestrator's polls so repeated fetches within the TTL do not hit
//! the network again.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::domain::{FeedId, PricePoint};
use crate::error::OracleError;

use super::PriceOracle;

/// Latest-price response envelope from Hermes.
#[derive(Debug, Deserialize)]
struct LatestPriceResponse {
    #[serde(default)]
    parsed: Vec<ParsedPriceUpdate>,
}

#[derive(Debug, Deserialize)]
struct ParsedPriceUpdate {
    id: String,
    price: RawPrice,
}

/// Hermes serializes mantissa and confidence as decimal strings.
#[derive(Debug, Deserialize)]
struct RawPrice {
    price: String,
    conf: String,
    expo: i32,
    publish_time: i64,
}

#[derive(Debug, Clone)]
struct CachedPrice {
    feed: FeedId,
    point: PricePoint,
    fetched_at: Instant,
}

/// REST client for the Pyth Hermes price service.
pub struct HermesOracle {
    client: Client,
    endpoint: Url,
    cache_ttl: Duration,
    cache: Mutex<Option<CachedPrice>>,
}

impl HermesOracle {
    /// Create a new Hermes oracle client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        endpoint: Url,
        request_timeout: Duration,
        cache_ttl: Duration,
    ) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(OracleError::Http)?;

        Ok(Self {
            client,
            endpoint,
            cache_ttl,
            cache: Mutex::new(None),
        })
    }

    fn cached(&self, feed: &FeedId) -> Option<PricePoint> {
        let cache = self.cache.lock();
        cache
            .as_ref()
            .filter(|c| &c.feed == feed && c.fetched_at.elapsed() < self.cache_ttl)
            .map(|c| c.point)
    }

    fn store(&self, feed: &FeedId, point: PricePoint) {
        *self.cache.lock() = Some(CachedPrice {
            feed: feed.clone(),
            point,
            fetched_at: Instant::now(),
        });
    }

    fn request_url(&self, feed: &FeedId) -> Result<Url, OracleError> {
        let mut url = self
            .endpoint
            .join("/v2/updates/price/latest")
            .map_err(|e| OracleError::Malformed {
                reason: format!("bad endpoint: {e}"),
            })?;
        url.query_pairs_mut()
            .append_pair("ids[]", feed.as_str())
            .append_pair("parsed", "true");
        Ok(url)
    }
}

/// Compare feed ids ignoring case and a leading `0x`.
fn feed_matches(response_id: &str, feed: &FeedId) -> bool {
    let wanted = feed.as_str().trim_start_matches("0x");
    response_id.trim_start_matches("0x").eq_ignore_ascii_case(wanted)
}

fn parse_point(raw: &RawPrice) -> Result<PricePoint, OracleError> {
    let price = raw.price.parse::<i64>().map_err(|_| OracleError::Malformed {
        reason: format!("non-integer price mantissa '{}'", raw.price),
    })?;
    let conf = raw.conf.parse::<u64>().map_err(|_| OracleError::Malformed {
        reason: format!("non-integer confidence '{}'", raw.conf),
    })?;
    Ok(PricePoint::new(price, raw.expo, conf, raw.publish_time))
}

#[async_trait]
impl PriceOracle for HermesOracle {
    async fn latest_price(&self, feed: &FeedId) -> Result<PricePoint, OracleError> {
        if let Some(point) = self.cached(feed) {
            return Ok(point);
        }

        let url = self.request_url(feed)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(OracleError::Http)?
            .error_for_status()
            .map_err(OracleError::Http)?;

        let body: LatestPriceResponse = response.json().await.map_err(OracleError::Http)?;
        let update = body
            .parsed
            .iter()
            .find(|u| feed_matches(&u.id, feed))
            .ok_or_else(|| OracleError::MissingFeed {
                feed: feed.to_string(),
            })?;

        let point = parse_point(&update.price)?;
        self.store(feed, point);
        Ok(point)
    }

    fn source_name(&self) -> &'static str {
        "hermes"
    }
}
