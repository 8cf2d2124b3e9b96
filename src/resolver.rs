//! POI lookup adapter with bounded retry.
//!
//! Resolves an interval centroid to nearby place names through an
//! external reverse-geocoding service. Rate-limit responses (HTTP 429)
//! are retried with exponential backoff up to a bounded attempt budget;
//! every other failure degrades the single lookup rather than aborting
//! the pipeline.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;

use crate::error::{Result, StopoverError};
use crate::{GpsPoint, ResolverConfig};

/// External reverse-geocoding / POI service queried by coordinate.
///
/// `lookup` returns candidate place names near the point. An empty list
/// means the service answered and knows nothing nearby; errors are
/// surfaced so the resolver can distinguish rate limiting from hard
/// failures.
pub trait ReverseGeocoder: Send + Sync {
    fn lookup(&self, point: GpsPoint) -> impl Future<Output = Result<Vec<String>>> + Send;
}

// ============================================================================
// Overpass client
// ============================================================================

/// Overpass API client querying amenities around a coordinate.
pub struct OverpassClient {
    client: reqwest::Client,
    endpoint: String,
    search_radius_m: f64,
}

impl OverpassClient {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StopoverError::HttpError {
                message: format!("failed to create HTTP client: {}", e),
                status_code: None,
            })?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            search_radius_m: config.search_radius_m,
        })
    }

    /// Overpass QL for named amenities (ways and nodes) around a point.
    fn amenity_query(&self, point: &GpsPoint) -> String {
        let around = format!(
            "{:.0},{:.6},{:.6}",
            self.search_radius_m, point.latitude, point.longitude
        );
        format!(
            "[out:json];(way[amenity](around:{a});node[amenity](around:{a}););(._;>;);out body;",
            a = around
        )
    }
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl ReverseGeocoder for OverpassClient {
    async fn lookup(&self, point: GpsPoint) -> Result<Vec<String>> {
        debug!(
            "overpass lookup at ({:.5}, {:.5})",
            point.latitude, point.longitude
        );

        let query = self.amenity_query(&point);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("data", query.as_str())])
            .send()
            .await
            .map_err(|e| StopoverError::HttpError {
                message: e.to_string(),
                status_code: e.status().map(|s| s.as_u16()),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(StopoverError::RateLimited);
        }
        if !status.is_success() {
            return Err(StopoverError::HttpError {
                message: format!("HTTP {}", status),
                status_code: Some(status.as_u16()),
            });
        }

        let body: OverpassResponse =
            response
                .json()
                .await
                .map_err(|e| StopoverError::MalformedResponse {
                    message: e.to_string(),
                })?;

        let mut names = Vec::new();
        for element in body.elements {
            if let Some(name) = element.tags.get("name") {
                names.push(name.clone());
            }
            if let Some(operator) = element.tags.get("operator") {
                names.push(operator.clone());
            }
        }
        Ok(names)
    }
}

// ============================================================================
// Retrying resolver
// ============================================================================

/// Wraps a [`ReverseGeocoder`] with the retry policy.
///
/// Rate-limit state (the attempt counter) lives inside each `resolve`
/// call; there is no ambient shared counter across lookups.
pub struct PoiResolver<G> {
    geocoder: G,
    max_retries: u32,
    backoff: Duration,
}

impl<G: ReverseGeocoder> PoiResolver<G> {
    pub fn new(geocoder: G, config: &ResolverConfig) -> Self {
        Self {
            geocoder,
            max_retries: config.max_retries,
            backoff: config.backoff,
        }
    }

    /// Resolve a centroid to candidate place names.
    ///
    /// `Some(names)` when the service answered (the list may be empty),
    /// `None` when the lookup degraded: retries exhausted on 429, or any
    /// other failure. Never an error; one bad lookup must not halt the
    /// remaining intervals.
    pub async fn resolve(&self, point: GpsPoint) -> Option<Vec<String>> {
        let mut attempt: u32 = 0;
        loop {
            match self.geocoder.lookup(point).await {
                Ok(names) => return Some(names),
                Err(StopoverError::RateLimited) => {
                    if attempt >= self.max_retries {
                        warn!(
                            "rate limit budget exhausted for ({:.5}, {:.5})",
                            point.latitude, point.longitude
                        );
                        return None;
                    }
                    // Exponential backoff: base, 2x, 4x, 8x, capped at 16x
                    let backoff = self.backoff * (1u32 << attempt.min(4));
                    debug!("429, retry {} after {:?}", attempt + 1, backoff);
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!(
                        "POI lookup failed for ({:.5}, {:.5}): {}",
                        point.latitude, point.longitude, err
                    );
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Geocoder that replays a scripted sequence of responses.
    struct ScriptedGeocoder {
        script: Mutex<VecDeque<Result<Vec<String>>>>,
        calls: AtomicU32,
    }

    impl ScriptedGeocoder {
        fn new(script: Vec<Result<Vec<String>>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ReverseGeocoder for ScriptedGeocoder {
        async fn lookup(&self, _point: GpsPoint) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(StopoverError::Internal {
                        message: "script exhausted".to_string(),
                    })
                })
        }
    }

    fn fast_config() -> ResolverConfig {
        ResolverConfig {
            max_retries: 3,
            backoff: Duration::from_millis(1),
            ..ResolverConfig::default()
        }
    }

    fn point() -> GpsPoint {
        GpsPoint::new(51.5074, -0.1278)
    }

    #[tokio::test]
    async fn test_success_on_last_budgeted_attempt() {
        let geocoder = ScriptedGeocoder::new(vec![
            Err(StopoverError::RateLimited),
            Err(StopoverError::RateLimited),
            Err(StopoverError::RateLimited),
            Ok(vec!["Coffee Corner".to_string()]),
        ]);
        let resolver = PoiResolver::new(geocoder, &fast_config());

        let names = resolver.resolve(point()).await;
        assert_eq!(names, Some(vec!["Coffee Corner".to_string()]));
        assert_eq!(resolver.geocoder.calls(), 4);
    }

    #[tokio::test]
    async fn test_exhausted_retries_degrade_to_unresolved() {
        let geocoder = ScriptedGeocoder::new(vec![
            Err(StopoverError::RateLimited),
            Err(StopoverError::RateLimited),
            Err(StopoverError::RateLimited),
            Err(StopoverError::RateLimited),
        ]);
        let resolver = PoiResolver::new(geocoder, &fast_config());

        assert!(resolver.resolve(point()).await.is_none());
        // Initial attempt + 3 retries
        assert_eq!(resolver.geocoder.calls(), 4);
    }

    #[tokio::test]
    async fn test_non_rate_limit_error_is_not_retried() {
        let geocoder = ScriptedGeocoder::new(vec![Err(StopoverError::HttpError {
            message: "connection refused".to_string(),
            status_code: None,
        })]);
        let resolver = PoiResolver::new(geocoder, &fast_config());

        assert!(resolver.resolve(point()).await.is_none());
        assert_eq!(resolver.geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_answer_is_resolved_not_degraded() {
        let geocoder = ScriptedGeocoder::new(vec![Ok(vec![])]);
        let resolver = PoiResolver::new(geocoder, &fast_config());

        assert_eq!(resolver.resolve(point()).await, Some(vec![]));
    }

    #[test]
    fn test_amenity_query_embeds_radius_and_coordinate() {
        let client = OverpassClient::new(&ResolverConfig::default()).unwrap();
        let query = client.amenity_query(&point());
        assert!(query.contains("around:25,51.507400,-0.127800"));
        assert!(query.contains("[out:json]"));
        assert!(query.contains("way[amenity]"));
        assert!(query.contains("node[amenity]"));
    }

    #[test]
    fn test_overpass_response_decoding() {
        let body = r#"{"elements":[
            {"tags":{"name":"Blue Cafe","amenity":"cafe"}},
            {"tags":{"operator":"Transit Co"}},
            {"type":"node","id":1}
        ]}"#;
        let parsed: OverpassResponse = serde_json::from_str(body).unwrap();
        let mut names = Vec::new();
        for element in parsed.elements {
            if let Some(name) = element.tags.get("name") {
                names.push(name.clone());
            }
            if let Some(operator) = element.tags.get("operator") {
                names.push(operator.clone());
            }
        }
        assert_eq!(names, vec!["Blue Cafe", "Transit Co"]);
    }
}
