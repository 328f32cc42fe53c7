//! ThingSpeak telemetry client
//!
//! Pulls raw feed entries from a ThingSpeak channel and converts channel
//! values into numbers. The sync engine only sees the [`FeedSource`] trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::ThingSpeakConfig;
use crate::services::reading_store::Measurements;

/// Outbound request timeout; the client never retries
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// ThingSpeak caps `results` at 8000
pub const MAX_RESULTS: u32 = 8000;

/// Field series responses are reused for this long
const FIELD_CACHE_TTL_SECS: u64 = 15;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ThingSpeak API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid field number: {0}. Must be between 1 and 8.")]
    InvalidField(u8),

    #[error("THINGSPEAK_WRITE_API_KEY is not configured")]
    WriteKeyMissing,

    #[error("ThingSpeak rejected the update")]
    Rejected,
}

/// One entry of a channel feed, as returned by the provider
///
/// Channel fields distinguish "absent" (`None`) from "present but null"
/// (`Some(Value::Null)`); only absence counts against validity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedEntry {
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub entry_id: Option<i64>,
    #[serde(default, deserialize_with = "present")]
    pub field1: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub field2: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub field3: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub field4: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub field5: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub field6: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub field7: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub field8: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl FeedEntry {
    /// Raw value of channel field `n` (1-8)
    pub fn field(&self, n: u8) -> Option<&Value> {
        match n {
            1 => self.field1.as_ref(),
            2 => self.field2.as_ref(),
            3 => self.field3.as_ref(),
            4 => self.field4.as_ref(),
            5 => self.field5.as_ref(),
            6 => self.field6.as_ref(),
            7 => self.field7.as_ref(),
            8 => self.field8.as_ref(),
            _ => None,
        }
    }

    /// Provider creation time, interpreted as UTC
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Fields 1-5 mapped onto the five measurement channels
    pub fn measurements(&self) -> Measurements {
        Measurements {
            temperature: parse_channel_value(self.field1.as_ref()),
            humidity: parse_channel_value(self.field2.as_ref()),
            soil_moisture: parse_channel_value(self.field3.as_ref()),
            soil_ph: parse_channel_value(self.field4.as_ref()),
            light_intensity: parse_channel_value(self.field5.as_ref()),
        }
    }
}

/// `feeds` is kept raw so a single bad entry cannot sink the whole response
#[derive(Debug, Deserialize)]
struct FeedsResponse {
    #[serde(default)]
    feeds: Vec<Value>,
}

/// Decode feed entries one by one. Undecodable entries are replaced by an
/// empty entry, which `is_valid_feed` then rejects like any other unusable one.
fn decode_feeds(raw: Vec<Value>, path: &str) -> Vec<FeedEntry> {
    raw.into_iter()
        .map(|value| {
            serde_json::from_value::<FeedEntry>(value).unwrap_or_else(|e| {
                tracing::debug!(path, error = %e, "Undecodable feed entry");
                FeedEntry::default()
            })
        })
        .collect()
}

/// An entry is usable iff it has a creation time and at least one of the
/// five measurement fields is present.
pub fn is_valid_feed(entry: &FeedEntry) -> bool {
    let has_timestamp = entry
        .created_at
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty());

    has_timestamp && (1..=5).any(|n| entry.field(n).is_some())
}

/// Convert a raw channel value to a finite number, falling back to `0.0`.
/// Never fails.
pub fn parse_channel_value(raw: Option<&Value>) -> f64 {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Source of raw telemetry entries
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Newest entry, or `None` when the channel is empty or the entry is unusable
    async fn fetch_latest(&self) -> Result<Option<FeedEntry>, TelemetryError>;

    /// Up to `count` recent entries, oldest first
    async fn fetch_recent(&self, count: u32) -> Result<Vec<FeedEntry>, TelemetryError>;

    /// Up to `results` entries for a single channel field
    async fn fetch_field(&self, field: u8, results: u32) -> Result<Vec<FeedEntry>, TelemetryError>;
}

#[derive(Clone)]
pub struct ThingSpeakClient {
    client: Client,
    base_url: String,
    channel_id: String,
    read_api_key: String,
    write_api_key: Option<String>,
    field_cache: Arc<Cache<(u8, u32), Vec<FeedEntry>>>,
}

impl ThingSpeakClient {
    pub fn new(config: &ThingSpeakConfig) -> Result<Self, TelemetryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let field_cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(Duration::from_secs(FIELD_CACHE_TTL_SECS))
            .build();

        tracing::info!(
            channel_id = %config.channel_id,
            base_url = %config.base_url,
            "ThingSpeak client initialized"
        );

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            channel_id: config.channel_id.clone(),
            read_api_key: config.read_api_key.clone(),
            write_api_key: config.write_api_key.clone(),
            field_cache: Arc::new(field_cache),
        })
    }

    /// GET a channel resource and decode its JSON body; an empty body yields `None`
    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<Value>, TelemetryError> {
        let url = format!("{}/channels/{}/{}", self.base_url, self.channel_id, path);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(&[("api_key", self.read_api_key.as_str())])
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            return Err(TelemetryError::Status { status, body });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| TelemetryError::Malformed(format!("{}: {}", path, e)))
    }

    /// Write one entry to the channel using the write API key.
    /// Returns the provider's new entry id.
    pub async fn push_entry(&self, measurements: &Measurements) -> Result<i64, TelemetryError> {
        let write_key = self
            .write_api_key
            .as_deref()
            .ok_or(TelemetryError::WriteKeyMissing)?;

        let url = format!("{}/update", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", write_key.to_string()),
                ("field1", measurements.temperature.to_string()),
                ("field2", measurements.humidity.to_string()),
                ("field3", measurements.soil_moisture.to_string()),
                ("field4", measurements.soil_ph.to_string()),
                ("field5", measurements.light_intensity.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            return Err(TelemetryError::Status { status, body });
        }

        // ThingSpeak answers with the new entry id, or 0 when the update was refused
        let body = response.text().await?;
        match body.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(TelemetryError::Rejected),
        }
    }
}

#[async_trait]
impl FeedSource for ThingSpeakClient {
    async fn fetch_latest(&self) -> Result<Option<FeedEntry>, TelemetryError> {
        tracing::debug!("Fetching latest entry from ThingSpeak");

        let body = self.get_json("feeds/last.json", &[]).await?;

        // An empty channel answers with `-1` rather than an object
        let entry = match body {
            Some(value @ Value::Object(_)) => serde_json::from_value::<FeedEntry>(value).ok(),
            _ => None,
        };

        match entry {
            Some(entry) if is_valid_feed(&entry) => Ok(Some(entry)),
            _ => {
                tracing::warn!("No valid data received from ThingSpeak");
                Ok(None)
            }
        }
    }

    async fn fetch_recent(&self, count: u32) -> Result<Vec<FeedEntry>, TelemetryError> {
        let count = count.clamp(1, MAX_RESULTS);
        tracing::debug!(count, "Fetching recent entries from ThingSpeak");

        let Some(body) = self
            .get_json("feeds.json", &[("results", count.to_string())])
            .await?
        else {
            return Ok(vec![]);
        };

        let response: FeedsResponse = serde_json::from_value(body)
            .map_err(|e| TelemetryError::Malformed(format!("feeds.json: {}", e)))?;

        tracing::debug!(received = response.feeds.len(), "Received feed entries");
        Ok(decode_feeds(response.feeds, "feeds.json"))
    }

    async fn fetch_field(&self, field: u8, results: u32) -> Result<Vec<FeedEntry>, TelemetryError> {
        if !(1..=8).contains(&field) {
            return Err(TelemetryError::InvalidField(field));
        }
        let results = results.clamp(1, MAX_RESULTS);
        let cache_key = (field, results);

        if let Some(cached) = self.field_cache.get(&cache_key).await {
            tracing::debug!(field, results, "Cache hit for field series");
            return Ok(cached);
        }

        let path = format!("fields/{}.json", field);
        let body = self
            .get_json(&path, &[("results", results.to_string())])
            .await?
            .ok_or_else(|| TelemetryError::Malformed(format!("{}: empty body", path)))?;

        let feeds = match body.get("feeds").and_then(Value::as_array) {
            Some(feeds) => feeds
                .iter()
                .filter_map(|value| match FeedEntry::deserialize(value) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        tracing::debug!(path = %path, error = %e, "Skipping undecodable feed entry");
                        None
                    }
                })
                .collect::<Vec<_>>(),
            None => {
                return Err(TelemetryError::Malformed(format!(
                    "{}: missing feeds array",
                    path
                )));
            }
        };

        self.field_cache.insert(cache_key, feeds.clone()).await;
        Ok(feeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: Value) -> FeedEntry {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_channel_value_fallbacks() {
        assert_eq!(parse_channel_value(None), 0.0);
        assert_eq!(parse_channel_value(Some(&Value::Null)), 0.0);
        assert_eq!(parse_channel_value(Some(&json!(""))), 0.0);
        assert_eq!(parse_channel_value(Some(&json!("abc"))), 0.0);
        assert_eq!(parse_channel_value(Some(&json!(true))), 0.0);
    }

    #[test]
    fn test_parse_channel_value_numbers() {
        assert_eq!(parse_channel_value(Some(&json!("23.5"))), 23.5);
        assert_eq!(parse_channel_value(Some(&json!(" 6.8 "))), 6.8);
        assert_eq!(parse_channel_value(Some(&json!(41))), 41.0);
        assert_eq!(parse_channel_value(Some(&json!("-3"))), -3.0);
    }

    #[test]
    fn test_parse_channel_value_rejects_non_finite() {
        assert_eq!(parse_channel_value(Some(&json!("NaN"))), 0.0);
        assert_eq!(parse_channel_value(Some(&json!("inf"))), 0.0);
        assert_eq!(parse_channel_value(Some(&json!("-infinity"))), 0.0);
    }

    #[test]
    fn test_feed_without_fields_is_invalid() {
        let feed = entry(json!({ "created_at": "2024-01-01T00:00:00Z", "entry_id": 7 }));
        assert!(!is_valid_feed(&feed));
    }

    #[test]
    fn test_feed_with_single_field_is_valid() {
        let feed = entry(json!({ "created_at": "2024-01-01T00:00:00Z", "field3": "41.2" }));
        assert!(is_valid_feed(&feed));
    }

    #[test]
    fn test_null_field_counts_as_present() {
        let feed = entry(json!({ "created_at": "2024-01-01T00:00:00Z", "field2": null }));
        assert!(feed.field2.is_some());
        assert!(is_valid_feed(&feed));
        assert_eq!(feed.measurements().humidity, 0.0);
    }

    #[test]
    fn test_feed_without_timestamp_is_invalid() {
        let feed = entry(json!({ "field1": "20.1", "field2": "55" }));
        assert!(!is_valid_feed(&feed));

        let feed = entry(json!({ "created_at": "", "field1": "20.1" }));
        assert!(!is_valid_feed(&feed));
    }

    #[test]
    fn test_only_first_five_fields_count_for_validity() {
        let feed = entry(json!({ "created_at": "2024-01-01T00:00:00Z", "field7": "1" }));
        assert!(!is_valid_feed(&feed));
        assert_eq!(feed.field(7), Some(&json!("1")));
    }

    #[test]
    fn test_measurements_mapping() {
        let feed = entry(json!({
            "created_at": "2024-01-01T00:00:00Z",
            "field1": "24.5",
            "field2": "61",
            "field3": "38.2",
            "field4": "6.4",
            "field5": "1200"
        }));

        let m = feed.measurements();
        assert_eq!(m.temperature, 24.5);
        assert_eq!(m.humidity, 61.0);
        assert_eq!(m.soil_moisture, 38.2);
        assert_eq!(m.soil_ph, 6.4);
        assert_eq!(m.light_intensity, 1200.0);
    }

    #[test]
    fn test_created_at_parsing() {
        let feed = entry(json!({ "created_at": "2024-01-01T00:00:00Z", "field1": "1" }));
        let ts = feed.created_at_utc().unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-01T00:00:00+00:00");

        let feed = entry(json!({ "created_at": "yesterday", "field1": "1" }));
        assert!(feed.created_at_utc().is_none());
    }

    #[test]
    fn test_error_display() {
        let err = TelemetryError::InvalidField(9);
        assert!(err.to_string().contains("Invalid field number: 9"));

        let err = TelemetryError::Status {
            status: 404,
            body: "not found".to_string(),
        };
        assert!(err.to_string().contains("404"));
    }

    mod http {
        use super::*;
        use axum::{Json, Router, http::StatusCode, routing::get};
        use std::sync::atomic::{AtomicUsize, Ordering};

        /// Serve `router` on an ephemeral port and point a client at it
        async fn client_for(router: Router) -> ThingSpeakClient {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });

            ThingSpeakClient::new(&ThingSpeakConfig {
                base_url: format!("http://{}", addr),
                channel_id: "42".to_string(),
                read_api_key: "read-key".to_string(),
                write_api_key: Some("write-key".to_string()),
            })
            .unwrap()
        }

        #[tokio::test]
        async fn test_latest_on_empty_channel_is_none() {
            let client = client_for(
                Router::new().route("/channels/42/feeds/last.json", get(|| async { "-1" })),
            )
            .await;

            assert!(client.fetch_latest().await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_latest_with_empty_body_is_none() {
            let client = client_for(
                Router::new().route("/channels/42/feeds/last.json", get(|| async { "" })),
            )
            .await;

            assert!(client.fetch_latest().await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_latest_returns_valid_entry() {
            let client = client_for(Router::new().route(
                "/channels/42/feeds/last.json",
                get(|| async {
                    Json(json!({
                        "created_at": "2024-03-01T02:00:00Z",
                        "entry_id": 311,
                        "field1": "25.1",
                        "field2": "60"
                    }))
                }),
            ))
            .await;

            let latest = client.fetch_latest().await.unwrap().unwrap();
            assert_eq!(latest.entry_id, Some(311));
            assert_eq!(latest.measurements().temperature, 25.1);
        }

        #[tokio::test]
        async fn test_non_success_status_is_reported() {
            let client = client_for(Router::new().route(
                "/channels/42/feeds/last.json",
                get(|| async { (StatusCode::BAD_REQUEST, "bad api key") }),
            ))
            .await;

            match client.fetch_latest().await {
                Err(TelemetryError::Status { status, body }) => {
                    assert_eq!(status, 400);
                    assert_eq!(body, "bad api key");
                }
                other => panic!("expected status error, got {:?}", other.map(|_| ())),
            }
        }

        #[tokio::test]
        async fn test_invalid_json_is_malformed() {
            let client = client_for(
                Router::new().route("/channels/42/feeds.json", get(|| async { "not json" })),
            )
            .await;

            assert!(matches!(
                client.fetch_recent(10).await,
                Err(TelemetryError::Malformed(_))
            ));
        }

        #[tokio::test]
        async fn test_bad_entry_does_not_drop_batch() {
            let client = client_for(Router::new().route(
                "/channels/42/feeds.json",
                get(|| async {
                    Json(json!({
                        "channel": { "id": 42 },
                        "feeds": [
                            { "created_at": "2024-03-01T02:00:00Z", "entry_id": 1, "field1": "22.0" },
                            { "created_at": "2024-03-01T02:05:00Z", "entry_id": "x", "field1": "23.0" }
                        ]
                    }))
                }),
            ))
            .await;

            let feeds = client.fetch_recent(10).await.unwrap();
            assert_eq!(feeds.len(), 2);
            assert!(is_valid_feed(&feeds[0]));
            assert_eq!(feeds[0].measurements().temperature, 22.0);
            assert!(!is_valid_feed(&feeds[1]));
        }

        #[tokio::test]
        async fn test_field_series_skips_bad_entries() {
            let client = client_for(Router::new().route(
                "/channels/42/fields/2.json",
                get(|| async {
                    Json(json!({
                        "feeds": [
                            { "created_at": "2024-03-01T02:00:00Z", "entry_id": 1, "field2": "55" },
                            { "created_at": "2024-03-01T02:05:00Z", "entry_id": "x", "field2": "56" },
                            { "created_at": "2024-03-01T02:10:00Z", "entry_id": 3, "field2": "57" }
                        ]
                    }))
                }),
            ))
            .await;

            let series = client.fetch_field(2, 10).await.unwrap();
            let ids: Vec<_> = series.iter().map(|e| e.entry_id).collect();
            assert_eq!(ids, vec![Some(1), Some(3)]);
        }

        #[tokio::test]
        async fn test_field_series_without_feeds_is_malformed() {
            let client = client_for(Router::new().route(
                "/channels/42/fields/1.json",
                get(|| async { Json(json!({ "channel": { "id": 42 } })) }),
            ))
            .await;

            assert!(matches!(
                client.fetch_field(1, 10).await,
                Err(TelemetryError::Malformed(_))
            ));
        }

        #[tokio::test]
        async fn test_field_series_is_cached() {
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = calls.clone();
            let client = client_for(Router::new().route(
                "/channels/42/fields/3.json",
                get(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Json(json!({
                            "feeds": [{ "created_at": "2024-03-01T02:00:00Z", "field3": "40.5" }]
                        }))
                    }
                }),
            ))
            .await;

            let first = client.fetch_field(3, 5).await.unwrap();
            let second = client.fetch_field(3, 5).await.unwrap();
            assert_eq!(first.len(), 1);
            assert_eq!(second.len(), 1);
            assert_eq!(calls.load(Ordering::SeqCst), 1);

            // A different result count is a different cache entry
            client.fetch_field(3, 6).await.unwrap();
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn test_field_number_out_of_range() {
            let client = client_for(Router::new()).await;

            assert!(matches!(
                client.fetch_field(9, 10).await,
                Err(TelemetryError::InvalidField(9))
            ));
            assert!(matches!(
                client.fetch_field(0, 10).await,
                Err(TelemetryError::InvalidField(0))
            ));
        }

        #[tokio::test]
        async fn test_push_entry_refused_update() {
            let client =
                client_for(Router::new().route("/update", get(|| async { "0" }))).await;

            assert!(matches!(
                client.push_entry(&Measurements::default()).await,
                Err(TelemetryError::Rejected)
            ));
        }
    }
}
