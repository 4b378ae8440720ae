// Flight search provider client: two-phase search over the Sky Scrapper API on RapidAPI

use crate::provider::{ProviderErrorBody, ProviderSearchResponse};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://sky-scrapper.p.rapidapi.com";
pub const DEFAULT_API_HOST: &str = "sky-scrapper.p.rapidapi.com";
pub const SEARCH_PATH: &str = "/api/v1/flights/searchFlightsMultiStops";
pub const DETAILS_PATH: &str = "/api/v1/flights/getFlightDetails";

// Error types for provider calls
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("RapidAPI key not configured")]
    MissingApiKey,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Invalid API key")]
    Unauthorized,

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ProviderMessage { status_code: u16, message: String },

    #[error("Request failed with status code {0}")]
    Status(u16),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Session id not returned by provider")]
    MissingSessionId,
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_host: String,
    pub timeout_ms: u64,
    pub currency: String,
    pub locale: String,
    pub market: String,
    pub cabin_class: String,
    pub country_code: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            api_host: DEFAULT_API_HOST.to_string(),
            timeout_ms: 30_000,
            currency: "USD".to_string(),
            locale: "en-US".to_string(),
            market: "en-US".to_string(),
            cabin_class: "economy".to_string(),
            country_code: "US".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from a key lookup, e.g. environment variables.
    ///
    /// A missing API key is not an error here; searches report it instead.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let timeout_ms = match lookup("FLIGHT_API_TIMEOUT_MS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ClientError::ConfigError(format!("FLIGHT_API_TIMEOUT_MS is not a number: {}", raw))
            })?,
            None => defaults.timeout_ms,
        };

        Ok(Self {
            api_key: lookup("RAPIDAPI_KEY")
                .or_else(|| lookup("EXPO_PUBLIC_RAPIDAPI_KEY"))
                .unwrap_or_default(),
            api_host: lookup("RAPIDAPI_HOST").unwrap_or(defaults.api_host),
            base_url: lookup("FLIGHT_API_BASE_URL").unwrap_or(defaults.base_url),
            timeout_ms,
            ..defaults
        })
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Opaque token from the first search phase.
///
/// Only the client can mint one, so details cannot be fetched without a
/// successful first call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Normalized search request sent to the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub origin: String,
    pub destination: String,
    pub date: String,
    pub adults: u32,
}

#[derive(Serialize)]
struct LegParam<'a> {
    origin: &'a str,
    destination: &'a str,
    date: &'a str,
}

impl SearchQuery {
    pub fn legs_json(&self) -> String {
        let legs = [LegParam {
            origin: &self.origin,
            destination: &self.destination,
            date: &self.date,
        }];
        serde_json::to_string(&legs).unwrap_or_else(|_| "[]".to_string())
    }
}

// The two provider phases
#[async_trait]
pub trait FlightApi: Send + Sync {
    async fn start_search(&self, query: &SearchQuery) -> Result<SessionId, ApiError>;

    async fn fetch_details(&self, session: &SessionId) -> Result<Value, ApiError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: Bytes,
}

// Raw GET transport, swapped for a recording mock in tests
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, request: HttpRequest) -> Result<HttpReply, ApiError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| ClientError::InitError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_ms,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpReply, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.get(&url).query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| self.map_transport_error(e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.map_transport_error(e))?;

        Ok(HttpReply { status, body })
    }
}

impl ReqwestTransport {
    fn map_transport_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.timeout_ms)
        } else {
            ApiError::NetworkError(error.to_string())
        }
    }
}

pub struct SkyScrapperClient<T: HttpTransport = ReqwestTransport> {
    config: ClientConfig,
    transport: T,
}

impl SkyScrapperClient<ReqwestTransport> {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(&config.base_url, config.timeout_ms)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: HttpTransport> SkyScrapperClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn request(&self, path: &str, query: Vec<(String, String)>) -> Result<HttpRequest, ApiError> {
        if !self.config.has_api_key() {
            return Err(ApiError::MissingApiKey);
        }

        Ok(HttpRequest {
            path: path.to_string(),
            query,
            headers: vec![
                ("x-rapidapi-key".to_string(), self.config.api_key.clone()),
                ("x-rapidapi-host".to_string(), self.config.api_host.clone()),
            ],
        })
    }

    async fn send(&self, request: HttpRequest) -> Result<Bytes, ApiError> {
        tracing::debug!("GET {} ({} params)", request.path, request.query.len());
        let reply = self.transport.get(request).await?;
        check_status(reply)
    }
}

// Maps a non-success status to the matching error
pub fn check_status(reply: HttpReply) -> Result<Bytes, ApiError> {
    match reply.status {
        200..=299 => Ok(reply.body),
        429 => Err(ApiError::RateLimited),
        401 => Err(ApiError::Unauthorized),
        status_code => {
            let message = serde_json::from_slice::<ProviderErrorBody>(&reply.body)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.trim().is_empty());
            match message {
                Some(message) => Err(ApiError::ProviderMessage {
                    status_code,
                    message,
                }),
                None => Err(ApiError::Status(status_code)),
            }
        }
    }
}

#[async_trait]
impl<T: HttpTransport> FlightApi for SkyScrapperClient<T> {
    async fn start_search(&self, query: &SearchQuery) -> Result<SessionId, ApiError> {
        let params = vec![
            ("legs".to_string(), query.legs_json()),
            ("adults".to_string(), query.adults.to_string()),
            ("currency".to_string(), self.config.currency.clone()),
            ("locale".to_string(), self.config.locale.clone()),
            ("market".to_string(), self.config.market.clone()),
            ("cabinClass".to_string(), self.config.cabin_class.clone()),
            ("countryCode".to_string(), self.config.country_code.clone()),
        ];
        let body = self.send(self.request(SEARCH_PATH, params)?).await?;

        let response: ProviderSearchResponse = serde_json::from_slice(&body)
            .map_err(|e| ApiError::DecodeError(format!("invalid search response: {}", e)))?;

        response
            .session_id()
            .map(SessionId::new)
            .ok_or(ApiError::MissingSessionId)
    }

    async fn fetch_details(&self, session: &SessionId) -> Result<Value, ApiError> {
        let params = vec![("sessionId".to_string(), session.as_str().to_string())];
        let body = self.send(self.request(DETAILS_PATH, params)?).await?;

        if body.is_empty() {
            return Err(ApiError::DecodeError(
                "No data received from flight search API".to_string(),
            ));
        }
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::DecodeError(format!("invalid details response: {}", e)))
    }
}


#[cfg(test)]
mod tests {
    use super::mock_transport::{test_config, MockTransport};
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use test_case::test_case;
    use tokio_test::{assert_err, assert_ok};

    fn query() -> SearchQuery {
        SearchQuery {
            origin: "LAXA".to_string(),
            destination: "NYCA".to_string(),
            date: "2025-12-20".to_string(),
            adults: 2,
        }
    }

    fn param<'a>(request: &'a HttpRequest, key: &str) -> Option<&'a str> {
        request
            .query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[tokio::test]
    async fn test_start_search_sends_legs_and_headers() {
        let client = SkyScrapperClient::with_transport(test_config(), MockTransport::new());
        client.transport.push_json(200, json!({"sessionId": "session-1", "status": true}));

        let session = assert_ok!(client.start_search(&query()).await);
        assert_eq!(session.as_str(), "session-1");

        let requests = client.transport.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.path, SEARCH_PATH);
        assert_eq!(
            param(request, "legs"),
            Some(r#"[{"origin":"LAXA","destination":"NYCA","date":"2025-12-20"}]"#)
        );
        assert_eq!(param(request, "adults"), Some("2"));
        assert_eq!(param(request, "currency"), Some("USD"));
        assert_eq!(param(request, "locale"), Some("en-US"));
        assert_eq!(param(request, "market"), Some("en-US"));
        assert_eq!(param(request, "cabinClass"), Some("economy"));
        assert_eq!(param(request, "countryCode"), Some("US"));

        let headers: HashMap<_, _> = request.headers.iter().cloned().collect();
        assert_eq!(headers["x-rapidapi-key"], "test_key");
        assert_eq!(headers["x-rapidapi-host"], DEFAULT_API_HOST);
    }

    #[tokio::test]
    async fn test_missing_session_id() {
        let client = SkyScrapperClient::with_transport(test_config(), MockTransport::new());
        client.transport.push_json(200, json!({"status": true, "data": {}}));

        let error = assert_err!(client.start_search(&query()).await);
        assert_eq!(error, ApiError::MissingSessionId);
    }

    #[tokio::test]
    async fn test_missing_api_key_makes_no_request() {
        let client = SkyScrapperClient::with_transport(ClientConfig::default(), MockTransport::new());

        let error = assert_err!(client.start_search(&query()).await);
        assert_eq!(error, ApiError::MissingApiKey);
        assert_eq!(client.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_details_keyed_by_session() {
        let client = SkyScrapperClient::with_transport(test_config(), MockTransport::new());
        client.transport.push_json(200, json!({"data": {"itineraries": []}}));

        let payload = assert_ok!(client.fetch_details(&SessionId::new("abc")).await);
        assert_eq!(payload, json!({"data": {"itineraries": []}}));

        let request = &client.transport.requests()[0];
        assert_eq!(request.path, DETAILS_PATH);
        assert_eq!(param(request, "sessionId"), Some("abc"));
    }

    #[tokio::test]
    async fn test_fetch_details_rejects_empty_body() {
        let client = SkyScrapperClient::with_transport(test_config(), MockTransport::new());
        client.transport.push_raw(200, "");

        let error = assert_err!(client.fetch_details(&SessionId::new("abc")).await);
        assert!(matches!(error, ApiError::DecodeError(_)));
    }

    #[test_case(429, "{}", ApiError::RateLimited; "rate limited")]
    #[test_case(401, r#"{"message": "nope"}"#, ApiError::Unauthorized; "unauthorized")]
    #[test_case(403, r#"{"message": "You are not subscribed to this API."}"#,
        ApiError::ProviderMessage { status_code: 403, message: "You are not subscribed to this API.".to_string() };
        "provider message")]
    #[test_case(500, "<html>oops</html>", ApiError::Status(500); "status without message")]
    #[test_case(502, r#"{"message": "  "}"#, ApiError::Status(502); "blank message")]
    fn test_check_status(status: u16, body: &'static str, expected: ApiError) {
        let reply = HttpReply {
            status,
            body: Bytes::from_static(body.as_bytes()),
        };
        assert_eq!(check_status(reply).unwrap_err(), expected);
    }

    #[test]
    fn test_check_status_passes_success_through() {
        let reply = HttpReply {
            status: 200,
            body: Bytes::from_static(b"{}"),
        };
        assert_eq!(check_status(reply).unwrap(), Bytes::from_static(b"{}"));
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("EXPO_PUBLIC_RAPIDAPI_KEY", "expo-key"),
            ("FLIGHT_API_TIMEOUT_MS", "5000"),
            ("FLIGHT_API_BASE_URL", "http://localhost:8080"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.api_key, "expo-key");
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.api_host, DEFAULT_API_HOST);
        assert_eq!(config.cabin_class, "economy");
        assert!(config.has_api_key());
    }

    #[test]
    fn test_config_from_lookup_rejects_bad_timeout() {
        let result = ClientConfig::from_lookup(|k| {
            (k == "FLIGHT_API_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(ClientError::ConfigError(_))));
    }

    #[test]
    fn test_config_without_key() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert!(!config.has_api_key());
        assert_eq!(config.timeout_ms, 30_000);
    }
}
