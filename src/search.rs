// Search orchestration: validate, normalize, search, fetch details, parse

use crate::client::{ApiError, FlightApi, SearchQuery};
use crate::flight::{sample_flights, FlightSummary, SearchParams};
use crate::locations::normalize_location;
use crate::parser::parse_flights;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

pub const MISSING_FIELDS: &str = "Please fill in all fields";
pub const NO_PASSENGERS: &str = "Please enter at least one passenger";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Validating,
    Searching,
    Success,
    Failed,
}

// User-facing search failures; Display is the message shown to the user
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("{0}")]
    Validation(String),

    #[error("RapidAPI key not configured. Please add RAPIDAPI_KEY to your environment variables.")]
    Configuration,

    #[error("Flight search session id not returned by the provider. Please try again.")]
    MissingSession,

    #[error("Invalid API key. Please check your RapidAPI configuration.")]
    Unauthorized,

    #[error("Request timeout. Please check your internet connection and try again.")]
    Timeout,

    #[error("No flights found for the specified route and date. Please try different search criteria.")]
    NoFlights,

    #[error("{0}")]
    Provider(String),

    #[error("Failed to search flights. Please try again.")]
    Unknown { detail: String },
}

impl From<ApiError> for SearchError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::MissingApiKey => SearchError::Configuration,
            ApiError::MissingSessionId => SearchError::MissingSession,
            ApiError::Unauthorized => SearchError::Unauthorized,
            ApiError::Timeout(_) => SearchError::Timeout,
            ApiError::ProviderMessage { message, .. } => SearchError::Provider(message),
            // RateLimited normally never gets here: the orchestrator falls back first
            other @ (ApiError::RateLimited
            | ApiError::Status(_)
            | ApiError::NetworkError(_)
            | ApiError::DecodeError(_)) => SearchError::Unknown {
                detail: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Success(Vec<FlightSummary>),
    // Sample data served because the provider answered 429
    RateLimitedFallback(Vec<FlightSummary>),
    Failed(SearchError),
}

impl SearchOutcome {
    pub fn flights(&self) -> &[FlightSummary] {
        match self {
            SearchOutcome::Success(flights) | SearchOutcome::RateLimitedFallback(flights) => flights,
            SearchOutcome::Failed(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&SearchError> {
        match self {
            SearchOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn final_state(&self) -> SearchState {
        match self {
            SearchOutcome::Failed(_) => SearchState::Failed,
            _ => SearchState::Success,
        }
    }
}

// Outcome of one search plus every state it passed through
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRun {
    pub outcome: SearchOutcome,
    pub transitions: Vec<SearchState>,
}

impl SearchRun {
    pub fn state(&self) -> SearchState {
        self.outcome.final_state()
    }
}

pub struct FlightSearch<A: FlightApi> {
    api: A,
}

impl<A: FlightApi> FlightSearch<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Runs one search to completion. Never fails: every error ends in
    /// `SearchOutcome::Failed`, and a 429 from either phase ends in
    /// `SearchOutcome::RateLimitedFallback`.
    pub async fn search(&self, params: &SearchParams) -> SearchRun {
        let mut transitions = vec![SearchState::Idle];
        let outcome = self.run(params, &mut transitions).await;
        transitions.push(outcome.final_state());
        tracing::debug!("Search finished in state {:?}", outcome.final_state());
        SearchRun {
            outcome,
            transitions,
        }
    }

    async fn run(&self, params: &SearchParams, transitions: &mut Vec<SearchState>) -> SearchOutcome {
        transitions.push(SearchState::Validating);
        let query = match prepare_query(params) {
            Ok(query) => query,
            Err(e) => return SearchOutcome::Failed(e),
        };

        transitions.push(SearchState::Searching);
        tracing::debug!(
            "Searching {} -> {} on {} for {} adult(s)",
            query.origin,
            query.destination,
            query.date,
            query.adults
        );

        match self.fetch(&query).await {
            Ok(flights) if flights.is_empty() => SearchOutcome::Failed(SearchError::NoFlights),
            Ok(flights) => {
                tracing::info!("Found {} flights", flights.len());
                SearchOutcome::Success(flights)
            }
            Err(ApiError::RateLimited) => {
                tracing::warn!("Provider rate limited the search, serving sample flights");
                SearchOutcome::RateLimitedFallback(sample_flights())
            }
            Err(e) => {
                tracing::error!("Flight search failed: {}", e);
                SearchOutcome::Failed(e.into())
            }
        }
    }

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<FlightSummary>, ApiError> {
        let session = self.api.start_search(query).await?;
        let payload = self.api.fetch_details(&session).await?;
        Ok(parse_flights(&payload))
    }
}

// Validates user input and converts it into a provider query
pub fn prepare_query(params: &SearchParams) -> Result<SearchQuery, SearchError> {
    let required = [&params.origin, &params.destination, &params.date];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(SearchError::Validation(MISSING_FIELDS.to_string()));
    }
    if params.passengers == 0 {
        return Err(SearchError::Validation(NO_PASSENGERS.to_string()));
    }

    Ok(SearchQuery {
        origin: normalize_location(&params.origin),
        destination: normalize_location(&params.destination),
        date: format_search_date(&params.date),
        adults: params.passengers,
    })
}

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y"];

/// Reformats a date to `YYYY-MM-DD` when it is not already in that shape.
/// Dates that cannot be parsed are returned unchanged.
pub fn format_search_date(date: &str) -> String {
    let trimmed = date.trim();
    if is_iso_date_shape(trimmed) {
        return trimmed.to_string();
    }

    parse_loose_date(trimmed)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| date.to_string())
}

fn parse_loose_date(input: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
}

// Shape only: "2025-13-45" passes
fn is_iso_date_shape(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}
