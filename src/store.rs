// Application state shared between screens: flight results and auth session

use crate::auth::{AuthSession, AuthUser};
use crate::client::FlightApi;
use crate::flight::{FlightSummary, SearchParams};
use crate::search::{FlightSearch, SearchOutcome, SearchRun};
use parking_lot::RwLock;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightState {
    pub flights: Vec<FlightSummary>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub search_params: Option<SearchParams>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub session: Option<AuthSession>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Single source of truth for the UI layer.
///
/// Every update takes the write lock once, so readers never observe a
/// half-applied change. Overlapping searches resolve last write wins.
#[derive(Debug, Default)]
pub struct AppStore {
    flight: RwLock<FlightState>,
    auth: RwLock<AuthState>,
}

impl AppStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flight(&self) -> FlightState {
        self.flight.read().clone()
    }

    pub fn auth(&self) -> AuthState {
        self.auth.read().clone()
    }

    pub fn begin_search(&self) {
        let mut state = self.flight.write();
        state.is_loading = true;
        state.error = None;
    }

    // Flights and the params that produced them land in one write
    pub fn finish_search(&self, params: SearchParams, outcome: &SearchOutcome) {
        let mut state = self.flight.write();
        state.is_loading = false;
        state.flights = outcome.flights().to_vec();
        state.error = outcome.error().map(|e| e.to_string());
        state.search_params = Some(params);
    }

    pub fn clear_flights(&self) {
        let mut state = self.flight.write();
        state.flights.clear();
        state.search_params = None;
        state.error = None;
    }

    pub fn clear_flight_error(&self) {
        self.flight.write().error = None;
    }

    /// Runs a search and records its result. The lock is never held across
    /// the provider round-trips.
    pub async fn search_flights<A: FlightApi>(
        &self,
        engine: &FlightSearch<A>,
        params: SearchParams,
    ) -> SearchRun {
        self.begin_search();
        let run = engine.search(&params).await;
        self.finish_search(params, &run.outcome);
        run
    }

    pub fn login_start(&self) {
        let mut state = self.auth.write();
        state.is_loading = true;
        state.error = None;
    }

    pub fn set_session(&self, session: AuthSession) {
        let mut state = self.auth.write();
        state.user = Some(session.user.clone());
        state.session = Some(session);
        state.is_authenticated = true;
        state.is_loading = false;
        state.error = None;
    }

    pub fn login_failure(&self, message: String) {
        let mut state = self.auth.write();
        state.user = None;
        state.session = None;
        state.is_authenticated = false;
        state.is_loading = false;
        state.error = Some(message);
    }

    // Form-level error; leaves any existing session alone
    pub fn auth_error(&self, message: String) {
        self.auth.write().error = Some(message);
    }

    // Request finished without producing a session
    pub fn auth_settled(&self) {
        self.auth.write().is_loading = false;
    }

    pub fn logout(&self) {
        *self.auth.write() = AuthState::default();
    }

    pub fn clear_auth_error(&self) {
        self.auth.write().error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::mock_identity::session;
    use crate::client::mock_transport::{test_config, MockTransport};
    use crate::client::SkyScrapperClient;
    use crate::flight::sample_flights;
    use crate::search::{SearchError, SearchState};
    use serde_json::json;
    use std::sync::Arc;

    fn params(origin: &str) -> SearchParams {
        SearchParams::new(origin, "JFK", "2025-12-20", 1)
    }

    #[test]
    fn test_finish_search_writes_flights_with_params() {
        let store = AppStore::new();
        store.begin_search();
        assert!(store.flight().is_loading);

        store.finish_search(params("LAX"), &SearchOutcome::Success(sample_flights()));

        let state = store.flight();
        assert!(!state.is_loading);
        assert_eq!(state.flights.len(), 3);
        assert_eq!(state.search_params, Some(params("LAX")));
        assert_eq!(state.error, None);
    }

    #[test]
    fn test_failure_replaces_previous_results() {
        let store = AppStore::new();
        store.finish_search(params("LAX"), &SearchOutcome::Success(sample_flights()));
        store.finish_search(params("SFO"), &SearchOutcome::Failed(SearchError::NoFlights));

        let state = store.flight();
        assert!(state.flights.is_empty());
        assert_eq!(state.search_params, Some(params("SFO")));
        assert_eq!(state.error, Some(SearchError::NoFlights.to_string()));
    }

    #[test]
    fn test_clear_flights_and_errors() {
        let store = AppStore::new();
        store.finish_search(params("LAX"), &SearchOutcome::Failed(SearchError::Timeout));
        store.clear_flight_error();
        assert_eq!(store.flight().error, None);
        assert!(store.flight().search_params.is_some());

        store.clear_flights();
        assert_eq!(store.flight(), FlightState::default());
    }

    #[test]
    fn test_auth_lifecycle() {
        let store = AppStore::new();
        store.login_start();
        assert!(store.auth().is_loading);

        store.set_session(session("u1"));
        let auth = store.auth();
        assert!(auth.is_authenticated);
        assert_eq!(auth.user.map(|u| u.id), Some("u1".to_string()));

        store.login_failure("Login failed".to_string());
        assert!(!store.auth().is_authenticated);
        assert_eq!(store.auth().error.as_deref(), Some("Login failed"));

        store.set_session(session("u2"));
        store.auth_error("Please fill in all fields".to_string());
        let auth = store.auth();
        assert!(auth.is_authenticated);
        assert_eq!(auth.error.as_deref(), Some("Please fill in all fields"));

        store.clear_auth_error();
        store.logout();
        assert_eq!(store.auth(), AuthState::default());
    }

    #[tokio::test]
    async fn test_search_flights_records_rate_limit_fallback() {
        let engine = FlightSearch::new(SkyScrapperClient::with_transport(test_config(), MockTransport::new()));
        engine.api().transport().push_json(429, json!({"message": "Too many requests"}));
        let store = AppStore::new();

        let run = store.search_flights(&engine, params("LAX")).await;

        assert_eq!(run.state(), SearchState::Success);
        let state = store.flight();
        assert_eq!(state.flights, sample_flights());
        assert_eq!(state.search_params, Some(params("LAX")));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_concurrent_searches_last_write_wins() {
        let store = Arc::new(AppStore::new());
        let mut handles = Vec::new();
        for origin in ["LAX", "SFO", "ORD", "MIA"] {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let engine = FlightSearch::new(SkyScrapperClient::with_transport(test_config(), MockTransport::new()));
                store.search_flights(&engine, params(origin)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Whichever search finished last, its params and flights were stored together
        let state = store.flight();
        assert!(!state.is_loading);
        let stored_origin = state.search_params.map(|p| p.origin);
        assert!(matches!(stored_origin.as_deref(), Some("LAX" | "SFO" | "ORD" | "MIA")));
        assert!(state.flights.is_empty());
        assert!(state.error.is_some());
    }
}
