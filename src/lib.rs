// Flight search client core: provider search, response parsing, app state

pub mod auth;
pub mod bookings;
pub mod client;
pub mod flight;
pub mod locations;
pub mod parser;
pub mod provider;
pub mod search;
pub mod store;

// Re-export key types for convenience
pub use auth::{AuthBridge, AuthError, AuthSession, AuthUser, IdentityProvider, SupabaseProvider};
pub use bookings::{Booking, BookingLedger, BookingStatus};
pub use client::{ApiError, ClientConfig, ClientError, FlightApi, SessionId, SkyScrapperClient};
pub use flight::{FlightEndpoint, FlightSummary, SearchParams};
pub use locations::{normalize_location, LocationCode};
pub use parser::parse_flights;
pub use search::{FlightSearch, SearchError, SearchOutcome, SearchRun, SearchState};
pub use store::{AppStore, AuthState, FlightState};
