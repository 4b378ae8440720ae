// Flight search data model shared by the parser, the orchestrator and the store

use serde::{Deserialize, Serialize};

// Search request as entered by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub origin: String,
    pub destination: String,
    pub date: String, // ISO-8601, reformatted to YYYY-MM-DD before the provider call
    pub passengers: u32,
}

impl SearchParams {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        date: impl Into<String>,
        passengers: u32,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            date: date.into(),
            passengers,
        }
    }

    // Header line shown above a result list, e.g. "LAX → JFK • 2025-12-20"
    pub fn route_summary(&self) -> String {
        format!("{} → {} • {}", self.origin, self.destination, self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightEndpoint {
    pub airport: String,
    pub city: String,
    pub time: String,
}

/// One flat, display-ready flight option.
///
/// Built once from a provider itinerary and never mutated afterwards; a new
/// search replaces the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightSummary {
    pub id: String,
    pub airline: String,
    pub price: u64,
    pub currency: String,
    pub departure: FlightEndpoint,
    pub arrival: FlightEndpoint,
    pub duration: String,
    pub stops: u32,
    pub aircraft: String,
}

impl FlightSummary {
    pub fn is_direct(&self) -> bool {
        self.stops == 0
    }

    pub fn stops_label(&self) -> String {
        match self.stops {
            0 => "Direct".to_string(),
            1 => "1 stop".to_string(),
            n => format!("{} stops", n),
        }
    }
}

// Formats provider minutes as "5h 15m"
pub fn format_duration(total_minutes: u64) -> String {
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

fn endpoint(airport: &str, city: &str, time: &str) -> FlightEndpoint {
    FlightEndpoint {
        airport: airport.to_string(),
        city: city.to_string(),
        time: time.to_string(),
    }
}

fn sample(id: &str, airline: &str, price: u64, departs: &str, arrives: &str, aircraft: &str) -> FlightSummary {
    FlightSummary {
        id: id.to_string(),
        airline: airline.to_string(),
        price,
        currency: "USD".to_string(),
        departure: endpoint("LAX", "Los Angeles", departs),
        arrival: endpoint("JFK", "New York", arrives),
        duration: format_duration(315),
        stops: 0,
        aircraft: aircraft.to_string(),
    }
}

/// Fixed list served in place of live results when the provider rate-limits us.
pub fn sample_flights() -> Vec<FlightSummary> {
    vec![
        sample("1", "American Airlines", 299, "08:30 AM", "04:45 PM", "Boeing 737"),
        sample("2", "Delta Air Lines", 325, "10:15 AM", "06:30 PM", "Airbus A320"),
        sample("3", "United Airlines", 280, "01:20 PM", "09:35 PM", "Boeing 757"),
    ]
}
