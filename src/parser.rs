// Response parsing: nested provider itineraries to flat flight summaries

use crate::flight::{format_duration, FlightEndpoint, FlightSummary};
use crate::provider::{ProviderDetailsResponse, ProviderItinerary, ProviderPlace, ProviderSegment};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

const NOT_AVAILABLE: &str = "N/A";
const UNKNOWN_CITY: &str = "Unknown";
const UNKNOWN_AIRLINE: &str = "Unknown Airline";
const DEFAULT_CURRENCY: &str = "USD";

/// Flattens a provider details payload into flight summaries.
///
/// Never fails: a missing `itineraries` field or a payload that does not
/// match the expected shape yields an empty list. Itineraries that do not
/// decode are skipped individually.
pub fn parse_flights(payload: &Value) -> Vec<FlightSummary> {
    parse_flights_at(payload, Utc::now().timestamp_millis())
}

// Same as parse_flights with a fixed id stamp
pub fn parse_flights_at(payload: &Value, stamp_millis: i64) -> Vec<FlightSummary> {
    let response = match ProviderDetailsResponse::deserialize(payload) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Error parsing flight data: {}", e);
            return Vec::new();
        }
    };

    let Some(itineraries) = response.data.and_then(|d| d.itineraries) else {
        return Vec::new();
    };

    itineraries
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| match ProviderItinerary::deserialize(raw) {
            Ok(itinerary) => Some(summarize(index, &itinerary, stamp_millis)),
            Err(e) => {
                tracing::warn!("Skipping itinerary {}: {}", index, e);
                None
            }
        })
        .collect()
}

fn summarize(index: usize, itinerary: &ProviderItinerary, stamp_millis: i64) -> FlightSummary {
    let leg = itinerary.legs.as_ref().and_then(|legs| legs.first());
    let segments: &[ProviderSegment] = leg
        .and_then(|l| l.segments.as_deref())
        .unwrap_or_default();
    let first = segments.first();
    let last = segments.last();

    let minutes = leg
        .and_then(|l| l.duration_in_minutes)
        .filter(|m| m.is_finite() && *m > 0.0)
        .map_or(0, |m| m.floor() as u64);

    let price = itinerary
        .price
        .as_ref()
        .and_then(|p| p.raw)
        .map_or(0, |raw| raw.round().max(0.0) as u64);

    let currency = itinerary
        .price
        .as_ref()
        .and_then(|p| p.formatted.as_deref())
        .and_then(|formatted| formatted.split(' ').next())
        .filter(|token| !token.is_empty())
        .unwrap_or(DEFAULT_CURRENCY)
        .to_string();

    let carrier = first.and_then(|s| s.marketing_carrier.as_ref());
    let airline = text_or(carrier.and_then(|c| c.name.as_deref()), UNKNOWN_AIRLINE);

    let aircraft = match first.and_then(|s| present(s.flight_number.as_deref())) {
        Some(number) => format!(
            "{} {}",
            carrier.and_then(|c| c.alternate_id.as_deref()).unwrap_or(""),
            number
        ),
        None => NOT_AVAILABLE.to_string(),
    };

    FlightSummary {
        id: format!("flight-{}-{}", index, stamp_millis),
        airline,
        price,
        currency,
        departure: endpoint(
            first.and_then(|s| s.origin.as_ref()),
            first.and_then(|s| s.departure.as_deref()),
        ),
        arrival: endpoint(
            last.and_then(|s| s.destination.as_ref()),
            last.and_then(|s| s.arrival.as_deref()),
        ),
        duration: format_duration(minutes),
        stops: segments.len().saturating_sub(1) as u32,
        aircraft,
    }
}

fn endpoint(place: Option<&ProviderPlace>, timestamp: Option<&str>) -> FlightEndpoint {
    FlightEndpoint {
        airport: text_or(place.and_then(|p| p.id.as_deref()), NOT_AVAILABLE),
        city: text_or(place.and_then(|p| p.name.as_deref()), UNKNOWN_CITY),
        time: timestamp
            .and_then(format_clock_time)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    }
}

// Empty strings count as missing
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn text_or(value: Option<&str>, fallback: &str) -> String {
    present(value).unwrap_or(fallback).to_string()
}

/// Formats a provider timestamp as 12-hour clock time ("08:30 AM").
///
/// Provider timestamps are airport-local and usually carry no offset; those
/// with an offset are shown in their own offset.
pub fn format_clock_time(timestamp: &str) -> Option<String> {
    let naive = if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        dt.naive_local()
    } else {
        NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M"))
            .or_else(|_| NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S"))
            .ok()?
    };
    Some(naive.format("%I:%M %p").to_string())
}
