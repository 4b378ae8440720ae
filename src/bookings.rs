// In-memory bookings ledger backing the bookings tab

use crate::flight::{FlightSummary, SearchParams};
use chrono::{NaiveDate, NaiveTime};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Confirmed,
    Pending,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Confirmed => write!(f, "Confirmed"),
            BookingStatus::Pending => write!(f, "Pending"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub reference: String,
    pub airline: String,
    pub route: String,
    pub date: String,
    pub time: String,
    pub status: BookingStatus,
}

#[derive(Debug, Default)]
pub struct BookingLedger {
    bookings: DashMap<String, Booking>,
}

impl BookingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger preloaded with the two bookings shown before the user books anything.
    pub fn with_samples() -> Self {
        let ledger = Self::new();
        for booking in [
            Booking {
                id: "1".to_string(),
                reference: "CONF10001".to_string(),
                airline: "American Airlines".to_string(),
                route: "LAX → JFK".to_string(),
                date: "2024-01-15".to_string(),
                time: "08:30 AM".to_string(),
                status: BookingStatus::Confirmed,
            },
            Booking {
                id: "2".to_string(),
                reference: "CONF10002".to_string(),
                airline: "Delta Air Lines".to_string(),
                route: "SFO → ORD".to_string(),
                date: "2024-01-22".to_string(),
                time: "02:15 PM".to_string(),
                status: BookingStatus::Pending,
            },
        ] {
            ledger.bookings.insert(booking.id.clone(), booking);
        }
        ledger
    }

    // New bookings start as Pending
    pub fn reserve(&self, flight: &FlightSummary, params: &SearchParams) -> Booking {
        let mut rng = rand::thread_rng();
        loop {
            let id = format!("booking-{}", rng.gen::<u32>());
            // The entry holds the shard lock, so a drawn id is claimed at most once
            let Entry::Vacant(slot) = self.bookings.entry(id.clone()) else {
                continue;
            };

            let booking = Booking {
                id,
                reference: format!("CONF{}", rng.gen_range(10000..100000)),
                airline: flight.airline.clone(),
                route: format!("{} → {}", flight.departure.airport, flight.arrival.airport),
                date: params.date.clone(),
                time: flight.departure.time.clone(),
                status: BookingStatus::Pending,
            };

            tracing::info!("Reserved {} as {}", booking.route, booking.reference);
            slot.insert(booking.clone());
            return booking;
        }
    }

    pub fn confirm(&self, id: &str) -> Option<Booking> {
        let mut entry = self.bookings.get_mut(id)?;
        entry.status = BookingStatus::Confirmed;
        Some(entry.clone())
    }

    pub fn get(&self, id: &str) -> Option<Booking> {
        self.bookings.get(id).map(|b| b.clone())
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    /// All bookings, earliest first.
    pub fn list(&self) -> Vec<Booking> {
        let mut all: Vec<Booking> = self.bookings.iter().map(|b| b.value().clone()).collect();
        all.sort_by(|a, b| {
            sort_key(a)
                .cmp(&sort_key(b))
                .then_with(|| a.id.cmp(&b.id))
        });
        all
    }
}

// Unparsable dates and times sort after parsable ones
fn sort_key(booking: &Booking) -> (NaiveDate, NaiveTime, &str, &str) {
    (
        NaiveDate::parse_from_str(&booking.date, "%Y-%m-%d").unwrap_or(NaiveDate::MAX),
        NaiveTime::parse_from_str(&booking.time, "%I:%M %p")
            .unwrap_or_else(|_| NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default()),
        &booking.date,
        &booking.time,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::sample_flights;
    use std::sync::Arc;

    #[test]
    fn test_samples_are_listed_in_date_order() {
        let ledger = BookingLedger::with_samples();
        let bookings = ledger.list();

        assert_eq!(bookings.len(), 2);
        assert_eq!(bookings[0].airline, "American Airlines");
        assert_eq!(bookings[0].status, BookingStatus::Confirmed);
        assert_eq!(bookings[1].route, "SFO → ORD");
        assert_eq!(bookings[1].status.to_string(), "Pending");
    }

    #[test]
    fn test_reserve_then_confirm() {
        let ledger = BookingLedger::new();
        let flight = &sample_flights()[0];
        let params = SearchParams::new("LAX", "JFK", "2025-12-20", 1);

        let booking = ledger.reserve(flight, &params);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.route, "LAX → JFK");
        assert_eq!(booking.date, "2025-12-20");
        assert_eq!(booking.time, "08:30 AM");
        assert!(booking.reference.starts_with("CONF"));
        assert_eq!(booking.reference.len(), 9);

        let confirmed = ledger.confirm(&booking.id).unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(ledger.get(&booking.id), Some(confirmed));
        assert_eq!(ledger.confirm("missing"), None);
    }

    #[test]
    fn test_same_day_sorted_by_clock_time() {
        let ledger = BookingLedger::new();
        let params = SearchParams::new("LAX", "JFK", "2025-12-20", 1);
        let flights = sample_flights();

        // 01:20 PM reserved first, 08:30 AM second
        ledger.reserve(&flights[2], &params);
        ledger.reserve(&flights[0], &params);

        let times: Vec<String> = ledger.list().into_iter().map(|b| b.time).collect();
        assert_eq!(times, vec!["08:30 AM".to_string(), "01:20 PM".to_string()]);
    }

    #[test]
    fn test_concurrent_reservations() {
        let ledger = Arc::new(BookingLedger::new());
        let params = SearchParams::new("LAX", "JFK", "2025-12-20", 2);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let params = params.clone();
                std::thread::spawn(move || {
                    for flight in sample_flights() {
                        ledger.reserve(&flight, &params);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.len(), 24);
        let mut ids: Vec<String> = ledger.list().into_iter().map(|b| b.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 24);
    }

    #[test]
    fn test_reserve_never_replaces_existing_booking() {
        let ledger = BookingLedger::with_samples();
        let params = SearchParams::new("LAX", "JFK", "2025-12-20", 1);
        for flight in sample_flights() {
            ledger.reserve(&flight, &params);
        }

        assert_eq!(ledger.len(), 5);
        assert_eq!(ledger.get("1").map(|b| b.status), Some(BookingStatus::Confirmed));
        assert_eq!(ledger.get("2").map(|b| b.status), Some(BookingStatus::Pending));
    }
}
