// Location normalization: free-text origin/destination to provider location codes

use serde::{Deserialize, Serialize};

// City-level codes understood by the flight search provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationCode {
    LosAngeles,
    NewYork,
    London,
    Paris,
    Tokyo,
    SanFrancisco,
    Chicago,
    Miami,
    Dubai,
    Sydney,
}

impl LocationCode {
    pub const ALL: [LocationCode; 10] = [
        LocationCode::LosAngeles,
        LocationCode::NewYork,
        LocationCode::London,
        LocationCode::Paris,
        LocationCode::Tokyo,
        LocationCode::SanFrancisco,
        LocationCode::Chicago,
        LocationCode::Miami,
        LocationCode::Dubai,
        LocationCode::Sydney,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationCode::LosAngeles => "LAXA",
            LocationCode::NewYork => "NYCA",
            LocationCode::London => "LOND",
            LocationCode::Paris => "PARI",
            LocationCode::Tokyo => "TYOA",
            LocationCode::SanFrancisco => "SFOA",
            LocationCode::Chicago => "CHIA",
            LocationCode::Miami => "MIAM",
            LocationCode::Dubai => "DUBA",
            LocationCode::Sydney => "SYDA",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }
}

impl std::fmt::Display for LocationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Order matters: the substring scan returns the first key found in the input.
pub static CITY_CODES: &[(&str, LocationCode)] = &[
    ("LAX", LocationCode::LosAngeles),
    ("LOS ANGELES", LocationCode::LosAngeles),
    ("JFK", LocationCode::NewYork),
    ("NEW YORK", LocationCode::NewYork),
    ("NYC", LocationCode::NewYork),
    ("LHR", LocationCode::London),
    ("LONDON", LocationCode::London),
    ("CDG", LocationCode::Paris),
    ("PARIS", LocationCode::Paris),
    ("NRT", LocationCode::Tokyo),
    ("TOKYO", LocationCode::Tokyo),
    ("SFO", LocationCode::SanFrancisco),
    ("SAN FRANCISCO", LocationCode::SanFrancisco),
    ("ORD", LocationCode::Chicago),
    ("CHICAGO", LocationCode::Chicago),
    ("MIA", LocationCode::Miami),
    ("MIAMI", LocationCode::Miami),
    ("DXB", LocationCode::Dubai),
    ("DUBAI", LocationCode::Dubai),
    ("SYD", LocationCode::Sydney),
    ("SYDNEY", LocationCode::Sydney),
];

/// Looks up a known provider location for the input, without falling back.
pub fn lookup_location(input: &str) -> Option<LocationCode> {
    let upper = input.trim().to_uppercase();

    if let Some((_, code)) = CITY_CODES.iter().find(|(key, _)| *key == upper) {
        return Some(*code);
    }

    // Already-normalized codes map to themselves
    if let Some(code) = LocationCode::from_code(&upper) {
        return Some(code);
    }

    CITY_CODES
        .iter()
        .find(|(key, _)| upper.contains(key))
        .map(|(_, code)| *code)
}

/// Maps "LAX", "Los Angeles" or "lax, los angeles" to a 4-character provider
/// code. Unknown inputs get the first three characters plus `A`.
///
/// Idempotent for supported cities only: a fallback code can itself contain
/// a table key, so "Emirates" gives "EMIA" and "EMIA" then gives "MIAM".
pub fn normalize_location(input: &str) -> String {
    match lookup_location(input) {
        Some(code) => code.as_str().to_string(),
        None => format!("{}A", airport_code(input)),
    }
}

// Leading three letters of "LAX, Los Angeles", otherwise the first three characters
pub fn airport_code(input: &str) -> String {
    let trimmed = input.trim();
    let prefix: String = trimmed.chars().take(3).collect();
    if prefix.len() == 3 && prefix.chars().all(|c| c.is_ascii_alphabetic()) {
        return prefix.to_ascii_uppercase();
    }
    trimmed.to_uppercase().chars().take(3).collect()
}
