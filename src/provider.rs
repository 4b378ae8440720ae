use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// Data structures for the flight search provider's JSON payloads.
// Everything is optional: the provider omits fields freely and the parser
// substitutes placeholders.

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderSearchResponse {
    pub session_id: Option<String>,
    pub data: Option<ProviderSearchData>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderSearchData {
    pub context: Option<ProviderContext>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderContext {
    pub session_id: Option<String>,
    pub status: Option<String>,
}

impl ProviderSearchResponse {
    // Top-level sessionId first, then the nested data.context.sessionId
    pub fn session_id(&self) -> Option<&str> {
        self.session_id
            .as_deref()
            .or_else(|| {
                self.data
                    .as_ref()
                    .and_then(|d| d.context.as_ref())
                    .and_then(|c| c.session_id.as_deref())
            })
            .filter(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderDetailsResponse {
    pub data: Option<ProviderDetailsData>,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderDetailsData {
    // Kept raw so one malformed itinerary cannot sink the rest
    pub itineraries: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderItinerary {
    pub price: Option<ProviderPrice>,
    pub legs: Option<Vec<ProviderLeg>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderPrice {
    pub raw: Option<f64>,
    pub formatted: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderLeg {
    pub duration_in_minutes: Option<f64>,
    pub segments: Option<Vec<ProviderSegment>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderSegment {
    pub origin: Option<ProviderPlace>,
    pub destination: Option<ProviderPlace>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub flight_number: Option<String>,
    pub marketing_carrier: Option<ProviderCarrier>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderPlace {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderCarrier {
    pub name: Option<String>,
    pub alternate_id: Option<String>,
}

// Flight numbers arrive as "2401" or 2401
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a flight number, found {}",
            other
        ))),
    }
}

// Provider error bodies look like {"message": "..."}
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProviderErrorBody {
    pub message: Option<String>,
}
