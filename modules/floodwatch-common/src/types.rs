use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

// --- FloodQuery ---

/// A validated request to look for flood-affected places.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloodQuery {
    pub state: String,
    pub district: String,
    /// Free text, e.g. "August 2019" or "2019-08-07".
    pub date: String,
}

impl FloodQuery {
    /// Build a query, rejecting missing or blank fields.
    pub fn new(
        state: Option<&str>,
        district: Option<&str>,
        date: Option<&str>,
    ) -> Result<Self, ValidationError> {
        fn present(value: Option<&str>) -> Option<String> {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        }

        let (state_v, district_v, date_v) = (present(state), present(district), present(date));

        let mut missing = Vec::new();
        if state_v.is_none() {
            missing.push("state");
        }
        if district_v.is_none() {
            missing.push("district");
        }
        if date_v.is_none() {
            missing.push("date");
        }

        match (state_v, district_v, date_v) {
            (Some(state), Some(district), Some(date)) => Ok(Self {
                state,
                district,
                date,
            }),
            _ => Err(ValidationError::MissingFields(missing)),
        }
    }
}

impl fmt::Display for FloodQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {} ({})", self.district, self.state, self.date)
    }
}

// --- Severity ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>")]
pub enum Severity {
    High,
    #[default]
    Medium,
    Low,
}

impl From<Option<String>> for Severity {
    fn from(raw: Option<String>) -> Self {
        match raw.as_deref().map(|s| s.trim().to_lowercase()).as_deref() {
            Some("high" | "critical" | "severe" | "extreme") => Severity::High,
            Some("low" | "minor") => Severity::Low,
            _ => Severity::Medium,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::High => write!(f, "High"),
            Severity::Medium => write!(f, "Medium"),
            Severity::Low => write!(f, "Low"),
        }
    }
}

// --- Events ---

/// A flood-location mention mined from text. Unverified: the name may be
/// outside the district or not exist at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvent {
    pub location_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub context: String,
    #[serde(default)]
    pub severity: Severity,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl CandidateEvent {
    pub fn new(location_name: impl Into<String>, context: impl Into<String>, severity: Severity) -> Self {
        Self {
            location_name: location_name.into(),
            context: context.into(),
            severity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// First match returned by the geocoding service for one query variant.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeMatch {
    pub lat: f64,
    pub lng: f64,
    pub display_name: String,
}

impl GeocodeMatch {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// A candidate that was pinned to coordinates by the geocoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEvent {
    pub location_name: String,
    pub context: String,
    pub severity: Severity,
    pub coordinates: Coordinates,
    pub address: String,
}

impl ResolvedEvent {
    pub fn from_match(candidate: CandidateEvent, geocoded: GeocodeMatch) -> Self {
        Self {
            coordinates: geocoded.coordinates(),
            address: geocoded.display_name,
            location_name: candidate.location_name,
            context: candidate.context,
            severity: candidate.severity,
        }
    }
}

// --- Response envelopes ---

/// Body returned by `POST /api/floods` on a 200.
///
/// `{ success: true, data }` when the gate passed (data may be empty),
/// `{ success: false, message }` when no active flood was confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<ResolvedEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FloodResponse {
    pub fn events(data: Vec<ResolvedEvent>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn no_flood(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Body returned with any non-2xx status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_requires_all_fields() {
        let err = FloodQuery::new(Some("Karnataka"), None, Some("  ")).unwrap_err();
        assert_eq!(err, ValidationError::MissingFields(vec!["district", "date"]));
        assert_eq!(err.to_string(), "Missing required field(s): district, date");
    }

    #[test]
    fn query_trims_fields() {
        let q = FloodQuery::new(Some(" Karnataka "), Some("Kalaburagi"), Some("August 2019 ")).unwrap();
        assert_eq!(q.state, "Karnataka");
        assert_eq!(q.date, "August 2019");
        assert_eq!(q.to_string(), "Kalaburagi, Karnataka (August 2019)");
    }

    #[test]
    fn severity_parses_leniently() {
        let parse = |s: &str| -> Severity { serde_json::from_value(serde_json::json!(s)).unwrap() };
        assert_eq!(parse("High"), Severity::High);
        assert_eq!(parse("critical"), Severity::High);
        assert_eq!(parse("LOW"), Severity::Low);
        assert_eq!(parse("moderate"), Severity::Medium);
        assert_eq!(parse("???"), Severity::Medium);
    }

    #[test]
    fn candidate_defaults_missing_fields() {
        let c: CandidateEvent =
            serde_json::from_str(r#"{"location_name":"Kattisangavi Bridge"}"#).unwrap();
        assert_eq!(c.context, "");
        assert_eq!(c.severity, Severity::Medium);
    }

    #[test]
    fn candidate_tolerates_null_context_and_severity() {
        let c: CandidateEvent = serde_json::from_str(
            r#"{"location_name":"Dandoti","context":null,"severity":null}"#,
        )
        .unwrap();
        assert_eq!(c.context, "");
        assert_eq!(c.severity, Severity::Medium);
    }

    #[test]
    fn resolved_event_wire_shape() {
        let event = ResolvedEvent::from_match(
            CandidateEvent::new("Dandoti", "Submerged by Bhima backwaters", Severity::High),
            GeocodeMatch {
                lat: 17.1,
                lng: 76.9,
                display_name: "Dandoti, Chittapur, Kalaburagi, Karnataka, India".into(),
            },
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["location_name"], "Dandoti");
        assert_eq!(value["severity"], "High");
        assert_eq!(value["coordinates"]["lat"], 17.1);
        assert_eq!(value["coordinates"]["lng"], 76.9);
        assert_eq!(value["address"], "Dandoti, Chittapur, Kalaburagi, Karnataka, India");
    }

    #[test]
    fn envelopes_omit_absent_fields() {
        let ok = serde_json::to_value(FloodResponse::events(vec![])).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "data": []}));

        let gated = serde_json::to_value(FloodResponse::no_flood("no flood events detected")).unwrap();
        assert_eq!(
            gated,
            serde_json::json!({"success": false, "message": "no flood events detected"})
        );
    }
}
