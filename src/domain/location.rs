// Location domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "createdAt", with = "super::timestamp")]
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
impl LocationPoint {
    pub fn new(latitude: f64, longitude: f64, recorded_at: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            description: None,
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_created_at_millis() {
        let json = r#"{"latitude":50.75,"longitude":6.18,"createdAt":1400000000000}"#;
        let point: LocationPoint = serde_json::from_str(json).unwrap();

        assert_eq!(point.recorded_at, Utc.timestamp_millis_opt(1_400_000_000_000).unwrap());
        assert_eq!(point.description, None);
    }

    #[test]
    fn test_parse_recorded_at_iso() {
        let json = r#"{"latitude":1.0,"longitude":2.0,"description":"Aachen","recordedAt":"2014-05-13T16:53:20Z"}"#;
        let point: LocationPoint = serde_json::from_str(json).unwrap();

        assert_eq!(point.description.as_deref(), Some("Aachen"));
        assert_eq!(point.recorded_at, Utc.timestamp_opt(1_400_000_000, 0).unwrap());
    }

    #[test]
    fn test_missing_coordinates_is_an_error() {
        let json = r#"{"longitude":2.0,"createdAt":0}"#;
        assert!(serde_json::from_str::<LocationPoint>(json).is_err());
    }
}
