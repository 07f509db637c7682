// Timestamp (de)serialization shared by the API models
//
// The biking API writes instants either as epoch milliseconds or as ISO-8601
// strings, and plain dates as "YYYY-MM-DD". All of them are read into UTC
// instants and always written back as RFC 3339 strings.
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

fn parse(raw: RawTimestamp) -> Result<DateTime<Utc>, String> {
    match raw {
        RawTimestamp::Millis(ms) => DateTime::<Utc>::from_timestamp_millis(ms)
            .ok_or_else(|| format!("timestamp out of range: {}", ms)),
        RawTimestamp::Text(text) => {
            if let Ok(instant) = DateTime::parse_from_rfc3339(&text) {
                return Ok(instant.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
                .ok_or_else(|| format!("invalid timestamp: {}", text))
        }
    }
}

pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = RawTimestamp::deserialize(deserializer)?;
    parse(raw).map_err(serde::de::Error::custom)
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(instant) => super::serialize(instant, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<RawTimestamp>::deserialize(deserializer)? {
            Some(raw) => parse(raw).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_variants() {
        let expected = Utc.with_ymd_and_hms(2014, 3, 1, 0, 0, 0).unwrap();

        assert_eq!(parse(RawTimestamp::Text("2014-03-01".into())).unwrap(), expected);
        assert_eq!(parse(RawTimestamp::Text("2014-03-01T01:00:00+01:00".into())).unwrap(), expected);
        assert_eq!(parse(RawTimestamp::Millis(expected.timestamp_millis())).unwrap(), expected);
        assert!(parse(RawTimestamp::Text("yesterday".into())).is_err());
    }
}
