//! Serde helpers for appointment timestamps.
//!
//! Clients send naive local times with or without seconds
//! (`2024-05-01T10:00` or `2024-05-01T10:00:00`). Values are always written
//! back with seconds so the same slot has exactly one textual form.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serializer};

/// Canonical output format.
pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const ACCEPTED: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp in any accepted format, dropping sub-second precision.
pub fn parse(input: &str) -> Option<NaiveDateTime> {
    let trimmed = input.trim();
    ACCEPTED
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&value.format(FORMAT))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

/// Same as the parent module, for optional fields.
pub mod option {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => super::serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| {
            super::parse(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s)))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_seconds() {
        let short = parse("2024-05-01T10:00").unwrap();
        let long = parse("2024-05-01T10:00:00").unwrap();
        assert_eq!(short, long);
        assert_eq!(short.format(FORMAT).to_string(), "2024-05-01T10:00:00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("tomorrow at ten").is_none());
        assert!(parse("2024-13-01T10:00").is_none());
    }
}
