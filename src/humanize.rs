//! Human-readable duration parsing and formatting

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid duration format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(#[from] std::num::ParseFloatError),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),
}

/// Duration wrapper accepting `"500ms"`, `"3s"`, `"1m"` or bare seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn to_human_readable(&self) -> String {
        let millis = self.0.as_millis();
        if millis == 0 {
            return "0s".to_string();
        }
        if millis % 60_000 == 0 {
            format!("{}m", millis / 60_000)
        } else if millis % 1000 == 0 {
            format!("{}s", millis / 1000)
        } else {
            format!("{}ms", millis)
        }
    }
}

impl From<HumanDuration> for Duration {
    fn from(value: HumanDuration) -> Self {
        value.0
    }
}

impl FromStr for HumanDuration {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();

        if s.is_empty() {
            return Err(ParseError::InvalidFormat(s));
        }

        // Bare numbers are seconds
        if let Ok(secs) = s.parse::<f64>() {
            return seconds(secs, &s);
        }

        let pos = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| ParseError::InvalidFormat(s.clone()))?;
        let (num_str, unit) = s.split_at(pos);
        if num_str.is_empty() {
            return Err(ParseError::InvalidFormat(s.clone()));
        }
        let num: f64 = num_str.parse()?;

        let secs = match unit.trim() {
            "ms" => num / 1000.0,
            "s" | "sec" | "secs" => num,
            "m" | "min" | "mins" => num * 60.0,
            "h" => num * 3600.0,
            other => return Err(ParseError::InvalidUnit(other.to_string())),
        };

        seconds(secs, &s)
    }
}

fn seconds(secs: f64, raw: &str) -> Result<HumanDuration, ParseError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ParseError::InvalidFormat(raw.to_string()));
    }
    Ok(HumanDuration(Duration::from_nanos((secs * 1e9).round() as u64)))
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct HumanDurationVisitor;

        impl<'de> serde::de::Visitor<'de> for HumanDurationVisitor {
            type Value = HumanDuration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a duration as string (e.g., \"500ms\", \"3s\") or seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(HumanDuration::from_secs(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(HumanDuration::from_secs)
                    .map_err(|_| E::custom(format!("negative duration: {v}")))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                seconds(v, &v.to_string()).map_err(E::custom)
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse::<HumanDuration>().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(HumanDurationVisitor)
    }
}

impl Serialize for HumanDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_human_readable())
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human_readable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!("500ms".parse::<HumanDuration>().unwrap().0, Duration::from_millis(500));
        assert_eq!("3s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(3));
        assert_eq!("1m".parse::<HumanDuration>().unwrap().0, Duration::from_secs(60));
        assert_eq!("2 min".parse::<HumanDuration>().unwrap().0, Duration::from_secs(120));
    }

    #[test]
    fn test_parse_bare_seconds() {
        assert_eq!("3".parse::<HumanDuration>().unwrap().0, Duration::from_secs(3));
        assert_eq!("0.5".parse::<HumanDuration>().unwrap().0, Duration::from_millis(500));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "5 fortnights".parse::<HumanDuration>(),
            Err(ParseError::InvalidUnit(_))
        ));
        assert!("ms".parse::<HumanDuration>().is_err());
        assert!("".parse::<HumanDuration>().is_err());
        assert!("-1".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_to_human_readable() {
        assert_eq!(HumanDuration::from_millis(500).to_human_readable(), "500ms");
        assert_eq!(HumanDuration::from_secs(3).to_human_readable(), "3s");
        assert_eq!(HumanDuration::from_secs(120).to_human_readable(), "2m");
        assert_eq!(HumanDuration::default().to_human_readable(), "0s");
    }

    #[derive(Deserialize)]
    struct TestStruct {
        delay: HumanDuration,
    }

    #[test]
    fn test_deserialize_string() {
        let parsed: TestStruct = serde_json::from_str(r#"{"delay": "250ms"}"#).unwrap();
        assert_eq!(parsed.delay.0, Duration::from_millis(250));
    }

    #[test]
    fn test_deserialize_numbers() {
        let parsed: TestStruct = serde_json::from_str(r#"{"delay": 2}"#).unwrap();
        assert_eq!(parsed.delay.0, Duration::from_secs(2));

        let parsed: TestStruct = serde_json::from_str(r#"{"delay": 1.5}"#).unwrap();
        assert_eq!(parsed.delay.0, Duration::from_millis(1500));
    }

    #[test]
    fn test_serialize_round_trips_through_display() {
        let json = serde_json::to_string(&HumanDuration::from_millis(500)).unwrap();
        assert_eq!(json, r#""500ms""#);
    }
}
