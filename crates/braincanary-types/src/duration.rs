//! Human-readable duration parsing ("30s", "10m", "1h", "500ms")

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// A duration that (de)serializes from the config's compact string format:
/// a positive integer followed by a unit of `ms|s|m|h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DurationSpec(Duration);

impl DurationSpec {
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn zero() -> Self {
        Self(Duration::ZERO)
    }

    pub fn parse(s: &str) -> Result<Self, DurationParseError> {
        let s = s.trim();
        let split_at = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| DurationParseError::MissingUnit(s.to_string()))?;
        let (number, unit) = s.split_at(split_at);
        let value: u64 = number
            .parse()
            .map_err(|_| DurationParseError::InvalidNumber(s.to_string()))?;
        let millis = match unit {
            "ms" => value,
            "s" => value.saturating_mul(1_000),
            "m" => value.saturating_mul(60_000),
            "h" => value.saturating_mul(3_600_000),
            other => return Err(DurationParseError::UnknownUnit(other.to_string())),
        };
        Ok(Self(Duration::from_millis(millis)))
    }
}

impl fmt::Display for DurationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0.as_millis())
    }
}

impl From<Duration> for DurationSpec {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl From<DurationSpec> for Duration {
    fn from(d: DurationSpec) -> Self {
        d.0
    }
}

/// Errors parsing a duration string.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DurationParseError {
    #[error("duration '{0}' has no unit suffix (expected ms|s|m|h)")]
    MissingUnit(String),
    #[error("duration '{0}' has a non-numeric magnitude")]
    InvalidNumber(String),
    #[error("unknown duration unit '{0}' (expected ms|s|m|h)")]
    UnknownUnit(String),
}

impl Serialize for DurationSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DurationSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DurationSpec::parse(&raw).map_err(de::Error::custom)
    }
}
