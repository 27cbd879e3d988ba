//! Migration version identifiers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MigrateResult, MigrationError};

/// Width of a version identifier (`YYYYMMDDHHMMSS`).
pub const VERSION_WIDTH: usize = 14;

/// Format string used to stamp new versions.
pub const VERSION_FORMAT: &str = "%Y%m%d%H%M%S";

/// A fixed-width timestamp identifying one migration pair.
///
/// Construction validates the shape, so ordering on the inner string is
/// both lexicographic and chronological.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(String);

impl Version {
    /// Parse and validate a version identifier.
    pub fn parse(raw: &str) -> MigrateResult<Self> {
        if raw.len() != VERSION_WIDTH || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MigrationError::InvalidVersion(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Version for the current UTC time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Version for a specific instant.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format(VERSION_FORMAT).to_string())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Version {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = MigrationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_valid() {
        let v = Version::parse("20240101120000").unwrap();
        assert_eq!(v.as_str(), "20240101120000");
        assert_eq!(v.to_string(), "20240101120000");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("9").is_err());
        assert!(Version::parse("2024010112000").is_err());
        assert!(Version::parse("202401011200000").is_err());
        assert!(Version::parse("2024010112000a").is_err());
    }

    #[test]
    fn test_ordering_is_chronological() {
        let a = Version::parse("20231231235959").unwrap();
        let b = Version::parse("20240101000000").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_from_datetime() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(Version::from_datetime(at).as_str(), "20240305070809");
    }

    #[test]
    fn test_now_is_valid() {
        let now = Version::now();
        assert!(Version::parse(now.as_str()).is_ok());
    }
}
