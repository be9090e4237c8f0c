use serde::{Deserialize, Serialize};
use std::fmt;

use super::DomainError;

/// Exchange ticker of a fund, e.g. `MXRF11`.
///
/// Always trimmed and upper-cased so cache keys do not depend on how the
/// caller spelled it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    pub fn new(raw: &str) -> Result<Self, DomainError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(DomainError::EmptyTicker);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-case form, for providers whose URLs are case-sensitive.
    pub fn to_lowercase(&self) -> String {
        self.0.to_lowercase()
    }
}

impl TryFrom<String> for Ticker {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ticker::new(&value)
    }
}

impl From<Ticker> for String {
    fn from(t: Ticker) -> Self {
        t.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let t = Ticker::new("  mxrf11 ").unwrap();
        assert_eq!(t.as_str(), "MXRF11");
        assert_eq!(t.to_lowercase(), "mxrf11");
    }

    #[test]
    fn rejects_blank() {
        assert!(matches!(Ticker::new("   "), Err(DomainError::EmptyTicker)));
    }
}
