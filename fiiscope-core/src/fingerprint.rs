//! Request fingerprinting: deterministic cache keys.
//!
//! A key identifies the exact request shape (ticker, source selector, field
//! set). The field set is sorted and deduplicated before hashing, so element
//! order never changes the key. BLAKE3 keeps the digest stable across builds
//! and platforms.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::data::provider::SourceSelector;
use crate::domain::{FieldName, Ticker};

/// 64-char lower-hex BLAKE3 digest of a request shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(ticker: &Ticker, source: SourceSelector, fields: &[FieldName]) -> Self {
        let mut fields = fields.to_vec();
        fields.sort();
        fields.dedup();

        let names: Vec<&str> = fields.iter().map(FieldName::as_str).collect();
        let canonical = format!("{}|{}|{}", ticker.as_str(), source.as_str(), names.join(","));
        Self(blake3::hash(canonical.as_bytes()).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keys read back from disk must look like digests.
impl FromStr for CacheKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            Ok(Self(s.to_string()))
        } else {
            Err(format!("not a cache key: {s:?}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::ProviderId;

    fn ticker() -> Ticker {
        Ticker::new("mxrf11").unwrap()
    }

    #[test]
    fn key_is_64_hex_chars() {
        let key = CacheKey::for_request(&ticker(), SourceSelector::All, &[FieldName::Price]);
        assert_eq!(key.as_str().len(), 64);
        assert_eq!(key.as_str().parse::<CacheKey>().unwrap(), key);
    }

    #[test]
    fn field_order_and_duplicates_do_not_matter() {
        let a = CacheKey::for_request(
            &ticker(),
            SourceSelector::All,
            &[FieldName::Price, FieldName::Dy, FieldName::Name],
        );
        let b = CacheKey::for_request(
            &ticker(),
            SourceSelector::All,
            &[FieldName::Name, FieldName::Price, FieldName::Dy, FieldName::Price],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn every_component_changes_the_key() {
        let base = CacheKey::for_request(&ticker(), SourceSelector::All, &[FieldName::Price]);
        let other_ticker = CacheKey::for_request(
            &Ticker::new("HGLG11").unwrap(),
            SourceSelector::All,
            &[FieldName::Price],
        );
        let other_source = CacheKey::for_request(
            &ticker(),
            SourceSelector::Only(ProviderId::Fundamentus),
            &[FieldName::Price],
        );
        let other_fields = CacheKey::for_request(
            &ticker(),
            SourceSelector::All,
            &[FieldName::Price, FieldName::Dy],
        );
        assert_ne!(base, other_ticker);
        assert_ne!(base, other_source);
        assert_ne!(base, other_fields);
    }

    #[test]
    fn ticker_case_is_normalized_before_hashing() {
        let key =
            |t: &str| CacheKey::for_request(&Ticker::new(t).unwrap(), SourceSelector::All, &[]);
        let (lower, upper) = (key("mxrf11"), key("MXRF11"));
        assert_eq!(lower, upper);
    }

    #[test]
    fn rejects_non_digest_text() {
        assert!("MXRF11".parse::<CacheKey>().is_err());
        assert!("G".repeat(64).parse::<CacheKey>().is_err());
    }
}
