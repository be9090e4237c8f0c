//! One line of the cache file: `key#@#timestamp#@#record-json`.

use chrono::NaiveDateTime;

use super::CacheError;
use crate::domain::CanonicalRecord;
use crate::fingerprint::CacheKey;

pub const SEPARATOR: &str = "#@#";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub cached_at: NaiveDateTime,
    pub record: CanonicalRecord,
}

impl CacheEntry {
    /// Render as a single line, without the trailing newline.
    pub fn encode(&self) -> Result<String, CacheError> {
        let payload = serde_json::to_string(&self.record)?;
        Ok(format!(
            "{}{SEPARATOR}{}{SEPARATOR}{payload}",
            self.key,
            self.cached_at.format(TIMESTAMP_FORMAT)
        ))
    }

    /// Parse a line. Only the first two separators split; the payload may
    /// contain the separator token.
    pub fn decode(line: &str) -> Result<Self, CacheError> {
        let mut parts = line.splitn(3, SEPARATOR);
        let (Some(key), Some(timestamp), Some(payload)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(CacheError::Corrupt(format!("expected 3 parts: {}", preview(line))));
        };

        let key = key.parse::<CacheKey>().map_err(CacheError::Corrupt)?;
        let cached_at = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| CacheError::Corrupt(format!("timestamp {timestamp:?}: {e}")))?;
        let record = serde_json::from_str(payload)
            .map_err(|e| CacheError::Corrupt(format!("payload for {key}: {e}")))?;

        Ok(Self { key, cached_at, record })
    }
}

/// Raw key prefix of a line, readable even when the rest is corrupt.
pub fn raw_key(line: &str) -> Option<&str> {
    line.split_once(SEPARATOR).map(|(key, _)| key)
}

fn preview(line: &str) -> String {
    line.chars().take(80).collect()
}
