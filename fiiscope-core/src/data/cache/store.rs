//! Line-oriented TTL cache of resolved records.
//!
//! Layout: one UTF-8 file, one entry per line (see [`super::entry`]).
//!
//! - `put` appends; it never removes an older entry for the same key.
//! - `get` returns the first entry for a key. Age ≤ TTL is fresh; anything
//!   older is a miss and every line for that key is purged.
//! - Rewrites go to `{file}.tmp` and are renamed into place.
//! - Every operation holds one mutex, so a rewrite never interleaves with an
//!   append from the same process.

use chrono::{Duration, NaiveDateTime};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::clock::{Clock, SystemClock};
use super::entry::{raw_key, CacheEntry};
use super::CacheError;
use crate::config::CacheConfig;
use crate::domain::CanonicalRecord;
use crate::fingerprint::CacheKey;

/// A fresh entry returned by [`CacheStore::get`].
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub record: CanonicalRecord,
    pub cached_at: NaiveDateTime,
    pub age: Duration,
}

/// Line counts by condition, as of now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatus {
    pub total: usize,
    pub fresh: usize,
    pub stale: usize,
    pub corrupt: usize,
}

pub struct CacheStore {
    path: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self::with_clock(path, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(path: impl Into<PathBuf>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            ttl,
            clock,
            lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(&config.path, config.ttl())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn io_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// All lines of the container; a missing file is an empty cache.
    fn read_lines(&self) -> Result<Vec<String>, CacheError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Atomically replace the container with `lines`.
    fn write_lines(&self, lines: &[String]) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut content = lines.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        fs::write(&tmp_path, content).map_err(|e| self.io_error(e))?;

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            self.io_error(e)
        })
    }

    /// Rewrite without any line for `key`. Returns how many lines went.
    fn purge_locked(&self, key: &CacheKey) -> Result<usize, CacheError> {
        let lines = self.read_lines()?;
        let before = lines.len();
        let kept: Vec<String> = lines
            .into_iter()
            .filter(|l| raw_key(l) != Some(key.as_str()))
            .collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.write_lines(&kept)?;
        }
        Ok(removed)
    }

    /// Look up `key`. Expired or corrupt entries are purged and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Result<Option<CacheHit>, CacheError> {
        let _guard = self.guard();

        let lines = self.read_lines()?;
        let Some(line) = lines.iter().find(|l| raw_key(l) == Some(key.as_str())) else {
            tracing::debug!(%key, "cache miss");
            return Ok(None);
        };

        let entry = match CacheEntry::decode(line) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(%key, error = %e, "corrupt cache entry; purging");
                self.purge_locked(key)?;
                return Ok(None);
            }
        };

        let age = (self.clock.now() - entry.cached_at).max(Duration::zero());
        if age > self.ttl {
            let removed = self.purge_locked(key)?;
            tracing::debug!(%key, age_secs = age.num_seconds(), removed, "cache entry expired");
            return Ok(None);
        }

        tracing::debug!(%key, age_secs = age.num_seconds(), "cache hit");
        Ok(Some(CacheHit {
            record: entry.record,
            cached_at: entry.cached_at,
            age,
        }))
    }

    /// Append an entry stamped with the current time.
    pub fn put(&self, key: &CacheKey, record: &CanonicalRecord) -> Result<(), CacheError> {
        let _guard = self.guard();

        let entry = CacheEntry {
            key: key.clone(),
            cached_at: self.clock.now(),
            record: record.clone(),
        };
        let line = entry.encode()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        // a hand-edited or truncated file may lack the final newline
        if !ends_with_newline(&mut file).map_err(|e| self.io_error(e))? {
            file.write_all(b"\n").map_err(|e| self.io_error(e))?;
        }
        writeln!(file, "{line}").map_err(|e| self.io_error(e))?;

        tracing::debug!(%key, "cache entry stored");
        Ok(())
    }

    /// Remove every entry for `key`, whatever its age.
    pub fn invalidate(&self, key: &CacheKey) -> Result<usize, CacheError> {
        let _guard = self.guard();
        let removed = self.purge_locked(key)?;
        tracing::debug!(%key, removed, "cache key invalidated");
        Ok(removed)
    }

    /// Drop every entry.
    pub fn wipe(&self) -> Result<(), CacheError> {
        let _guard = self.guard();
        self.write_lines(&[])?;
        tracing::info!(path = %self.path.display(), "cache wiped");
        Ok(())
    }

    pub fn status(&self) -> Result<CacheStatus, CacheError> {
        let _guard = self.guard();
        let now = self.clock.now();

        let mut status = CacheStatus::default();
        for line in self.read_lines()? {
            status.total += 1;
            match CacheEntry::decode(&line) {
                Ok(entry) if now - entry.cached_at <= self.ttl => status.fresh += 1,
                Ok(_) => status.stale += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "corrupt cache line");
                    status.corrupt += 1;
                }
            }
        }
        Ok(status)
    }
}

/// True for an empty file or one whose last byte is `\n`.
fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cache::ManualClock;
    use crate::data::provider::SourceSelector;
    use crate::domain::{FieldName, FieldValue, Ticker};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn setup() -> (TempDir, Arc<ManualClock>, CacheStore) {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(start()));
        let store = CacheStore::with_clock(
            dir.path().join("cache.txt"),
            Duration::hours(24),
            clock.clone(),
        );
        (dir, clock, store)
    }

    fn key(ticker: &str) -> CacheKey {
        CacheKey::for_request(
            &Ticker::new(ticker).unwrap(),
            SourceSelector::All,
            &[FieldName::Name],
        )
    }

    fn record(name: &str) -> CanonicalRecord {
        let mut r = CanonicalRecord::empty(&[FieldName::Name]);
        r.fill(FieldName::Name, FieldValue::Text(name.into()));
        r
    }

    #[test]
    fn missing_file_is_empty_cache() {
        let (_dir, _clock, store) = setup();
        assert_eq!(store.get(&key("MXRF11")).unwrap(), None);
        assert_eq!(store.status().unwrap(), CacheStatus::default());
    }

    #[test]
    fn put_appends_without_replacing() {
        let (_dir, clock, store) = setup();
        store.put(&key("MXRF11"), &record("first")).unwrap();
        clock.advance(Duration::minutes(5));
        store.put(&key("MXRF11"), &record("second")).unwrap();

        // first match wins until a rewrite removes it
        let hit = store.get(&key("MXRF11")).unwrap().unwrap();
        assert_eq!(hit.record, record("first"));
        assert_eq!(hit.age, Duration::minutes(5));
        assert_eq!(store.status().unwrap().total, 2);
    }

    #[test]
    fn put_after_unterminated_line_starts_a_new_line() {
        let (_dir, _clock, store) = setup();
        fs::write(store.path(), "garbage without newline").unwrap();
        store.put(&key("MXRF11"), &record("a")).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("garbage without newline\n"));
        assert_eq!(store.get(&key("MXRF11")).unwrap().unwrap().record, record("a"));
        let status = store.status().unwrap();
        assert_eq!(status.total, 2);
        assert_eq!(status.fresh, 1);
        assert_eq!(status.corrupt, 1);
    }

    #[test]
    fn invalidate_removes_only_that_key() {
        let (_dir, _clock, store) = setup();
        store.put(&key("MXRF11"), &record("a")).unwrap();
        store.put(&key("MXRF11"), &record("b")).unwrap();
        store.put(&key("HGLG11"), &record("c")).unwrap();

        assert_eq!(store.invalidate(&key("MXRF11")).unwrap(), 2);
        assert_eq!(store.get(&key("MXRF11")).unwrap(), None);
        assert!(store.get(&key("HGLG11")).unwrap().is_some());
        assert_eq!(store.invalidate(&key("MXRF11")).unwrap(), 0);
    }

    #[test]
    fn wipe_clears_everything() {
        let (_dir, _clock, store) = setup();
        store.put(&key("MXRF11"), &record("a")).unwrap();
        store.put(&key("HGLG11"), &record("b")).unwrap();
        store.wipe().unwrap();
        assert_eq!(store.status().unwrap().total, 0);
        assert!(store.path().exists());
    }

    #[test]
    fn corrupt_line_for_key_is_purged() {
        let (_dir, _clock, store) = setup();
        let k = key("MXRF11");
        fs::write(store.path(), format!("{k}#@#not a date#@#{{}}\n")).unwrap();
        store.put(&key("HGLG11"), &record("ok")).unwrap();

        assert_eq!(store.get(&k).unwrap(), None);
        let status = store.status().unwrap();
        assert_eq!(status.total, 1);
        assert_eq!(status.corrupt, 0);
    }

    #[test]
    fn unrelated_garbage_is_skipped() {
        let (_dir, _clock, store) = setup();
        fs::write(store.path(), "garbage without separators\n").unwrap();
        store.put(&key("MXRF11"), &record("a")).unwrap();

        assert!(store.get(&key("MXRF11")).unwrap().is_some());
        let status = store.status().unwrap();
        assert_eq!(status, CacheStatus { total: 2, fresh: 1, stale: 0, corrupt: 1 });
    }

    #[test]
    fn status_splits_fresh_and_stale() {
        let (_dir, clock, store) = setup();
        store.put(&key("MXRF11"), &record("old")).unwrap();
        clock.advance(Duration::hours(30));
        store.put(&key("HGLG11"), &record("new")).unwrap();

        let status = store.status().unwrap();
        assert_eq!(status.fresh, 1);
        assert_eq!(status.stale, 1);
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("nested/deeper/cache.txt"), Duration::hours(1));
        store.put(&key("MXRF11"), &record("a")).unwrap();
        assert!(store.get(&key("MXRF11")).unwrap().is_some());
    }
}
