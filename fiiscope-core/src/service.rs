//! Request handling: cache mode dispatch around the merge engine.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ScraperConfig;
use crate::data::cache::{CacheError, CacheHit, CacheStore};
use crate::data::http::{DocumentFetcher, HttpFetcher};
use crate::data::provider::{FetchError, ProviderId, SourceSelector, TrustOrder};
use crate::data::sources::default_adapters;
use crate::domain::{CanonicalRecord, DomainError, FieldName, Ticker};
use crate::fingerprint::CacheKey;
use crate::merge::{MergeEngine, MergeOutcome};

/// Format of [`Response::timestamp`] when serialized.
pub const RESPONSE_DATE_FORMAT: &str = "%d/%m/%Y, %H:%M";

/// How a request interacts with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Serve a fresh cached record if there is one; otherwise resolve and store.
    #[default]
    UseCache,
    /// Always resolve; replace whatever was cached for this request.
    BypassAndStore,
    /// Drop the cached record for this request, resolve, store nothing.
    BypassAndClear,
    /// Wipe the whole cache, resolve, store nothing.
    DeleteAllCache,
}

impl CacheMode {
    pub const ALL: [CacheMode; 4] = [
        CacheMode::UseCache,
        CacheMode::BypassAndStore,
        CacheMode::BypassAndClear,
        CacheMode::DeleteAllCache,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheMode::UseCache => "use_cache",
            CacheMode::BypassAndStore => "bypass_and_store",
            CacheMode::BypassAndClear => "bypass_and_clear",
            CacheMode::DeleteAllCache => "delete_all_cache",
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `use_cache` as well as `use-cache`.
impl FromStr for CacheMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        CacheMode::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| DomainError::UnknownCacheMode(s.trim().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub ticker: Ticker,
    #[serde(default)]
    pub source: SourceSelector,
    /// Empty means every field.
    #[serde(default)]
    pub fields: Vec<FieldName>,
    #[serde(default)]
    pub cache_mode: CacheMode,
}

impl Request {
    pub fn new(ticker: Ticker) -> Self {
        Self {
            ticker,
            source: SourceSelector::All,
            fields: Vec::new(),
            cache_mode: CacheMode::UseCache,
        }
    }

    pub fn with_source(mut self, source: SourceSelector) -> Self {
        self.source = source;
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldName>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }

    /// Requested fields, sorted and deduplicated; all fields when none were named.
    pub fn resolved_fields(&self) -> Vec<FieldName> {
        if self.fields.is_empty() {
            return FieldName::ALL.to_vec();
        }
        let mut fields = self.fields.clone();
        fields.sort();
        fields.dedup();
        fields
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::for_request(&self.ticker, self.source, &self.resolved_fields())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Cache,
    Fresh,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// The resolved record, or `None` when no field was filled. An all-null
    /// record is never returned; it serializes as `"data": null`.
    pub data: Option<CanonicalRecord>,
    pub origin: Origin,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
    /// Provider behind each freshly resolved field; empty for cache hits.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub provenance: BTreeMap<FieldName, ProviderId>,
}

impl Response {
    fn cached(hit: CacheHit) -> Self {
        Self {
            data: Some(hit.record),
            origin: Origin::Cache,
            timestamp: hit.cached_at,
            provenance: BTreeMap::new(),
        }
    }

    fn fresh(outcome: MergeOutcome, timestamp: NaiveDateTime) -> Self {
        let data = outcome.record.has_any_value().then_some(outcome.record);
        Self {
            data,
            origin: Origin::Fresh,
            timestamp,
            provenance: outcome.provenance,
        }
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(RESPONSE_DATE_FORMAT).to_string()
    }
}

fn serialize_timestamp<S: Serializer>(
    ts: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&ts.format(RESPONSE_DATE_FORMAT))
}

/// Entry point for one request: cache lookup, merge, cache write-back.
pub struct FiiService {
    engine: MergeEngine,
    cache: CacheStore,
    trust_order: TrustOrder,
}

impl FiiService {
    pub fn new(engine: MergeEngine, cache: CacheStore, trust_order: TrustOrder) -> Self {
        Self {
            engine,
            cache,
            trust_order,
        }
    }

    /// Production wiring: HTTP fetcher, every provider, file cache.
    pub fn from_config(config: &ScraperConfig) -> Result<Self, FetchError> {
        let fetcher: Arc<dyn DocumentFetcher> = Arc::new(HttpFetcher::new(&config.http)?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    pub fn with_fetcher(config: &ScraperConfig, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        let engine = MergeEngine::new(default_adapters(&config.sources, fetcher));
        Self::new(
            engine,
            CacheStore::from_config(&config.cache),
            config.sources.trust_order.clone(),
        )
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn handle(&self, request: &Request) -> Result<Response, CacheError> {
        let key = request.cache_key();
        let ticker = &request.ticker;
        tracing::info!(
            %ticker,
            source = %request.source,
            mode = %request.cache_mode,
            "handling request"
        );

        match request.cache_mode {
            CacheMode::UseCache => {
                match self.cache.get(&key) {
                    Ok(Some(hit)) => return Ok(Response::cached(hit)),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(%ticker, %key, error = %e, "cache lookup failed; resolving");
                    }
                }
                let outcome = self.resolve(request);
                self.store(&key, &outcome.record, false);
                Ok(Response::fresh(outcome, self.cache.now()))
            }
            CacheMode::BypassAndStore => {
                let outcome = self.resolve(request);
                self.store(&key, &outcome.record, true);
                Ok(Response::fresh(outcome, self.cache.now()))
            }
            CacheMode::BypassAndClear => {
                self.cache.invalidate(&key)?;
                let outcome = self.resolve(request);
                Ok(Response::fresh(outcome, self.cache.now()))
            }
            CacheMode::DeleteAllCache => {
                self.cache.wipe()?;
                let outcome = self.resolve(request);
                Ok(Response::fresh(outcome, self.cache.now()))
            }
        }
    }

    fn resolve(&self, request: &Request) -> MergeOutcome {
        let order = request.source.trust_order(&self.trust_order);
        self.engine
            .resolve(&request.ticker, &request.resolved_fields(), &order)
    }

    /// Write-back; failures are logged, never returned.
    fn store(&self, key: &CacheKey, record: &CanonicalRecord, replace: bool) {
        if !record.has_any_value() {
            tracing::debug!(%key, "nothing resolved; not caching");
            return;
        }
        let result = if replace {
            self.cache.invalidate(key).and_then(|_| self.cache.put(key, record))
        } else {
            self.cache.put(key, record)
        };
        if let Err(e) = result {
            tracing::warn!(%key, error = %e, "cache write failed");
        }
    }
}
