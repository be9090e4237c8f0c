//! Data acquisition: providers, transport, caching.

pub mod cache;
pub mod circuit_breaker;
pub mod http;
pub mod provider;
pub mod sources;

pub use cache::{CacheError, CacheHit, CacheStatus, CacheStore, Clock, ManualClock, SystemClock};
pub use circuit_breaker::{BreakerRegistry, CircuitBreaker};
pub use http::{DocumentFetcher, HttpFetcher};
pub use provider::{
    Contribution, Extractor, FetchError, FieldTable, ProviderId, SourceAdapter, SourceSelector,
    TrustOrder,
};
pub use sources::{default_adapters, Fundamentus, FundsExplorer, Investidor10};
