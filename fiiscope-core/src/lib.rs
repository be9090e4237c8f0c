//! FiiScope Core: real-estate fund data scraped from public providers.
//!
//! This crate contains the whole pipeline behind one request:
//! - Domain types (field tags, values, canonical records, tickers)
//! - Anchor-based text extraction and Brazilian numeric normalization
//! - One source adapter per provider, over a shared HTTP fetcher with retry
//!   and per-host circuit breakers
//! - Trust-ordered merge engine that only asks for still-missing fields
//! - Line-oriented TTL cache keyed by request fingerprint
//! - Request service applying a cache mode around the merge

pub mod config;
pub mod data;
pub mod domain;
pub mod extract;
pub mod fingerprint;
pub mod merge;
pub mod service;

pub use config::{ConfigError, ScraperConfig};
pub use fingerprint::CacheKey;
pub use merge::{MergeEngine, MergeOutcome, MergeState};
pub use service::{CacheMode, FiiService, Origin, Request, Response};
