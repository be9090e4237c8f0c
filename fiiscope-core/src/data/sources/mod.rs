//! Concrete source adapters, one per public data provider.

pub mod fundamentus;
pub mod fundsexplorer;
pub mod investidor10;

pub use fundamentus::Fundamentus;
pub use fundsexplorer::FundsExplorer;
pub use investidor10::Investidor10;

use std::collections::BTreeMap;
use std::sync::Arc;

use super::http::DocumentFetcher;
use super::provider::{ProviderId, SourceAdapter};
use crate::config::SourcesConfig;

/// Every known provider, keyed by id, sharing one fetcher.
pub fn default_adapters(
    config: &SourcesConfig,
    fetcher: Arc<dyn DocumentFetcher>,
) -> BTreeMap<ProviderId, Arc<dyn SourceAdapter>> {
    let mut adapters: BTreeMap<ProviderId, Arc<dyn SourceAdapter>> = BTreeMap::new();
    adapters.insert(
        ProviderId::Fundamentus,
        Arc::new(Fundamentus::new(
            fetcher.clone(),
            &config.fundamentus_base_url,
            &config.filing_url_template,
        )),
    );
    adapters.insert(
        ProviderId::Fundsexplorer,
        Arc::new(FundsExplorer::new(fetcher.clone(), &config.fundsexplorer_base_url)),
    );
    adapters.insert(
        ProviderId::Investidor10,
        Arc::new(Investidor10::new(fetcher, &config.investidor10_base_url)),
    );
    adapters
}
