//! Shared helpers for integration tests: canned documents and call logging.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use fiiscope_core::data::{DocumentFetcher, FetchError};

pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {}: {e}", path.display()))
}

/// Serves canned bodies by URL substring and records every URL requested.
#[derive(Default)]
pub struct FixtureFetcher {
    routes: Vec<(String, String)>,
    requested: Mutex<Vec<String>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url_contains: &str, body: String) -> Self {
        self.routes.push((url_contains.to_string(), body));
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn count_matching(&self, url_contains: &str) -> usize {
        self.requested()
            .iter()
            .filter(|u| u.contains(url_contains))
            .count()
    }
}

impl DocumentFetcher for FixtureFetcher {
    fn get(&self, url: &str, _headers: &[(&str, &str)]) -> Result<String, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.routes
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| FetchError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })
    }
}

/// The three fixture pages, wired to the default provider URLs.
pub fn all_providers() -> FixtureFetcher {
    FixtureFetcher::new()
        .route("fundamentus.com.br/detalhes.php", fixture("fundamentus_detalhes.html"))
        .route("cnpjFundo=97521225000125", fixture("fundamentus_filing.html"))
        .route("fundsexplorer.com.br/funds/", fixture("fundsexplorer_fund.html"))
        .route("investidor10.com.br/fiis/", fixture("investidor10_fii.html"))
}

pub fn approx(actual: Option<f64>, expected: f64) -> bool {
    actual.is_some_and(|a| (a - expected).abs() <= expected.abs() * 1e-12 + 1e-9)
}
