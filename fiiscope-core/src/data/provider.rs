//! Source adapter traits and structured error types.
//!
//! A provider is described by a [`FieldTable`]: how to fetch its document and
//! which pure extractor reads each field out of it. The blanket
//! [`SourceAdapter`] impl turns any table into an object the merge engine can
//! drive, with per-field failure isolation and "fetch failed ⇒ contributed
//! nothing" semantics.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{DomainError, FieldName, FieldValue, Ticker};

/// Structured error types for document retrieval.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("ticker not found: {ticker}")]
    TickerNotFound { ticker: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("hard stop: provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("fetch error: {0}")]
    Other(String),
}

/// Identifier of a public data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Fundamentus,
    Fundsexplorer,
    Investidor10,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [
        ProviderId::Fundamentus,
        ProviderId::Fundsexplorer,
        ProviderId::Investidor10,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Fundamentus => "fundamentus",
            ProviderId::Fundsexplorer => "fundsexplorer",
            ProviderId::Investidor10 => "investidor10",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ProviderId::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::UnknownSource(wanted.to_string()))
    }
}

/// Which providers a request may consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SourceSelector {
    #[default]
    All,
    Only(ProviderId),
}

impl SourceSelector {
    /// Stable textual form, used in cache fingerprints.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSelector::All => "all",
            SourceSelector::Only(p) => p.as_str(),
        }
    }

    /// Trust order for this selector: a single provider, or the default order.
    pub fn trust_order(&self, default: &TrustOrder) -> TrustOrder {
        match self {
            SourceSelector::All => default.clone(),
            SourceSelector::Only(p) => TrustOrder(vec![*p]),
        }
    }
}

impl fmt::Display for SourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceSelector {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(SourceSelector::All)
        } else {
            s.parse().map(SourceSelector::Only)
        }
    }
}

impl TryFrom<String> for SourceSelector {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SourceSelector> for String {
    fn from(s: SourceSelector) -> Self {
        s.as_str().to_string()
    }
}

/// Strictly ordered, non-repeating provider preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ProviderId>", into = "Vec<ProviderId>")]
pub struct TrustOrder(Vec<ProviderId>);

impl TrustOrder {
    pub fn new(order: Vec<ProviderId>) -> Result<Self, DomainError> {
        if order.is_empty() {
            return Err(DomainError::InvalidTrustOrder("empty".into()));
        }
        let mut seen = HashSet::new();
        for p in &order {
            if !seen.insert(*p) {
                return Err(DomainError::InvalidTrustOrder(format!("{p} repeated")));
            }
        }
        Ok(Self(order))
    }

    pub fn providers(&self) -> &[ProviderId] {
        &self.0
    }
}

impl Default for TrustOrder {
    fn default() -> Self {
        Self(ProviderId::ALL.to_vec())
    }
}

impl TryFrom<Vec<ProviderId>> for TrustOrder {
    type Error = DomainError;

    fn try_from(value: Vec<ProviderId>) -> Result<Self, Self::Error> {
        TrustOrder::new(value)
    }
}

impl From<TrustOrder> for Vec<ProviderId> {
    fn from(order: TrustOrder) -> Self {
        order.0
    }
}

/// Pure field reader over a provider document.
pub type Extractor<D> = fn(&D) -> Option<FieldValue>;

/// Per-provider field dispatch table.
///
/// `fetch` receives the requested field subset so it can skip auxiliary
/// downloads nobody asked for. `extractor` maps a field tag to the pure
/// function reading it; `None` means the provider does not carry the field.
pub trait FieldTable: Send + Sync {
    type Document;

    fn id(&self) -> ProviderId;

    fn fetch(&self, ticker: &Ticker, fields: &[FieldName]) -> Result<Self::Document, FetchError>;

    fn extractor(&self, field: FieldName) -> Option<Extractor<Self::Document>>;
}

/// What one provider added to a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contribution {
    pub values: BTreeMap<FieldName, FieldValue>,
    /// Requested fields the provider has no extractor for.
    pub unsupported: Vec<FieldName>,
    /// Requested, supported fields whose extractor found nothing.
    pub missing: Vec<FieldName>,
    /// Set when the document could not be retrieved at all.
    pub fetch_error: Option<String>,
}

impl Contribution {
    pub fn failed(error: &FetchError) -> Self {
        Self {
            fetch_error: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Object-safe provider interface consumed by the merge engine.
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Fetch once and extract every requested field the provider carries.
    ///
    /// Never fails: a retrieval error yields an empty contribution, and a field
    /// that cannot be read is skipped without affecting its siblings.
    fn contribute(&self, ticker: &Ticker, fields: &[FieldName]) -> Contribution;
}

impl<T: FieldTable> SourceAdapter for T {
    fn id(&self) -> ProviderId {
        FieldTable::id(self)
    }

    fn contribute(&self, ticker: &Ticker, fields: &[FieldName]) -> Contribution {
        let provider = FieldTable::id(self);
        let document = match self.fetch(ticker, fields) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(%ticker, %provider, error = %e, "provider contributed nothing");
                return Contribution::failed(&e);
            }
        };

        let mut contribution = Contribution::default();
        for &field in fields {
            let Some(read) = self.extractor(field) else {
                contribution.unsupported.push(field);
                continue;
            };
            match read(&document).filter(FieldValue::is_filled) {
                Some(value) => {
                    contribution.values.insert(field, value);
                }
                None => {
                    tracing::trace!(%ticker, %provider, %field, "field not found");
                    contribution.missing.push(field);
                }
            }
        }

        tracing::debug!(
            %ticker,
            %provider,
            filled = contribution.values.len(),
            missing = contribution.missing.len(),
            unsupported = contribution.unsupported.len(),
            "provider contribution"
        );
        contribution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_order_rejects_empty_and_repeats() {
        assert!(TrustOrder::new(vec![]).is_err());
        assert!(TrustOrder::new(vec![ProviderId::Fundamentus, ProviderId::Fundamentus]).is_err());
        assert!(TrustOrder::new(vec![ProviderId::Investidor10, ProviderId::Fundamentus]).is_ok());
    }

    #[test]
    fn trust_order_deserialization_validates() {
        let ok: TrustOrder = serde_json::from_str(r#"["fundsexplorer","fundamentus"]"#).unwrap();
        assert_eq!(ok.providers(), &[ProviderId::Fundsexplorer, ProviderId::Fundamentus]);
        assert!(serde_json::from_str::<TrustOrder>(r#"["fundamentus","fundamentus"]"#).is_err());
    }

    #[test]
    fn selector_parsing() {
        assert_eq!("ALL".parse::<SourceSelector>().unwrap(), SourceSelector::All);
        assert_eq!(
            "Investidor10".parse::<SourceSelector>().unwrap(),
            SourceSelector::Only(ProviderId::Investidor10)
        );
        assert!("statusinvest".parse::<SourceSelector>().is_err());
    }

    #[test]
    fn single_source_selector_yields_single_provider_order() {
        let order =
            SourceSelector::Only(ProviderId::Fundsexplorer).trust_order(&TrustOrder::default());
        assert_eq!(order.providers(), &[ProviderId::Fundsexplorer]);
        let all = SourceSelector::All.trust_order(&TrustOrder::default());
        assert_eq!(all.providers(), &ProviderId::ALL);
    }

    struct Table {
        fail: bool,
    }

    impl FieldTable for Table {
        type Document = String;

        fn id(&self) -> ProviderId {
            ProviderId::Fundamentus
        }

        fn fetch(&self, _: &Ticker, _: &[FieldName]) -> Result<String, FetchError> {
            if self.fail {
                Err(FetchError::NetworkUnreachable("down".into()))
            } else {
                Ok("Cotação:10,00|".into())
            }
        }

        fn extractor(&self, field: FieldName) -> Option<Extractor<String>> {
            match field {
                FieldName::Price => Some(|doc| {
                    crate::extract::extract(doc, "Cotação:", "|", &[], false)
                        .and_then(|t| crate::extract::parse_number(t.as_str(), Default::default()))
                        .map(FieldValue::Number)
                }),
                FieldName::Name => Some(|_| None),
                _ => None,
            }
        }
    }

    #[test]
    fn contribution_isolates_fields() {
        let ticker = Ticker::new("ABCD11").unwrap();
        let c = Table { fail: false }.contribute(
            &ticker,
            &[FieldName::Price, FieldName::Name, FieldName::Dy],
        );
        assert_eq!(c.values.get(&FieldName::Price), Some(&FieldValue::Number(10.0)));
        assert_eq!(c.missing, vec![FieldName::Name]);
        assert_eq!(c.unsupported, vec![FieldName::Dy]);
        assert!(c.fetch_error.is_none());
    }

    #[test]
    fn fetch_failure_contributes_nothing() {
        let ticker = Ticker::new("ABCD11").unwrap();
        let c = Table { fail: true }.contribute(&ticker, &[FieldName::Price]);
        assert!(c.is_empty());
        assert!(c.fetch_error.unwrap().contains("down"));
    }
}
