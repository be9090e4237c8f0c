//! Canonical field tags and scalar values.
//!
//! `FieldName` unifies the heterogeneous provider schemas into one closed set.
//! The variant order is the canonical output order: `CanonicalRecord` keeps its
//! fields in a `BTreeMap`, which sorts by the derived `Ord`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DomainError;

/// One normalized fund attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldName {
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "type")]
    FundType,
    #[serde(rename = "segment")]
    Segment,
    #[serde(rename = "actuation")]
    Actuation,
    #[serde(rename = "link")]
    Link,
    #[serde(rename = "price")]
    Price,
    #[serde(rename = "liquidity")]
    Liquidity,
    #[serde(rename = "total_issued_shares")]
    TotalIssuedShares,
    #[serde(rename = "net_equity_value")]
    NetEquityValue,
    #[serde(rename = "equity_price")]
    EquityPrice,
    #[serde(rename = "variation_12M")]
    Variation12M,
    #[serde(rename = "variation_30D")]
    Variation30D,
    #[serde(rename = "min_52_weeks")]
    Min52Weeks,
    #[serde(rename = "max_52_weeks")]
    Max52Weeks,
    #[serde(rename = "PVP")]
    Pvp,
    #[serde(rename = "DY")]
    Dy,
    #[serde(rename = "latests_dividends")]
    LatestsDividends,
    #[serde(rename = "latest_dividend")]
    LatestDividend,
    #[serde(rename = "ffoy")]
    Ffoy,
    #[serde(rename = "vacancy")]
    Vacancy,
    #[serde(rename = "total_real_state")]
    TotalRealState,
    #[serde(rename = "management")]
    Management,
    #[serde(rename = "cash_value")]
    CashValue,
    #[serde(rename = "assets_value")]
    AssetsValue,
    #[serde(rename = "market_value")]
    MarketValue,
    #[serde(rename = "initial_date")]
    InitialDate,
    #[serde(rename = "target_public")]
    TargetPublic,
    #[serde(rename = "term")]
    Term,
}

impl FieldName {
    /// Every field, in canonical order.
    pub const ALL: [FieldName; 28] = [
        FieldName::Name,
        FieldName::FundType,
        FieldName::Segment,
        FieldName::Actuation,
        FieldName::Link,
        FieldName::Price,
        FieldName::Liquidity,
        FieldName::TotalIssuedShares,
        FieldName::NetEquityValue,
        FieldName::EquityPrice,
        FieldName::Variation12M,
        FieldName::Variation30D,
        FieldName::Min52Weeks,
        FieldName::Max52Weeks,
        FieldName::Pvp,
        FieldName::Dy,
        FieldName::LatestsDividends,
        FieldName::LatestDividend,
        FieldName::Ffoy,
        FieldName::Vacancy,
        FieldName::TotalRealState,
        FieldName::Management,
        FieldName::CashValue,
        FieldName::AssetsValue,
        FieldName::MarketValue,
        FieldName::InitialDate,
        FieldName::TargetPublic,
        FieldName::Term,
    ];

    /// Wire name, identical to the serde rename.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Name => "name",
            FieldName::FundType => "type",
            FieldName::Segment => "segment",
            FieldName::Actuation => "actuation",
            FieldName::Link => "link",
            FieldName::Price => "price",
            FieldName::Liquidity => "liquidity",
            FieldName::TotalIssuedShares => "total_issued_shares",
            FieldName::NetEquityValue => "net_equity_value",
            FieldName::EquityPrice => "equity_price",
            FieldName::Variation12M => "variation_12M",
            FieldName::Variation30D => "variation_30D",
            FieldName::Min52Weeks => "min_52_weeks",
            FieldName::Max52Weeks => "max_52_weeks",
            FieldName::Pvp => "PVP",
            FieldName::Dy => "DY",
            FieldName::LatestsDividends => "latests_dividends",
            FieldName::LatestDividend => "latest_dividend",
            FieldName::Ffoy => "ffoy",
            FieldName::Vacancy => "vacancy",
            FieldName::TotalRealState => "total_real_state",
            FieldName::Management => "management",
            FieldName::CashValue => "cash_value",
            FieldName::AssetsValue => "assets_value",
            FieldName::MarketValue => "market_value",
            FieldName::InitialDate => "initial_date",
            FieldName::TargetPublic => "target_public",
            FieldName::Term => "term",
        }
    }

    /// Parse a comma-separated list of field names. Blank input yields an empty list.
    pub fn parse_list(input: &str) -> Result<Vec<FieldName>, DomainError> {
        input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(FieldName::from_str)
            .collect()
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        FieldName::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::UnknownField(wanted.to_string()))
    }
}

/// A scalar field value as scraped and normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Whether this value counts as "filled" for merge purposes.
    ///
    /// Blank text and non-finite numbers are treated as absent. Zero is a real
    /// observation: the normalizer reports absence as `None`, never as `0.0`.
    pub fn is_filled(&self) -> bool {
        match self {
            FieldValue::Number(n) => n.is_finite(),
            FieldValue::Text(s) => !s.trim().is_empty(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}
