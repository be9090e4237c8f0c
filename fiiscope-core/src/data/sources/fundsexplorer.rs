//! FundsExplorer: a JSON object embedded in the page's analytics script.
//!
//! The page assigns `var dataLayer_content = {...};` before calling
//! `dataLayer.push`. The object is cut out by those anchors, parsed once, and
//! every field is then a plain key lookup under `pagePostTerms.meta`.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::data::http::DocumentFetcher;
use crate::data::provider::{Extractor, FetchError, FieldTable, ProviderId};
use crate::domain::{FieldName, FieldValue, Ticker};
use crate::extract::{extract, parse_number, NumberFormat};

const HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("Accept-Language", "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7"),
    ("DNT", "1"),
    ("Upgrade-Insecure-Requests", "1"),
    (
        "User-Agent",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    ),
];

const PAYLOAD_START: &str = "var dataLayer_content";
const PAYLOAD_END: &str = "dataLayer.push";

/// The `pagePostTerms.meta` object.
pub type FundMeta = Map<String, Value>;

/// Cut the embedded payload out of the page and return its `meta` object.
pub fn parse_meta(html: &str) -> Result<FundMeta, FetchError> {
    let raw = extract(html, PAYLOAD_START, PAYLOAD_END, &[], false)
        .ok_or_else(|| FetchError::MalformedPayload("dataLayer_content not found".into()))?;
    let json = raw.trim_matches(|c: char| c == ';' || c == '=' || c.is_whitespace());

    let value: Value = serde_json::from_str(json)
        .map_err(|e| FetchError::MalformedPayload(format!("dataLayer_content: {e}")))?;

    value
        .get("pagePostTerms")
        .and_then(|terms| terms.get("meta"))
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| FetchError::MalformedPayload("pagePostTerms.meta missing".into()))
}

fn text(meta: &FundMeta, key: &str) -> Option<FieldValue> {
    match meta.get(key)? {
        Value::String(s) => Some(FieldValue::Text(s.trim().to_string())),
        Value::Number(n) => Some(FieldValue::Text(n.to_string())),
        _ => None,
    }
}

/// Numbers pass through; numeric strings are read plain first, Brazilian second.
fn number(meta: &FundMeta, key: &str) -> Option<FieldValue> {
    let value = match meta.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s.as_str(), NumberFormat::PLAIN)
            .or_else(|| parse_number(s.as_str(), NumberFormat::BRAZILIAN)),
        _ => None,
    };
    value.map(FieldValue::Number)
}

pub struct FundsExplorer {
    fetcher: Arc<dyn DocumentFetcher>,
    base_url: String,
}

impl FundsExplorer {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }
}

impl FieldTable for FundsExplorer {
    type Document = FundMeta;

    fn id(&self) -> ProviderId {
        ProviderId::Fundsexplorer
    }

    fn fetch(&self, ticker: &Ticker, _fields: &[FieldName]) -> Result<FundMeta, FetchError> {
        let url = format!(
            "{}/funds/{}",
            self.base_url.trim_end_matches('/'),
            ticker.to_lowercase()
        );
        let html = self.fetcher.get(&url, HEADERS)?;
        parse_meta(&html)
    }

    fn extractor(&self, field: FieldName) -> Option<Extractor<FundMeta>> {
        use FieldName::*;

        let read: Extractor<FundMeta> = match field {
            Name => |m| text(m, "name"),
            FundType => |m| text(m, "setor_atuacao"),
            Segment => |m| text(m, "segmento_ambima"),
            Actuation => |m| text(m, "segmento_atuacao"),
            Price => |m| number(m, "valor"),
            Liquidity => |m| number(m, "liquidezmediadiaria"),
            TotalIssuedShares => |m| number(m, "numero_cotas"),
            NetEquityValue => |m| number(m, "patrimonio"),
            EquityPrice => |m| number(m, "valorpatrimonialcota"),
            Variation12M => |m| number(m, "valorizacao_12_meses"),
            Variation30D => |m| number(m, "valorizacao_mes"),
            Min52Weeks => |m| number(m, "min_52_semanas"),
            Max52Weeks => |m| number(m, "max_52_semanas"),
            Pvp => |m| number(m, "pvp"),
            Dy => |m| number(m, "dy"),
            LatestsDividends => |m| number(m, "dividendos_12_meses"),
            LatestDividend => |m| number(m, "lastdividend"),
            Vacancy => |m| number(m, "vacancia"),
            TotalRealState => |m| number(m, "assets_number"),
            Management => |m| text(m, "gestao"),
            CashValue => |m| number(m, "valor_caixa"),
            MarketValue => |m| number(m, "valormercado"),
            InitialDate => |m| text(m, "firstdate"),
            TargetPublic => |m| text(m, "publicoalvo"),
            Term => |m| text(m, "prazoduracao"),
            Link | Ffoy | AssetsValue => return None,
        };
        Some(read)
    }
}
