//! Investidor10: summary cards at the top of the page plus an information grid
//! of `<div class='cell'>` blocks further down.
//!
//! Large amounts are printed with a magnitude suffix ("1,2 M", "350 Mil") and go
//! through [`parse_scaled`]. The property count is not printed anywhere; it is
//! the number of property cards in the "Lista de Imóveis" section.

use std::sync::Arc;

use crate::data::http::DocumentFetcher;
use crate::data::provider::{Extractor, FetchError, FieldTable, ProviderId};
use crate::domain::{FieldName, FieldValue, Ticker};
use crate::extract::{count_occurrences, parse_number, parse_scaled, Anchored, NumberFormat};

const HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("Accept-Language", "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7"),
    ("Referer", "https://investidor10.com.br"),
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36",
    ),
];

const CLEANUP: &[&str] = &[
    "</div>",
    "<div>",
    "<div class=\"value\">",
    "<div class=\"_card-body\">",
    "</span>",
    "<span>",
    "<span class=\"value\">",
];

const GRID_END: &str = "<div class='cell'>";
const CARD_END: &str = "</span>";

const fn grid(label: &'static str) -> Anchored {
    Anchored::new(label, GRID_END).cleaned(CLEANUP).stripped()
}

const fn card(label: &'static str) -> Anchored {
    Anchored::new(label, CARD_END).cleaned(CLEANUP).stripped()
}

const NAME: Anchored = grid("Razão Social");
const FUND_TYPE: Anchored = grid("TIPO DE FUNDO");
const SEGMENT: Anchored = grid("SEGMENTO");
const PRICE: Anchored = card("Cotação</span>");
const LIQUIDITY: Anchored = card("title=\"Liquidez Diária\">Liquidez Diária</span>");
const ISSUED_SHARES: Anchored = grid("COTAS EMITIDAS");
const NET_EQUITY: Anchored = grid("VALOR PATRIMONIAL");
const EQUITY_PRICE: Anchored = grid("VAL. PATRIMONIAL P/ COTA");
const VARIATION_12M: Anchored = card("title=\"Variação (12M)\">VARIAÇÃO (12M)</span>");
const PVP: Anchored = card("title=\"P/VP\">P/VP</span>");
const DY: Anchored = card("DY (12M)</span>");
const LATEST_DIVIDEND: Anchored = card("ÚLTIMO RENDIMENTO");
const VACANCY: Anchored = grid("VACÂNCIA");
const MANAGEMENT: Anchored = grid("TIPO DE GESTÃO");
const TARGET_PUBLIC: Anchored = grid("PÚBLICO-ALVO");
const TERM: Anchored = grid("PRAZO DE DURAÇÃO");

// The inner anchor must survive the outer capture, so no cleanup there.
const DIVIDENDS_SECTION: Anchored =
    Anchored::new("YIELD 6 MESES", "<div class=\"content--info--item\">");
const DIVIDENDS_AMOUNT: Anchored = Anchored::new("content--info--item--value amount\">", "</span>");

const PROPERTY_SECTION: Anchored =
    Anchored::new("Lista de Imóveis", "<button data-id=\"read-more-action");
const PROPERTY_CARD: &str = "card-propertie";

fn text(html: &String, anchor: Anchored) -> Option<FieldValue> {
    anchor.extract(html).map(FieldValue::Text)
}

fn number(html: &String, anchor: Anchored) -> Option<FieldValue> {
    anchor
        .extract(html)
        .and_then(|t| parse_number(t.as_str(), NumberFormat::BRAZILIAN))
        .map(FieldValue::Number)
}

fn scaled(html: &String, anchor: Anchored) -> Option<FieldValue> {
    anchor
        .extract(html)
        .and_then(|t| parse_scaled(&t, NumberFormat::BRAZILIAN))
        .map(FieldValue::Number)
}

fn latests_dividends(html: &String) -> Option<FieldValue> {
    let section = DIVIDENDS_SECTION.extract(html)?;
    DIVIDENDS_AMOUNT
        .extract(&section)
        .and_then(|t| parse_number(t.as_str(), NumberFormat::BRAZILIAN))
        .map(FieldValue::Number)
}

fn property_count(html: &String) -> Option<FieldValue> {
    let section = PROPERTY_SECTION.extract(html)?;
    Some(FieldValue::Number(count_occurrences(&section, PROPERTY_CARD) as f64))
}

pub struct Investidor10 {
    fetcher: Arc<dyn DocumentFetcher>,
    base_url: String,
}

impl Investidor10 {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }
}

impl FieldTable for Investidor10 {
    type Document = String;

    fn id(&self) -> ProviderId {
        ProviderId::Investidor10
    }

    fn fetch(&self, ticker: &Ticker, _fields: &[FieldName]) -> Result<String, FetchError> {
        let url = format!(
            "{}/fiis/{}/",
            self.base_url.trim_end_matches('/'),
            ticker.to_lowercase()
        );
        let html = self.fetcher.get(&url, HEADERS)?;
        // An unknown ticker still answers 200 with a landing page; without the
        // grid there is nothing to read.
        if !html.contains(NAME.start) && !html.contains(PRICE.start) {
            return Err(FetchError::TickerNotFound {
                ticker: ticker.to_string(),
            });
        }
        Ok(html)
    }

    fn extractor(&self, field: FieldName) -> Option<Extractor<String>> {
        use FieldName::*;

        let read: Extractor<String> = match field {
            Name => |h| text(h, NAME),
            FundType => |h| text(h, FUND_TYPE),
            Segment => |h| text(h, SEGMENT),
            Price => |h| number(h, PRICE),
            Liquidity => |h| scaled(h, LIQUIDITY),
            TotalIssuedShares => |h| number(h, ISSUED_SHARES),
            NetEquityValue => |h| scaled(h, NET_EQUITY),
            EquityPrice => |h| number(h, EQUITY_PRICE),
            Variation12M => |h| number(h, VARIATION_12M),
            Pvp => |h| number(h, PVP),
            Dy => |h| number(h, DY),
            LatestsDividends => latests_dividends,
            LatestDividend => |h| number(h, LATEST_DIVIDEND),
            Vacancy => |h| number(h, VACANCY),
            TotalRealState => property_count,
            Management => |h| text(h, MANAGEMENT),
            TargetPublic => |h| text(h, TARGET_PUBLIC),
            Term => |h| text(h, TERM),
            Actuation | Link | Variation30D | Min52Weeks | Max52Weeks | Ffoy | CashValue
            | AssetsValue | MarketValue | InitialDate => return None,
        };
        Some(read)
    }
}
