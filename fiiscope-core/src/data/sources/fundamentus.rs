//! Fundamentus: label/value table cells on `detalhes.php`.
//!
//! The richest and most fragile provider. Every value lives in a `<td>` right
//! after a `<span class="txt">Label</span>` cell. A few fields are not on the
//! main page at all; they come from the fund's filing document, located through
//! the registration number (CNPJ) printed in the page's document-search link.
//! The filing is only downloaded when one of those fields was requested.

use std::sync::Arc;

use crate::data::http::DocumentFetcher;
use crate::data::provider::{Extractor, FetchError, FieldTable, ProviderId};
use crate::domain::{FieldName, FieldValue, Ticker};
use crate::extract::{count_occurrences, extract, parse_number, NumberFormat};

const HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("Accept-Language", "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7"),
    ("Referer", "https://fundamentus.com.br/index.php"),
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36",
    ),
];

const CELL_END: &str = "</span>";

const CLEANUP: &[&str] = &[
    "</span>",
    "<span class=\"txt\">",
    "<span class=\"oscil\">",
    "</td>",
    "<td class=\"data\">",
    "<td class=\"data w1\">",
    "<td class=\"data w2\">",
    "<td class=\"data w3\">",
    "<td class=\"data destaque w3\">",
    "<a href=\"resultado.php?segmento=",
    "<font color=\"#306EFF\">",
    "<font color=\"#F75D59\">",
];

const CNPJ_START: &str = "abrirGerenciadorDocumentosCVM?cnpjFundo=";
const CNPJ_END: &str = "\">Pesquisar Documentos";
const DOCUMENT_MANAGER_URL: &str =
    "https://fnet.bmfbovespa.com.br/fnet/publico/abrirGerenciadorDocumentosCVM?cnpjFundo=";

const NOT_FOUND_MARKER: &str = "Nenhum papel encontrado";

const PROPERTY_COUNT_LABEL: &str = "Qtd imóveis</span>";
const PROPERTY_TABLE_START: &str = "Relação de Imóveis";
const PROPERTY_TABLE_END: &str = "</table>";

/// Fields read from the filing rather than the main page.
const FILING_FIELDS: [FieldName; 4] = [
    FieldName::InitialDate,
    FieldName::TargetPublic,
    FieldName::Term,
    FieldName::TotalRealState,
];

/// One fetched Fundamentus page plus whatever auxiliary data it needed.
#[derive(Debug, Clone, Default)]
pub struct FundamentusPage {
    pub html: String,
    pub cnpj: Option<String>,
    pub filing: Option<String>,
}

impl FundamentusPage {
    fn cell(&self, label: &str) -> Option<String> {
        extract(&self.html, label, CELL_END, CLEANUP, true)
    }

    fn filing_cell(&self, label: &str) -> Option<String> {
        self.filing
            .as_deref()
            .and_then(|doc| extract(doc, label, CELL_END, CLEANUP, true))
    }

    /// Approximate property count: data rows in the filing's property table.
    fn filing_property_count(&self) -> Option<f64> {
        let filing = self.filing.as_deref()?;
        let table = extract(filing, PROPERTY_TABLE_START, PROPERTY_TABLE_END, &[], false)?;
        let rows = count_occurrences(&table, "<tr");
        // first row is the header
        Some(rows.saturating_sub(1) as f64)
    }
}

fn text(page: &FundamentusPage, label: &str) -> Option<FieldValue> {
    page.cell(label).map(FieldValue::Text)
}

fn number(page: &FundamentusPage, label: &str) -> Option<FieldValue> {
    page.cell(label)
        .and_then(|t| parse_number(t.as_str(), NumberFormat::BRAZILIAN))
        .map(FieldValue::Number)
}

fn filing_text(page: &FundamentusPage, label: &str) -> Option<FieldValue> {
    page.filing_cell(label).map(FieldValue::Text)
}

pub struct Fundamentus {
    fetcher: Arc<dyn DocumentFetcher>,
    base_url: String,
    filing_url_template: String,
}

impl Fundamentus {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        base_url: impl Into<String>,
        filing_url_template: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            filing_url_template: filing_url_template.into(),
        }
    }

    fn page_url(&self, ticker: &Ticker) -> String {
        format!(
            "{}/detalhes.php?papel={}",
            self.base_url.trim_end_matches('/'),
            ticker.as_str()
        )
    }

    /// Download the filing; a failure only costs the filing-backed fields.
    fn fetch_filing(&self, ticker: &Ticker, cnpj: &str) -> Option<String> {
        let url = self.filing_url_template.replace("{cnpj}", cnpj);
        match self.fetcher.get(&url, HEADERS) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(%ticker, cnpj, error = %e, "filing fetch failed");
                None
            }
        }
    }

    fn needs_filing(page: &FundamentusPage, fields: &[FieldName]) -> bool {
        fields.iter().any(|f| match f {
            FieldName::TotalRealState => number(page, PROPERTY_COUNT_LABEL).is_none(),
            other => FILING_FIELDS.contains(other),
        })
    }
}

impl FieldTable for Fundamentus {
    type Document = FundamentusPage;

    fn id(&self) -> ProviderId {
        ProviderId::Fundamentus
    }

    fn fetch(&self, ticker: &Ticker, fields: &[FieldName]) -> Result<FundamentusPage, FetchError> {
        let html = self.fetcher.get(&self.page_url(ticker), HEADERS)?;
        if html.contains(NOT_FOUND_MARKER) {
            return Err(FetchError::TickerNotFound {
                ticker: ticker.to_string(),
            });
        }

        let mut page = FundamentusPage {
            cnpj: extract(&html, CNPJ_START, CNPJ_END, &[], false),
            html,
            filing: None,
        };

        if Self::needs_filing(&page, fields) {
            page.filing = match page.cnpj.as_deref() {
                Some(cnpj) => self.fetch_filing(ticker, cnpj),
                None => {
                    tracing::debug!(%ticker, "no CNPJ on page; skipping filing");
                    None
                }
            };
        }

        Ok(page)
    }

    fn extractor(&self, field: FieldName) -> Option<Extractor<FundamentusPage>> {
        use FieldName::*;

        let read: Extractor<FundamentusPage> = match field {
            Name => |p| text(p, "Nome</span>"),
            Segment => |p| text(p, "Mandato</span>"),
            Link => |p| {
                p.cnpj
                    .as_ref()
                    .map(|cnpj| FieldValue::Text(format!("{DOCUMENT_MANAGER_URL}{cnpj}")))
            },
            Price => |p| number(p, "Cotação</span>"),
            Liquidity => |p| number(p, "Vol $ méd (2m)</span>"),
            TotalIssuedShares => |p| number(p, "Nro. Cotas</span>"),
            NetEquityValue => |p| number(p, "Patrim Líquido</span>"),
            EquityPrice => |p| number(p, "VP/Cota</span>"),
            Variation12M => |p| number(p, "12 meses</span>"),
            Variation30D => |p| number(p, "Mês</span>"),
            Min52Weeks => |p| number(p, "Min 52 sem</span>"),
            Max52Weeks => |p| number(p, "Max 52 sem</span>"),
            Pvp => |p| number(p, "P/VP</span>"),
            Dy => |p| number(p, "Div. Yield</span>"),
            LatestDividend => |p| number(p, "Dividendo/cota</span>"),
            Ffoy => |p| number(p, "FFO Yield</span>"),
            Vacancy => |p| number(p, "Vacância Média</span>"),
            TotalRealState => |p| {
                number(p, PROPERTY_COUNT_LABEL)
                    .or_else(|| p.filing_property_count().map(FieldValue::Number))
            },
            Management => |p| text(p, "Gestão</span>"),
            // chart series in an inline script; plain JS number when parseable
            CashValue => |p| {
                extract(&p.html, "Caixa'", "]", &[", data : ["], false).map(|raw| {
                    parse_number(raw.as_str(), NumberFormat::PLAIN)
                        .map_or(FieldValue::Text(raw), FieldValue::Number)
                })
            },
            AssetsValue => |p| number(p, ">Ativos</span>"),
            MarketValue => |p| number(p, "Valor de mercado</span>"),
            InitialDate => |p| filing_text(p, "Data de Funcionamento:</span>"),
            TargetPublic => |p| filing_text(p, "Público Alvo:</span>"),
            Term => |p| filing_text(p, "Prazo de Duração:</span>"),
            FundType | Actuation | LatestsDividends => return None,
        };
        Some(read)
    }
}
