//! Locale-aware numeric normalization.
//!
//! Provider pages render numbers Brazilian-style (`1.234,56`, `12,5%`,
//! `R$ 9,80`). [`parse_number`] turns them into `f64` and reports absence as
//! `None`; [`to_number`] is the lenient variant that collapses absence and
//! parse failure into `0.0`.

/// How to read a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    /// Treat `.` as thousands separator and `,` as decimal separator.
    pub swap_separators: bool,
    /// Divide percentages by 100 (`12,5%` → `0.125`).
    pub percent_as_fraction: bool,
}

impl NumberFormat {
    /// `1.234,56` style, percentages kept as-is.
    pub const BRAZILIAN: NumberFormat = NumberFormat {
        swap_separators: true,
        percent_as_fraction: false,
    };

    /// `1234.56` style, percentages kept as-is.
    pub const PLAIN: NumberFormat = NumberFormat {
        swap_separators: false,
        percent_as_fraction: false,
    };

    pub const fn with_percent_as_fraction(mut self) -> Self {
        self.percent_as_fraction = true;
        self
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::BRAZILIAN
    }
}

/// Input accepted by the normalizer: text, an already-numeric value, or nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawNumber<'a> {
    Text(&'a str),
    Number(f64),
    Absent,
}

impl<'a> From<&'a str> for RawNumber<'a> {
    fn from(s: &'a str) -> Self {
        RawNumber::Text(s)
    }
}

impl<'a> From<&'a String> for RawNumber<'a> {
    fn from(s: &'a String) -> Self {
        RawNumber::Text(s.as_str())
    }
}

impl<'a> From<Option<&'a str>> for RawNumber<'a> {
    fn from(s: Option<&'a str>) -> Self {
        s.map_or(RawNumber::Absent, RawNumber::Text)
    }
}

impl<'a> From<&'a Option<String>> for RawNumber<'a> {
    fn from(s: &'a Option<String>) -> Self {
        s.as_deref().into()
    }
}

impl From<f64> for RawNumber<'_> {
    fn from(n: f64) -> Self {
        RawNumber::Number(n)
    }
}

const CURRENCY: &str = "R$";

/// Parse a locale-formatted number. `None` means "no value".
///
/// Finite numbers pass through untouched; NaN and infinities are `None`.
/// Text is trimmed; with `swap_separators` every `.` is dropped and `,`
/// becomes the decimal point. A `%` is stripped (and the result divided by
/// 100 only with `percent_as_fraction`). A leading `R$` is stripped.
/// Anything that still fails to parse, or parses to a non-finite value, is
/// `None`.
pub fn parse_number<'a>(input: impl Into<RawNumber<'a>>, format: NumberFormat) -> Option<f64> {
    let text = match input.into() {
        RawNumber::Number(n) => return Some(n).filter(|v| v.is_finite()),
        RawNumber::Absent => return None,
        RawNumber::Text(t) => t.trim(),
    };
    if text.is_empty() {
        return None;
    }

    let mut text = if format.swap_separators {
        text.replace('.', "").replace(',', ".")
    } else {
        text.to_string()
    };

    let is_percent = text.contains('%');
    if is_percent {
        text = text.replace('%', "");
    }

    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix(CURRENCY).unwrap_or(trimmed).trim();

    let value: f64 = trimmed.parse().ok().filter(|v: &f64| v.is_finite())?;

    if is_percent && format.percent_as_fraction {
        Some(value / 100.0)
    } else {
        Some(value)
    }
}

/// Lenient form of [`parse_number`]: absence and garbage both become `0.0`.
pub fn to_number<'a>(input: impl Into<RawNumber<'a>>, format: NumberFormat) -> f64 {
    parse_number(input, format).unwrap_or(0.0)
}

/// Parse a number followed by an optional magnitude word (`1,2 K`, `R$ 3,4 Milhões`).
///
/// Recognized units: k/mil/thousand (×1e3), m/mi/milhão/milhões/million (×1e6),
/// b/bi/bilhão/bilhões/billion (×1e9). An unrecognized trailing word yields `None`.
pub fn parse_scaled(text: &str, format: NumberFormat) -> Option<f64> {
    let text = text.trim();
    let split = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphabetic() || c.is_whitespace())
        .last()
        .map_or(text.len(), |(i, _)| i);
    let (number, unit) = text.split_at(split);

    let multiplier = unit_multiplier(unit.trim())?;
    parse_number(number, format).map(|v| v * multiplier)
}

fn unit_multiplier(unit: &str) -> Option<f64> {
    let unit = unit.to_lowercase();
    match unit.as_str() {
        "" => Some(1.0),
        "k" | "mil" | "thousand" => Some(1e3),
        "m" | "mi" | "milhão" | "milhao" | "milhões" | "milhoes" | "million" => Some(1e6),
        "b" | "bi" | "bilhão" | "bilhao" | "bilhões" | "bilhoes" | "billion" => Some(1e9),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn brazilian_thousands_and_decimals() {
        assert!(approx(to_number("1.234,56", NumberFormat::BRAZILIAN), 1234.56));
    }

    #[test]
    fn percent_as_fraction() {
        let fmt = NumberFormat::BRAZILIAN.with_percent_as_fraction();
        assert!(approx(to_number("12,5%", fmt), 0.125));
    }

    #[test]
    fn percent_kept_as_points_by_default() {
        assert!(approx(to_number("12,5%", NumberFormat::BRAZILIAN), 12.5));
    }

    #[test]
    fn lenient_form_returns_zero_for_absence() {
        assert_eq!(to_number("", NumberFormat::BRAZILIAN), 0.0);
        assert_eq!(to_number(None::<&str>, NumberFormat::BRAZILIAN), 0.0);
        assert_eq!(to_number("n/d", NumberFormat::BRAZILIAN), 0.0);
    }

    #[test]
    fn strict_form_separates_absence_from_zero() {
        assert_eq!(parse_number("", NumberFormat::BRAZILIAN), None);
        assert_eq!(parse_number(None::<&str>, NumberFormat::BRAZILIAN), None);
        assert_eq!(parse_number("-", NumberFormat::BRAZILIAN), None);
        assert_eq!(parse_number("0,00%", NumberFormat::BRAZILIAN), Some(0.0));
        assert_eq!(parse_number("0", NumberFormat::BRAZILIAN), Some(0.0));
    }

    #[test]
    fn numbers_pass_through() {
        assert_eq!(parse_number(42.5, NumberFormat::BRAZILIAN), Some(42.5));
    }

    #[test]
    fn strips_currency_marker() {
        assert!(approx(to_number("R$ 9,87", NumberFormat::BRAZILIAN), 9.87));
        assert!(approx(to_number("R$1.000,00", NumberFormat::BRAZILIAN), 1000.0));
    }

    #[test]
    fn plain_format_keeps_dot_decimal() {
        assert!(approx(to_number("1234.5", NumberFormat::PLAIN), 1234.5));
        assert_eq!(parse_number("1.234,5", NumberFormat::PLAIN), None);
    }

    #[test]
    fn non_finite_numbers_are_absent() {
        for n in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(parse_number(n, NumberFormat::BRAZILIAN), None);
            assert_eq!(to_number(n, NumberFormat::BRAZILIAN), 0.0);
        }
    }

    #[test]
    fn non_finite_text_is_rejected() {
        assert_eq!(parse_number("inf", NumberFormat::PLAIN), None);
        assert_eq!(parse_number("NaN", NumberFormat::PLAIN), None);
    }

    #[test]
    fn scaled_units() {
        let fmt = NumberFormat::BRAZILIAN;
        assert!(approx(parse_scaled("1,5 K", fmt).unwrap(), 1500.0));
        assert!(approx(parse_scaled("R$ 2,25 Milhões", fmt).unwrap(), 2_250_000.0));
        assert!(approx(parse_scaled("R$ 1,1 Bilhões", fmt).unwrap(), 1_100_000_000.0));
        assert!(approx(parse_scaled("3 mil", fmt).unwrap(), 3000.0));
        assert!(approx(parse_scaled("850.000", fmt).unwrap(), 850_000.0));
        assert!(approx(parse_scaled("7M", fmt).unwrap(), 7_000_000.0));
    }

    #[test]
    fn scaled_rejects_unknown_unit_and_empty() {
        assert_eq!(parse_scaled("12 dúzias", NumberFormat::BRAZILIAN), None);
        assert_eq!(parse_scaled("", NumberFormat::BRAZILIAN), None);
        assert_eq!(parse_scaled("Milhões", NumberFormat::BRAZILIAN), None);
    }
}
