// Utility functions: text folding, header matching, dates
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static LEADING_ZEROS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b0+(\d)").expect("valid regex"));

/// Replaces Spanish accented letters with their plain ASCII form.
pub fn fold_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'Á' | 'À' | 'Ä' | 'Â' => 'A',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            'Ñ' => 'N',
            other => other,
        })
        .collect()
}

/// Collapses runs of whitespace into a single space and trims.
pub fn squash_spaces(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Lower-cased, accent-free key for header lookups ("Ubicación" -> "ubicacion",
/// "CAFE_TIPO" -> "cafetipo").
pub fn norm_col(header: &str) -> String {
    fold_accents(&header.trim().to_lowercase())
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect()
}

/// Canonical apartment name, so "Apolo 029 " and "APOLO 29" compare equal.
pub fn norm_apartment(name: &str) -> String {
    let folded = squash_spaces(&fold_accents(name));
    LEADING_ZEROS
        .replace_all(&folded, "$1")
        .to_uppercase()
}

/// Warehouse identifiers are compared trimmed and case-insensitively.
pub fn norm_warehouse(id: &str) -> String {
    squash_spaces(id).to_uppercase()
}

/// Treats the usual spreadsheet placeholders as missing.
pub fn clean_cell(value: &str) -> Option<String> {
    let v = squash_spaces(value);
    match v.to_lowercase().as_str() {
        "" | "nan" | "none" | "null" => None,
        _ => Some(v),
    }
}

const DATETIME_FORMATS: [&str; 6] = [
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%d/%m/%y"];

/// Parses day-first or ISO dates, with or without a time part.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Lenient numeric coercion: "1.234,5" and "12,5" are read as Spanish decimals.
/// Anything that is not a finite number ("nan", "inf", text) counts as 0.
pub fn parse_quantity(value: &str) -> f64 {
    let s = value.trim();
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .or_else(|| {
            let spanish = s.replace('.', "").replace(',', ".");
            spanish.parse::<f64>().ok().filter(|v| v.is_finite())
        })
        .unwrap_or(0.0)
}
