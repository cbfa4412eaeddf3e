// Header + rows view shared by the CSV and HTML readers
use crate::model::ParseError;
use crate::utils::norm_col;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact header match after trimming.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// First header whose folded form is in `exact` or contains one of `partial`.
    pub fn find_column(&self, exact: &[&str], partial: &[&str]) -> Option<usize> {
        self.headers.iter().position(|h| {
            let lower = h.trim().to_lowercase();
            exact.contains(&lower.as_str()) || partial.iter().any(|p| lower.contains(p))
        })
    }

    /// Header lookup that ignores accents, case, spaces, `_` and `-`.
    pub fn find_folded(&self, names: &[&str]) -> Option<usize> {
        let wanted: Vec<String> = names.iter().map(|n| norm_col(n)).collect();
        self.headers
            .iter()
            .position(|h| wanted.contains(&norm_col(h)))
    }

    pub fn cell<'a>(&self, row: &'a [String], idx: usize) -> &'a str {
        row.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Appends a row keyed by its own header list, adding unseen columns.
    pub fn push_named(&mut self, headers: &[String], row: Vec<String>) {
        let mut out = vec![String::new(); self.headers.len()];
        for (header, value) in headers.iter().zip(row) {
            let idx = match self.position(header.trim()) {
                Some(idx) => idx,
                None => {
                    self.headers.push(header.trim().to_string());
                    for existing in self.rows.iter_mut() {
                        existing.push(String::new());
                    }
                    out.push(String::new());
                    self.headers.len() - 1
                }
            };
            out[idx] = value;
        }
        self.rows.push(out);
    }

    pub fn require(&self, report: &'static str, names: &[&str]) -> Result<Vec<usize>, ParseError> {
        let found: Vec<Option<usize>> = names.iter().map(|n| self.position(n)).collect();
        let missing: Vec<String> = names
            .iter()
            .zip(&found)
            .filter(|(_, idx)| idx.is_none())
            .map(|(name, _)| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ParseError::MissingColumns {
                report,
                missing,
                found: self.headers.clone(),
            });
        }
        Ok(found.into_iter().flatten().collect())
    }
}

/// Excel workbooks (zip or legacy OLE container) are not read directly.
pub fn is_workbook(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0])
}

pub fn is_html(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(2000)];
    let lower = String::from_utf8_lossy(head).to_lowercase();
    lower.contains("<html") || lower.contains("rec-html40") || lower.contains("<table")
}

fn detect_delimiter(text: &str) -> u8 {
    let first = text.lines().next().unwrap_or("");
    if first.matches(';').count() > first.matches(',').count() {
        b';'
    } else {
        b','
    }
}

/// Reads a CSV export. Accepts `,` or `;` separators, a UTF-8 BOM, and
/// non-UTF-8 bytes (replaced lossily).
pub fn read_csv(report: &'static str, bytes: &[u8]) -> Result<Table, ParseError> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches('\u{feff}');

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(detect_delimiter(text))
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| ParseError::Csv { report, source })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| ParseError::Csv { report, source })?;
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { headers, rows })
}
