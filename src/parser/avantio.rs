// Avantio "Entradas" export: CSV or the HTML disguised as .xls
use crate::model::{Booking, ParseError};
use crate::parser::table::{is_html, is_workbook, read_csv, Table};
use crate::source::RawReport;
use crate::utils::{clean_cell, parse_datetime, squash_spaces};
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

const REPORT: &str = "Avantio";
const HEADER_MARKER: &str = "ID Reserva";
pub const REQUIRED_COLUMNS: [&str; 3] = ["Alojamiento", "Fecha entrada hora", "Fecha salida hora"];

pub trait Parser {
    fn parse(&self, raw: &RawReport) -> Result<Vec<Booking>, ParseError>;
}

pub struct AvantioParser;

impl AvantioParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for AvantioParser {
    fn parse(&self, raw: &RawReport) -> Result<Vec<Booking>, ParseError> {
        let table = if raw.name.to_lowercase().ends_with(".csv") {
            read_csv(REPORT, &raw.bytes)?
        } else if is_html(&raw.bytes) {
            parse_html_tables(&String::from_utf8_lossy(&raw.bytes))?
        } else if is_workbook(&raw.bytes) {
            return Err(ParseError::UnsupportedFormat {
                report: REPORT,
                detail: "native Excel workbook, export it as CSV".into(),
            });
        } else {
            read_csv(REPORT, &raw.bytes)?
        };

        if table.is_empty() {
            return Err(ParseError::Empty { report: REPORT });
        }
        bookings_from_table(&table)
    }
}

fn cell_text(cell: ElementRef<'_>) -> String {
    squash_spaces(&cell.text().collect::<String>())
}

/// Avantio writes one table per day: a title row ("Lunes, 2 Febrero 2026"),
/// the real header row (starting with "ID Reserva") and then the bookings.
pub fn parse_html_tables(html: &str) -> Result<Table, ParseError> {
    let document = Html::parse_document(html);
    let selector = |s: &str| {
        Selector::parse(s).map_err(|e| ParseError::Html {
            report: REPORT,
            detail: e.to_string(),
        })
    };
    let table_selector = selector("table")?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("td, th")?;

    let mut merged = Table::default();
    for table in document.select(&table_selector) {
        let rows: Vec<Vec<String>> = table
            .select(&row_selector)
            .map(|tr| tr.select(&cell_selector).map(cell_text).collect::<Vec<_>>())
            .filter(|cells| cells.iter().any(|c| !c.is_empty()))
            .collect();

        let Some(header_idx) = rows
            .iter()
            .take(15)
            .position(|cells| cells.iter().any(|c| c == HEADER_MARKER))
        else {
            continue;
        };

        let header = &rows[header_idx];
        let apartment_idx = header.iter().position(|h| h == "Alojamiento");
        for cells in &rows[header_idx + 1..] {
            // Repeated header rows and separators without an apartment.
            if cells.iter().any(|c| c == HEADER_MARKER) {
                continue;
            }
            if let Some(idx) = apartment_idx {
                if cells.get(idx).and_then(|c| clean_cell(c)).is_none() {
                    continue;
                }
            }
            let width = cells.len().min(header.len());
            merged.push_named(&header[..width], cells[..width].to_vec());
        }
    }

    info!("Avantio HTML: {} booking rows", merged.rows.len());
    Ok(merged)
}

pub fn bookings_from_table(table: &Table) -> Result<Vec<Booking>, ParseError> {
    let idx = table.require(REPORT, &REQUIRED_COLUMNS)?;
    let (apt_idx, in_idx, out_idx) = (idx[0], idx[1], idx[2]);
    let guest_idx = table.position("Cliente");

    let mut bookings = Vec::new();
    for row in &table.rows {
        let Some(apartment) = clean_cell(table.cell(row, apt_idx)) else {
            continue;
        };
        let check_in = parse_datetime(table.cell(row, in_idx));
        let check_out = parse_datetime(table.cell(row, out_idx));
        if check_in.is_none() || check_out.is_none() {
            warn!("Booking for {} has unreadable dates", apartment);
        }
        bookings.push(Booking {
            apartment,
            guest: guest_idx.and_then(|i| clean_cell(table.cell(row, i))),
            check_in,
            check_out,
        });
    }
    Ok(bookings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HTML: &str = r#"<html xmlns:x="urn:schemas-microsoft-com:office:excel">
<body>
<table>
  <tr><td>Lunes, 2 Febrero 2026</td></tr>
  <tr><td>ID Reserva</td><td>Localizador</td><td>Alojamiento</td><td>Cliente</td><td>Fecha entrada hora</td><td>Fecha salida hora</td></tr>
  <tr><td>101</td><td>LOC1</td><td>Apolo 029</td><td>Ana   García</td><td>02/02/2026 16:00</td><td>05/02/2026 11:00</td></tr>
  <tr><td>ID Reserva</td><td>Localizador</td><td>Alojamiento</td><td>Cliente</td><td>Fecha entrada hora</td><td>Fecha salida hora</td></tr>
  <tr><td></td><td></td><td></td><td></td><td></td><td></td></tr>
</table>
<table>
  <tr><td>Martes, 3 Febrero 2026</td></tr>
  <tr><td>ID Reserva</td><td>Localizador</td><td>Alojamiento</td><td>Cliente</td><td>Fecha entrada hora</td><td>Fecha salida hora</td></tr>
  <tr><td>102</td><td>LOC2</td><td>Serranos</td><td>John Doe</td><td>03/02/2026 15:00</td><td>04/02/2026 10:00</td></tr>
</table>
<table><tr><td>Resumen</td></tr></table>
</body></html>"#;

    fn raw(name: &str, bytes: &[u8]) -> RawReport {
        RawReport { name: name.into(), bytes: bytes.to_vec() }
    }

    #[test]
    fn html_export_is_flattened() {
        let bookings = AvantioParser::new().parse(&raw("entradas.xls", HTML.as_bytes())).unwrap();
        assert_eq!(bookings.len(), 2);
        assert_eq!(bookings[0].apartment, "Apolo 029");
        assert_eq!(bookings[0].guest.as_deref(), Some("Ana García"));
        assert_eq!(
            bookings[0].check_in.unwrap().date(),
            NaiveDate::from_ymd_opt(2026, 2, 2).unwrap()
        );
        assert_eq!(bookings[1].apartment, "Serranos");
    }

    #[test]
    fn csv_export() {
        let csv = "Alojamiento,Fecha entrada hora,Fecha salida hora\nApolo 180,01/02/2026 16:00,not a date\n";
        let bookings = AvantioParser::new().parse(&raw("entradas.csv", csv.as_bytes())).unwrap();
        assert_eq!(bookings.len(), 1);
        assert!(bookings[0].check_in.is_some());
        assert!(bookings[0].check_out.is_none());
    }

    #[test]
    fn missing_columns_are_reported() {
        let csv = "Alojamiento,Cliente\nApolo 180,Ana\n";
        let err = AvantioParser::new().parse(&raw("entradas.csv", csv.as_bytes())).unwrap_err();
        assert!(matches!(err, ParseError::MissingColumns { .. }));
    }

    #[test]
    fn workbooks_and_empty_files_are_rejected() {
        let parser = AvantioParser::new();
        assert!(matches!(
            parser.parse(&raw("entradas.xlsx", b"PK\x03\x04....")),
            Err(ParseError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            parser.parse(&raw("entradas.csv", b"Alojamiento,Fecha entrada hora,Fecha salida hora\n")),
            Err(ParseError::Empty { .. })
        ));
    }
}
