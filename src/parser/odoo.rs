// Odoo stock.quant export
use crate::model::{ParseError, StockRecord};
use crate::parser::table::{is_workbook, read_csv};
use crate::source::RawReport;
use crate::utils::{parse_quantity, squash_spaces};
use tracing::info;

const REPORT: &str = "Odoo";

const LOCATION_EXACT: [&str; 4] = ["ubicación", "ubicacion", "location", "ubicacion/stock"];
const LOCATION_PARTIAL: [&str; 2] = ["ubic", "location"];
const PRODUCT_EXACT: [&str; 4] = ["producto", "product", "nombre producto", "product name"];
const PRODUCT_PARTIAL: [&str; 2] = ["product", "producto"];
const QUANTITY_EXACT: [&str; 5] = ["cantidad", "quantity", "qty", "on hand", "disponible"];
const QUANTITY_PARTIAL: [&str; 3] = ["cant", "quant", "qty"];

/// Reads warehouse stock rows, detecting the location, product and quantity
/// columns from the usual Spanish/English header names.
pub fn parse_stock(raw: &RawReport) -> Result<Vec<StockRecord>, ParseError> {
    if is_workbook(&raw.bytes) {
        return Err(ParseError::UnsupportedFormat {
            report: REPORT,
            detail: "native Excel workbook, export it as CSV".into(),
        });
    }
    let table = read_csv(REPORT, &raw.bytes)?;
    if table.is_empty() {
        return Err(ParseError::Empty { report: REPORT });
    }

    let location = table.find_column(&LOCATION_EXACT, &LOCATION_PARTIAL);
    let product = table.find_column(&PRODUCT_EXACT, &PRODUCT_PARTIAL);
    let quantity = table.find_column(&QUANTITY_EXACT, &QUANTITY_PARTIAL);

    let (Some(location), Some(product), Some(quantity)) = (location, product, quantity) else {
        let missing = [("location", location), ("product", product), ("quantity", quantity)]
            .into_iter()
            .filter(|(_, idx)| idx.is_none())
            .map(|(name, _)| name.to_string())
            .collect();
        return Err(ParseError::MissingColumns {
            report: REPORT,
            missing,
            found: table.headers.clone(),
        });
    };

    let records: Vec<StockRecord> = table
        .rows
        .iter()
        .map(|row| StockRecord {
            warehouse: squash_spaces(table.cell(row, location)),
            product: squash_spaces(table.cell(row, product)),
            quantity: parse_quantity(table.cell(row, quantity)),
        })
        .collect();

    info!("Odoo: {} stock rows", records.len());
    Ok(records)
}
