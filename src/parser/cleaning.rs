// Cleaning form answers: latest report per apartment
use crate::model::{CleaningReport, ParseError};
use crate::parser::table::{read_csv, Table};
use crate::source::RawReport;
use crate::utils::{norm_apartment, parse_datetime};
use regex::Regex;
use std::collections::HashMap;

const REPORT: &str = "cleaning reports";

/// Exact header (case-insensitive) first, then the fallback pattern.
fn find_col(table: &Table, exact: &str, pattern: &str) -> Option<usize> {
    let exact = exact.trim().to_lowercase();
    if let Some(idx) = table
        .headers
        .iter()
        .position(|h| h.trim().to_lowercase() == exact)
    {
        return Some(idx);
    }
    let re = Regex::new(&format!("(?i){}", pattern)).ok()?;
    table.headers.iter().position(|h| re.is_match(h))
}

/// A field counts when it says something beyond "nothing to report".
fn has_text(value: &str) -> bool {
    let t = value.trim().to_lowercase();
    !t.is_empty() && !matches!(t.as_str(), "n/a" | "na" | "-" | "no es necesario")
}

pub fn parse_cleaning_reports(raw: &RawReport) -> Result<Vec<CleaningReport>, ParseError> {
    let table = read_csv(REPORT, &raw.bytes)?;

    let ts = find_col(&table, "Marca temporal", r"^marca\s*temporal$");
    let apt = find_col(&table, "Apartamento", r"^apartamento$");
    let other_apt = find_col(&table, "Si es otro piso indicar aqui", r"otro\s*piso|indicar\s*aqui");
    let keys = find_col(&table, "LLAVES", r"^llaves$");
    let restock = find_col(&table, "OTRAS REPOSICIONES", r"otras\s*reposiciones");
    let incidents = find_col(&table, "INCIDENCIAS/TAREAS A REALIZAR", r"incidencias|tareas\s*a\s*realizar");

    let (Some(ts), Some(apt), Some(keys), Some(restock), Some(incidents)) =
        (ts, apt, keys, restock, incidents)
    else {
        let missing = [
            ("Marca temporal", ts),
            ("Apartamento", apt),
            ("LLAVES", keys),
            ("OTRAS REPOSICIONES", restock),
            ("INCIDENCIAS/TAREAS A REALIZAR", incidents),
        ]
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

    let mut latest: HashMap<String, CleaningReport> = HashMap::new();
    for row in &table.rows {
        let Some(reported_at) = parse_datetime(table.cell(row, ts)) else {
            continue;
        };
        let mut apartment = table.cell(row, apt).trim().to_string();
        if apartment.eq_ignore_ascii_case("otro") {
            if let Some(idx) = other_apt {
                apartment = table.cell(row, idx).trim().to_string();
            }
        }
        let apartment = norm_apartment(&apartment);

        let keys = table.cell(row, keys).trim().to_string();
        let other_restock = table.cell(row, restock).trim().to_string();
        let incidents = table.cell(row, incidents).trim().to_string();
        let report = CleaningReport {
            flag_keys: has_text(&keys),
            flag_other_restock: has_text(&other_restock),
            flag_incidents: has_text(&incidents),
            apartment: apartment.clone(),
            reported_at,
            keys,
            other_restock,
            incidents,
        };

        // Ties keep the later row, as the form appends in submission order.
        match latest.get(&apartment) {
            Some(prev) if prev.reported_at > report.reported_at => {}
            _ => {
                latest.insert(apartment, report);
            }
        }
    }

    let mut out: Vec<CleaningReport> = latest.into_values().collect();
    out.sort_by(|a, b| a.apartment.cmp(&b.apartment));
    Ok(out)
}
