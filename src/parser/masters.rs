// Master tables kept next to the config: apartments, zones, coffee, thresholds
use crate::model::{AmenityCategory, ApartmentRecord, CapsuleKind, ParseError, Threshold};
use crate::normalizer::category_from_label;
use crate::parser::table::{read_csv, Table};
use crate::source::RawReport;
use crate::utils::{clean_cell, norm_apartment, norm_col, parse_quantity};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// One row of the apartment → warehouse master.
#[derive(Debug, Clone, PartialEq)]
pub struct ApartmentWarehouse {
    pub apartment: String,
    pub warehouse: String,
    pub coords: Option<(f64, f64)>,
}

fn required(table: &Table, report: &'static str, names: &[&[&str]]) -> Result<Vec<usize>, ParseError> {
    let mut out = Vec::new();
    let mut missing = Vec::new();
    for aliases in names {
        match table.find_folded(aliases) {
            Some(idx) => out.push(idx),
            None => missing.push(aliases[0].to_string()),
        }
    }
    if missing.is_empty() {
        Ok(out)
    } else {
        Err(ParseError::MissingColumns {
            report,
            missing,
            found: table.headers.clone(),
        })
    }
}

pub fn parse_apartment_warehouses(raw: &RawReport) -> Result<Vec<ApartmentWarehouse>, ParseError> {
    const REPORT: &str = "apartments master";
    let table = read_csv(REPORT, &raw.bytes)?;
    let idx = required(&table, REPORT, &[&["APARTAMENTO"], &["ALMACEN"]])?;
    let lat = table.find_folded(&["LAT", "latitud"]);
    let lng = table.find_folded(&["LNG", "lon", "longitud"]);

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in &table.rows {
        let (Some(apartment), Some(warehouse)) = (
            clean_cell(table.cell(row, idx[0])),
            clean_cell(table.cell(row, idx[1])),
        ) else {
            continue;
        };
        if !seen.insert((apartment.clone(), warehouse.clone())) {
            continue;
        }
        let coords = match (lat, lng) {
            (Some(la), Some(ln)) => {
                let read = |idx| {
                    table.cell(row, idx).trim().replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
                };
                read(la).zip(read(ln))
            }
            _ => None,
        };
        out.push(ApartmentWarehouse { apartment, warehouse, coords });
    }
    Ok(out)
}

/// Apartment (normalized) → zone.
pub fn parse_zones(raw: &RawReport) -> Result<HashMap<String, String>, ParseError> {
    const REPORT: &str = "zones master";
    let table = read_csv(REPORT, &raw.bytes)?;
    let idx = required(&table, REPORT, &[&["APARTAMENTO"], &["ZONA"]])?;

    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            let apartment = clean_cell(table.cell(row, idx[0]))?;
            let zone = clean_cell(table.cell(row, idx[1]))?;
            Some((norm_apartment(&apartment), zone))
        })
        .collect())
}

pub fn capsule_kind_from_label(label: &str) -> Option<CapsuleKind> {
    let key = norm_col(label);
    CapsuleKind::ALL
        .into_iter()
        .find(|kind| key.contains(&norm_col(kind.label())))
}

/// Apartment (normalized) → coffee machine type. Unknown machine names are
/// kept as `None` so the apartment tracks no capsules.
pub fn parse_coffee(raw: &RawReport) -> Result<HashMap<String, Option<CapsuleKind>>, ParseError> {
    const REPORT: &str = "coffee master";
    let table = read_csv(REPORT, &raw.bytes)?;
    let idx = required(
        &table,
        REPORT,
        &[&["APARTAMENTO"], &["CAFE_TIPO", "cafe", "tipo cafe"]],
    )?;

    let mut out = HashMap::new();
    for row in &table.rows {
        let Some(apartment) = clean_cell(table.cell(row, idx[0])) else {
            continue;
        };
        let kind = clean_cell(table.cell(row, idx[1])).and_then(|label| {
            let kind = capsule_kind_from_label(&label);
            if kind.is_none() {
                warn!("Unknown coffee machine '{}' for {}", label, apartment);
            }
            kind
        });
        out.insert(norm_apartment(&apartment), kind);
    }
    Ok(out)
}

pub fn parse_thresholds(raw: &RawReport) -> Result<Vec<Threshold>, ParseError> {
    const REPORT: &str = "thresholds master";
    let table = read_csv(REPORT, &raw.bytes)?;
    let idx = required(&table, REPORT, &[&["Amenity"]])?;
    let min_col = table.find_folded(&["Minimo", "Min", "Stock minimo", "Stock min"]);
    let max_col = table.find_folded(&["Maximo", "Max", "Stock maximo", "Stock max"]);
    if min_col.is_none() && max_col.is_none() {
        return Err(ParseError::MissingColumns {
            report: REPORT,
            missing: vec!["Minimo".into(), "Maximo".into()],
            found: table.headers.clone(),
        });
    }
    let warehouse = table.find_folded(&["ALMACEN", "Ubicacion"]);

    let mut out = Vec::new();
    for row in &table.rows {
        let Some(label) = clean_cell(table.cell(row, idx[0])) else {
            continue;
        };
        let Some(category) = category_from_label(&label) else {
            warn!("Thresholds: unknown amenity '{}', row skipped", label);
            continue;
        };
        let min = min_col.map(|i| parse_quantity(table.cell(row, i))).unwrap_or(0.0);
        let max = max_col.map(|i| parse_quantity(table.cell(row, i))).unwrap_or(min);
        if min < 0.0 || min > max {
            return Err(ParseError::Invalid {
                report: REPORT,
                detail: format!("{}: minimum {} must be between 0 and maximum {}", label, min, max),
            });
        }
        out.push(Threshold {
            category,
            min,
            max,
            warehouse: warehouse.and_then(|i| clean_cell(table.cell(row, i))),
        });
    }
    Ok(out)
}

/// Built-in per-apartment levels used when no thresholds file is configured.
pub fn default_thresholds() -> Vec<Threshold> {
    use crate::model::AmenityCategory::*;
    let levels: [(AmenityCategory, f64, f64); 16] = [
        (Sugar, 10.0, 30.0),
        (Tea, 10.0, 30.0),
        (Insecticide, 1.0, 3.0),
        (ShowerGel, 2.0, 6.0),
        (Shampoo, 2.0, 6.0),
        (Broom, 0.0, 1.0),
        (Mop, 0.0, 1.0),
        (Detergent, 2.0, 6.0),
        (HandSoap, 2.0, 6.0),
        (Vinegar, 1.0, 3.0),
        (RinseAid, 1.0, 3.0),
        (DishwasherSalt, 1.0, 3.0),
        (Capsules(CapsuleKind::Nespresso), 20.0, 60.0),
        (Capsules(CapsuleKind::Tassimo), 20.0, 60.0),
        (Capsules(CapsuleKind::DolceGusto), 20.0, 60.0),
        (Capsules(CapsuleKind::Senseo), 20.0, 60.0),
    ];
    levels
        .into_iter()
        .map(|(category, min, max)| Threshold { category, min, max, warehouse: None })
        .collect()
}

/// Joins the master tables into the apartment list, keyed by apartment name.
pub fn assemble_apartments(
    warehouses: Vec<ApartmentWarehouse>,
    zones: &HashMap<String, String>,
    coffee: &HashMap<String, Option<CapsuleKind>>,
) -> Vec<ApartmentRecord> {
    warehouses
        .into_iter()
        .map(|row| {
            let key = norm_apartment(&row.apartment);
            ApartmentRecord {
                zone: zones.get(&key).cloned(),
                coffee: coffee.get(&key).copied().flatten(),
                coords: row.coords,
                id: row.apartment,
                warehouse: row.warehouse,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str) -> RawReport {
        RawReport { name: "master.csv".into(), bytes: text.as_bytes().to_vec() }
    }

    #[test]
    fn apartment_master_with_coordinates() {
        let rows = parse_apartment_warehouses(&raw(
            "Apartamento,Almacén,LAT,LNG\nApolo 29,ALM-APOLO29,\"39,47\",-0.37\nApolo 29,ALM-APOLO29,,\n,ALM-X,,\nSerranos,ALM-SERRANOS,,\n",
        ))
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].coords, Some((39.47, -0.37)));
        assert_eq!(rows[1].apartment, "Serranos");
        assert_eq!(rows[1].coords, None);
    }

    #[test]
    fn apartment_master_needs_warehouse_column() {
        let err = parse_apartment_warehouses(&raw("APARTAMENTO,ZONA\nA,B\n")).unwrap_err();
        assert!(matches!(err, ParseError::MissingColumns { .. }));
    }

    #[test]
    fn coffee_types() {
        let map = parse_coffee(&raw("APARTAMENTO,CAFE_TIPO\nApolo 029,Nespresso\nSerranos,Dolce Gusto\nRuzafa 1,Italiana\n")).unwrap();
        assert_eq!(map["APOLO 29"], Some(CapsuleKind::Nespresso));
        assert_eq!(map["SERRANOS"], Some(CapsuleKind::DolceGusto));
        assert_eq!(map["RUZAFA 1"], None);
    }

    #[test]
    fn thresholds_with_overrides() {
        let rows = parse_thresholds(&raw(
            "Amenity,Mínimo,Máximo,ALMACEN\nCápsulas Nespresso,5,10,\nChampú,2,6,W1\nToallas,1,2,\n",
        ))
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category, AmenityCategory::Capsules(CapsuleKind::Nespresso));
        assert_eq!((rows[0].min, rows[0].max), (5.0, 10.0));
        assert_eq!(rows[0].warehouse, None);
        assert_eq!(rows[1].warehouse.as_deref(), Some("W1"));
    }

    #[test]
    fn nan_levels_read_as_zero() {
        let rows = parse_thresholds(&raw("Amenity,Min,Max\nAzúcar,nan,30\nVinagre,nan,nan\n")).unwrap();
        assert_eq!((rows[0].min, rows[0].max), (0.0, 30.0));
        assert_eq!((rows[1].min, rows[1].max), (0.0, 0.0));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let err = parse_thresholds(&raw("Amenity,Min,Max\nAzúcar,30,10\n")).unwrap_err();
        assert!(matches!(err, ParseError::Invalid { .. }));
    }

    #[test]
    fn defaults_cover_every_category() {
        let defaults = default_thresholds();
        for category in AmenityCategory::GENERIC {
            assert!(defaults.iter().any(|t| t.category == category));
        }
        assert!(defaults.iter().all(|t| t.min <= t.max));
    }

    #[test]
    fn assembly_joins_zone_and_coffee() {
        let zones = HashMap::from([("APOLO 29".to_string(), "Centro".to_string())]);
        let coffee = HashMap::from([("APOLO 29".to_string(), Some(CapsuleKind::Tassimo))]);
        let apartments = assemble_apartments(
            vec![ApartmentWarehouse {
                apartment: "Apolo 029".into(),
                warehouse: "W1".into(),
                coords: None,
            }],
            &zones,
            &coffee,
        );
        assert_eq!(apartments[0].zone.as_deref(), Some("Centro"));
        assert_eq!(apartments[0].coffee, Some(CapsuleKind::Tassimo));
    }
}
