use crate::model::{AmenityCategory, Anomaly, AnomalyKind, ApartmentRecord, StockRecord};
use crate::normalizer::normalize_all;
use crate::utils::norm_warehouse;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Outcome of joining stock rows to apartments on the warehouse id.
#[derive(Debug, Default)]
pub struct StockMatch<'a> {
    /// Index into the apartment slice → classified stock rows stored there.
    pub by_apartment: HashMap<usize, Vec<(&'a StockRecord, AmenityCategory)>>,
    /// Apartments excluded because their warehouse is shared.
    pub excluded: HashSet<usize>,
    pub anomalies: Vec<Anomaly>,
}

/// Warehouse id (normalized) → indexes of the apartments that use it.
pub fn index_by_warehouse(apartments: &[ApartmentRecord]) -> HashMap<String, Vec<usize>> {
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, apartment) in apartments.iter().enumerate() {
        index.entry(norm_warehouse(&apartment.warehouse)).or_default().push(i);
    }
    index
}

/// Inner join of stock on warehouse. Every stock row ends up either in
/// `by_apartment` or in `anomalies`.
pub fn match_stock<'a>(apartments: &[ApartmentRecord], stock: &'a [StockRecord]) -> StockMatch<'a> {
    let index = index_by_warehouse(apartments);
    let mut result = StockMatch::default();

    for owners in index.values().filter(|owners| owners.len() > 1) {
        for &i in owners {
            result.excluded.insert(i);
            result.anomalies.push(Anomaly {
                kind: AnomalyKind::AmbiguousWarehouse,
                warehouse: Some(apartments[i].warehouse.clone()),
                apartment: Some(apartments[i].id.clone()),
                product: None,
                quantity: None,
            });
        }
    }

    for (record, category) in normalize_all(stock) {
        let owners = index.get(&norm_warehouse(&record.warehouse));
        let apartment_idx = match owners.map(Vec::as_slice) {
            Some([only]) => *only,
            Some([]) | None => {
                result.anomalies.push(Anomaly::from_stock(AnomalyKind::UnmatchedWarehouse, record));
                continue;
            }
            Some(_) => {
                result.anomalies.push(Anomaly::from_stock(AnomalyKind::AmbiguousWarehouse, record));
                continue;
            }
        };
        let apartment = &apartments[apartment_idx];

        let Some(category) = category else {
            let mut anomaly = Anomaly::from_stock(AnomalyKind::UnrecognizedProduct, record);
            anomaly.apartment = Some(apartment.id.clone());
            result.anomalies.push(anomaly);
            continue;
        };

        if let AmenityCategory::Capsules(kind) = category {
            if apartment.coffee != Some(kind) {
                let mut anomaly = Anomaly::from_stock(AnomalyKind::UntrackedCapsule, record);
                anomaly.apartment = Some(apartment.id.clone());
                result.anomalies.push(anomaly);
                continue;
            }
        }

        result
            .by_apartment
            .entry(apartment_idx)
            .or_default()
            .push((record, category));
    }

    info!(
        "Matched stock for {} apartments, {} anomalies",
        result.by_apartment.len(),
        result.anomalies.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CapsuleKind;

    fn apartment(id: &str, warehouse: &str, coffee: Option<CapsuleKind>) -> ApartmentRecord {
        ApartmentRecord {
            id: id.into(),
            warehouse: warehouse.into(),
            zone: None,
            coffee,
            coords: None,
        }
    }

    fn stock(warehouse: &str, product: &str, quantity: f64) -> StockRecord {
        StockRecord { warehouse: warehouse.into(), product: product.into(), quantity }
    }

    #[test]
    fn unmatched_warehouse_is_an_anomaly() {
        let apartments = vec![apartment("A101", "W1", None)];
        let rows = vec![stock("W1", "Azúcar", 4.0), stock("W2", "Azúcar", 9.0)];
        let result = match_stock(&apartments, &rows);

        assert_eq!(result.by_apartment[&0].len(), 1);
        assert_eq!(result.anomalies.len(), 1);
        assert_eq!(result.anomalies[0].kind, AnomalyKind::UnmatchedWarehouse);
        assert_eq!(result.anomalies[0].warehouse.as_deref(), Some("W2"));
    }

    #[test]
    fn warehouse_ids_ignore_case_and_spacing() {
        let apartments = vec![apartment("A101", "alm/apolo 29", None)];
        let rows = vec![stock(" ALM/APOLO  29 ", "Champú", 1.0)];
        let result = match_stock(&apartments, &rows);
        assert!(result.anomalies.is_empty());
        assert_eq!(result.by_apartment[&0][0].1, AmenityCategory::Shampoo);
    }

    #[test]
    fn shared_warehouse_excludes_both_apartments() {
        let apartments = vec![apartment("A1", "W1", None), apartment("A2", "W1", None)];
        let rows = vec![stock("W1", "Vinagre", 1.0)];
        let result = match_stock(&apartments, &rows);

        assert!(result.by_apartment.is_empty());
        assert_eq!(result.excluded, HashSet::from([0, 1]));
        let stock_anomalies: Vec<_> = result.anomalies.iter().filter(|a| a.product.is_some()).collect();
        assert_eq!(stock_anomalies.len(), 1);
        assert_eq!(stock_anomalies[0].kind, AnomalyKind::AmbiguousWarehouse);
    }

    #[test]
    fn unrecognized_and_foreign_capsules() {
        let apartments = vec![apartment("A101", "W1", Some(CapsuleKind::Nespresso))];
        let rows = vec![
            stock("W1", "Bombillas", 2.0),
            stock("W1", "Cápsulas Tassimo", 16.0),
            stock("W1", "Cápsulas Nespresso", 2.0),
        ];
        let result = match_stock(&apartments, &rows);

        let kinds: Vec<_> = result.anomalies.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AnomalyKind::UnrecognizedProduct, AnomalyKind::UntrackedCapsule]);
        assert_eq!(
            result.by_apartment[&0],
            vec![(&rows[2], AmenityCategory::Capsules(CapsuleKind::Nespresso))]
        );
    }

    #[test]
    fn every_stock_row_lands_exactly_once() {
        let apartments = vec![
            apartment("A1", "W1", Some(CapsuleKind::Senseo)),
            apartment("A2", "W2", None),
            apartment("A3", "W2", None),
        ];
        let rows = vec![
            stock("W1", "Senseo", 1.0),
            stock("W1", "Nespresso", 1.0),
            stock("W1", "Lejía", 1.0),
            stock("W2", "Azúcar", 1.0),
            stock("W9", "Azúcar", 1.0),
        ];
        let result = match_stock(&apartments, &rows);
        let matched: usize = result.by_apartment.values().map(Vec::len).sum();
        let stock_anomalies = result.anomalies.iter().filter(|a| a.product.is_some()).count();
        assert_eq!(matched + stock_anomalies, rows.len());
    }
}
