use crate::analyzer::matching::StockMatch;
use crate::config::ReplenishmentMode;
use crate::model::{AmenityCategory, ApartmentRecord, ReplenishmentLine, Threshold};
use crate::utils::norm_warehouse;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Min/max lookup: a warehouse-specific row beats the global one.
#[derive(Debug, Clone, Default)]
pub struct ThresholdTable {
    global: HashMap<AmenityCategory, (f64, f64)>,
    by_warehouse: HashMap<(String, AmenityCategory), (f64, f64)>,
}

impl ThresholdTable {
    pub fn new(thresholds: &[Threshold]) -> Self {
        let mut table = Self::default();
        for t in thresholds {
            match &t.warehouse {
                Some(w) => {
                    table.by_warehouse.insert((norm_warehouse(w), t.category), (t.min, t.max));
                }
                None => {
                    table.global.insert(t.category, (t.min, t.max));
                }
            }
        }
        table
    }

    /// Categories without any configured level are tracked at 0/0.
    pub fn levels(&self, warehouse: &str, category: AmenityCategory) -> (f64, f64) {
        self.by_warehouse
            .get(&(norm_warehouse(warehouse), category))
            .or_else(|| self.global.get(&category))
            .copied()
            .unwrap_or((0.0, 0.0))
    }
}

/// Generic categories plus the capsules for the apartment's own machine.
pub fn tracked_categories(apartment: &ApartmentRecord) -> Vec<AmenityCategory> {
    let mut categories = AmenityCategory::GENERIC.to_vec();
    if let Some(kind) = apartment.coffee {
        categories.push(AmenityCategory::Capsules(kind));
    }
    categories
}

pub fn compute_line(
    apartment: &ApartmentRecord,
    category: AmenityCategory,
    current: f64,
    min: f64,
    max: f64,
) -> ReplenishmentLine {
    let shortfall = (min - current).max(0.0);
    let quantity_needed = (max - current).max(0.0);
    ReplenishmentLine {
        apartment: apartment.id.clone(),
        warehouse: apartment.warehouse.clone(),
        category,
        current,
        min,
        max,
        shortfall,
        quantity_needed,
        needs_restock: current < min && current < max,
    }
}

/// One line per (apartment, tracked category). Apartments without stock get
/// every category at zero.
pub fn replenishment_lines(
    apartments: &[ApartmentRecord],
    matched: &StockMatch<'_>,
    thresholds: &ThresholdTable,
) -> Vec<ReplenishmentLine> {
    let mut lines = Vec::new();
    for (i, apartment) in apartments.iter().enumerate() {
        if matched.excluded.contains(&i) {
            continue;
        }
        let mut on_hand: HashMap<AmenityCategory, f64> = HashMap::new();
        for (record, category) in matched.by_apartment.get(&i).into_iter().flatten() {
            *on_hand.entry(*category).or_default() += record.quantity;
        }
        for category in tracked_categories(apartment) {
            let current = on_hand.get(&category).copied().unwrap_or(0.0);
            let (min, max) = thresholds.levels(&apartment.warehouse, category);
            lines.push(compute_line(apartment, category, current, min, max));
        }
    }
    lines
}

/// Lines that go on an apartment's restock list, and the top-ups to take
/// along in urgent mode.
#[derive(Debug, Default)]
pub struct RestockPlan<'a> {
    pub restock: Vec<&'a ReplenishmentLine>,
    pub complete_with: Vec<&'a ReplenishmentLine>,
}

pub fn plan<'a>(lines: &[&'a ReplenishmentLine], mode: ReplenishmentMode) -> RestockPlan<'a> {
    let mut plan = RestockPlan::default();
    for &line in lines.iter().filter(|l| l.quantity_needed > 0.0) {
        match mode {
            ReplenishmentMode::ToMaximum => plan.restock.push(line),
            ReplenishmentMode::UrgentOnly if line.needs_restock => plan.restock.push(line),
            ReplenishmentMode::UrgentOnly => plan.complete_with.push(line),
        }
    }
    plan
}

/// "Detergente x3, Insecticida x1". Fractional needs round up to whole units.
pub fn format_items(lines: &[&ReplenishmentLine]) -> String {
    lines
        .iter()
        .take(80)
        .map(|l| format!("{} x{}", l.category.label(), l.quantity_needed.ceil() as i64))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: AmenityCategory,
    pub apartments: usize,
    pub shortfall: f64,
    pub quantity_needed: f64,
}

/// Aggregate of what the restock lists add up to, largest first.
pub fn summarize(lines: &[ReplenishmentLine], mode: ReplenishmentMode) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<AmenityCategory, CategoryTotal> = BTreeMap::new();
    let refs: Vec<&ReplenishmentLine> = lines.iter().collect();
    for line in plan(&refs, mode).restock {
        let entry = totals.entry(line.category).or_insert(CategoryTotal {
            category: line.category,
            apartments: 0,
            shortfall: 0.0,
            quantity_needed: 0.0,
        });
        entry.apartments += 1;
        entry.shortfall += line.shortfall;
        entry.quantity_needed += line.quantity_needed;
    }
    let mut out: Vec<CategoryTotal> = totals.into_values().collect();
    out.sort_by(|a, b| b.quantity_needed.total_cmp(&a.quantity_needed));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::matching::match_stock;
    use crate::model::{CapsuleKind, StockRecord};

    fn apartment(id: &str, warehouse: &str, coffee: Option<CapsuleKind>) -> ApartmentRecord {
        ApartmentRecord { id: id.into(), warehouse: warehouse.into(), zone: None, coffee, coords: None }
    }

    fn threshold(category: AmenityCategory, min: f64, max: f64) -> Threshold {
        Threshold { category, min, max, warehouse: None }
    }

    const NESPRESSO: AmenityCategory = AmenityCategory::Capsules(CapsuleKind::Nespresso);

    #[test]
    fn coffee_capsule_scenario() {
        let apartments = vec![apartment("A101", "W1", Some(CapsuleKind::Nespresso))];
        let stock = vec![StockRecord { warehouse: "W1".into(), product: "Cápsulas Nespresso".into(), quantity: 2.0 }];
        let thresholds = ThresholdTable::new(&[threshold(NESPRESSO, 5.0, 10.0)]);

        let matched = match_stock(&apartments, &stock);
        let lines = replenishment_lines(&apartments, &matched, &thresholds);
        let line = lines.iter().find(|l| l.category == NESPRESSO).unwrap();

        assert_eq!(line.apartment, "A101");
        assert_eq!(line.current, 2.0);
        assert_eq!(line.quantity_needed, 8.0);
        assert_eq!(line.shortfall, 3.0);
        assert!(line.needs_restock);
    }

    #[test]
    fn quantities_are_summed_per_category() {
        let apartments = vec![apartment("A1", "W1", None)];
        let stock = vec![
            StockRecord { warehouse: "W1".into(), product: "Azúcar blanco".into(), quantity: 4.0 },
            StockRecord { warehouse: "W1".into(), product: "Azúcar moreno".into(), quantity: 3.0 },
        ];
        let thresholds = ThresholdTable::new(&[threshold(AmenityCategory::Sugar, 10.0, 30.0)]);
        let lines = replenishment_lines(&apartments, &match_stock(&apartments, &stock), &thresholds);
        let sugar = lines.iter().find(|l| l.category == AmenityCategory::Sugar).unwrap();
        assert_eq!(sugar.current, 7.0);
        assert_eq!(sugar.quantity_needed, 23.0);
    }

    #[test]
    fn apartment_without_stock_is_fully_deficient() {
        let apartments = vec![apartment("A1", "W1", None)];
        let thresholds = ThresholdTable::new(&[threshold(AmenityCategory::Detergent, 2.0, 6.0)]);
        let lines = replenishment_lines(&apartments, &match_stock(&apartments, &[]), &thresholds);

        assert_eq!(lines.len(), AmenityCategory::GENERIC.len());
        assert!(lines.iter().all(|l| l.current == 0.0));
        let detergent = lines.iter().find(|l| l.category == AmenityCategory::Detergent).unwrap();
        assert_eq!(detergent.quantity_needed, 6.0);
    }

    #[test]
    fn full_stock_is_never_flagged_and_never_negative() {
        let a = apartment("A1", "W1", None);
        for (current, min, max) in [(12.0, 5.0, 10.0), (10.0, 5.0, 10.0), (7.0, 5.0, 10.0), (0.0, 0.0, 0.0), (-3.0, 0.0, 1.0)] {
            let line = compute_line(&a, AmenityCategory::Mop, current, min, max);
            assert!(line.quantity_needed >= 0.0);
            assert!(line.shortfall >= 0.0);
            if current >= max {
                assert!(!line.needs_restock);
            }
        }
        let over = compute_line(&a, AmenityCategory::Mop, 12.0, 5.0, 10.0);
        assert_eq!(over.quantity_needed, 0.0);
    }

    #[test]
    fn warehouse_override_wins() {
        let thresholds = ThresholdTable::new(&[
            threshold(AmenityCategory::Shampoo, 2.0, 6.0),
            Threshold { category: AmenityCategory::Shampoo, min: 4.0, max: 12.0, warehouse: Some("w1".into()) },
        ]);
        assert_eq!(thresholds.levels("W1", AmenityCategory::Shampoo), (4.0, 12.0));
        assert_eq!(thresholds.levels("W2", AmenityCategory::Shampoo), (2.0, 6.0));
        assert_eq!(thresholds.levels("W2", AmenityCategory::Broom), (0.0, 0.0));
    }

    #[test]
    fn urgent_mode_splits_the_plan() {
        let a = apartment("A1", "W1", None);
        let low = compute_line(&a, AmenityCategory::Detergent, 1.0, 2.0, 6.0);
        let topup = compute_line(&a, AmenityCategory::Vinegar, 2.0, 1.0, 3.0);
        let full = compute_line(&a, AmenityCategory::Broom, 1.0, 0.0, 1.0);
        let refs = vec![&low, &topup, &full];

        let all = plan(&refs, ReplenishmentMode::ToMaximum);
        assert_eq!(format_items(&all.restock), "Detergente x5, Vinagre x1");
        assert!(all.complete_with.is_empty());

        let urgent = plan(&refs, ReplenishmentMode::UrgentOnly);
        assert_eq!(format_items(&urgent.restock), "Detergente x5");
        assert_eq!(format_items(&urgent.complete_with), "Vinagre x1");
    }

    #[test]
    fn fractional_needs_round_up() {
        let a = apartment("A1", "W1", None);
        let shampoo = compute_line(&a, AmenityCategory::Shampoo, 5.6, 2.0, 6.0);
        let gel = compute_line(&a, AmenityCategory::ShowerGel, 2.5, 2.0, 6.0);
        assert_eq!(format_items(&[&shampoo, &gel]), "Champú x1, Gel de ducha x4");
    }

    #[test]
    fn summary_orders_by_quantity() {
        let a = apartment("A1", "W1", None);
        let b = apartment("A2", "W2", None);
        let lines = vec![
            compute_line(&a, AmenityCategory::Sugar, 0.0, 10.0, 30.0),
            compute_line(&b, AmenityCategory::Sugar, 25.0, 10.0, 30.0),
            compute_line(&a, AmenityCategory::Detergent, 0.0, 2.0, 6.0),
        ];
        let summary = summarize(&lines, ReplenishmentMode::ToMaximum);
        assert_eq!(summary[0].category, AmenityCategory::Sugar);
        assert_eq!(summary[0].apartments, 2);
        assert_eq!(summary[0].quantity_needed, 35.0);

        let urgent = summarize(&lines, ReplenishmentMode::UrgentOnly);
        assert_eq!(urgent[0].apartments, 1);
        assert_eq!(urgent[0].quantity_needed, 30.0);
    }
}
