// Analyzer module: stock matching, replenishment levels, the operations board and routes.

pub mod matching;
pub mod operations;
pub mod routes;
pub mod shortfall;

use crate::config::ReplenishmentMode;
use crate::model::{ApartmentRecord, ReplenishmentLine, StockRecord, Threshold};
use matching::StockMatch;
use operations::RestockLists;
use shortfall::{CategoryTotal, ThresholdTable};
use std::collections::BTreeMap;

/// Interface for turning warehouse stock into restock work.
pub trait Analyzer {
    fn match_stock<'a>(&self, apartments: &[ApartmentRecord], stock: &'a [StockRecord]) -> StockMatch<'a>;
    fn replenishment_lines(&self, apartments: &[ApartmentRecord], matched: &StockMatch<'_>) -> Vec<ReplenishmentLine>;
    fn summarize(&self, lines: &[ReplenishmentLine]) -> Vec<CategoryTotal>;
    /// "Name xN" lists per apartment, split by urgency in urgent mode.
    fn restock_lists(&self, lines: &[ReplenishmentLine]) -> RestockLists;
}

pub struct RestockAnalyzer {
    thresholds: ThresholdTable,
    mode: ReplenishmentMode,
}

impl RestockAnalyzer {
    pub fn new(thresholds: &[Threshold], mode: ReplenishmentMode) -> Self {
        Self {
            thresholds: ThresholdTable::new(thresholds),
            mode,
        }
    }
}

impl Analyzer for RestockAnalyzer {
    fn match_stock<'a>(&self, apartments: &[ApartmentRecord], stock: &'a [StockRecord]) -> StockMatch<'a> {
        matching::match_stock(apartments, stock)
    }

    fn replenishment_lines(&self, apartments: &[ApartmentRecord], matched: &StockMatch<'_>) -> Vec<ReplenishmentLine> {
        shortfall::replenishment_lines(apartments, matched, &self.thresholds)
    }

    fn summarize(&self, lines: &[ReplenishmentLine]) -> Vec<CategoryTotal> {
        shortfall::summarize(lines, self.mode)
    }

    fn restock_lists(&self, lines: &[ReplenishmentLine]) -> RestockLists {
        let mut by_apartment: BTreeMap<&str, Vec<&ReplenishmentLine>> = BTreeMap::new();
        for line in lines {
            by_apartment.entry(line.apartment.as_str()).or_default().push(line);
        }

        by_apartment
            .into_iter()
            .map(|(apartment, lines)| {
                let plan = shortfall::plan(&lines, self.mode);
                (
                    apartment.to_string(),
                    (shortfall::format_items(&plan.restock), shortfall::format_items(&plan.complete_with)),
                )
            })
            .collect()
    }
}
