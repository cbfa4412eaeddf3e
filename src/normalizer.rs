use crate::model::{AmenityCategory, CapsuleKind, StockRecord};
use crate::utils::{fold_accents, squash_spaces};

use AmenityCategory::*;

/// Ordered (keyword, category) pairs. Keywords are matched against the folded
/// product name padded with spaces, so a keyword with surrounding spaces only
/// matches a whole word. First match wins: capsules and the more specific
/// dishwasher/soap products come before the generic words.
pub static RULES: &[(&str, AmenityCategory)] = &[
    ("nespresso", Capsules(CapsuleKind::Nespresso)),
    ("tassimo", Capsules(CapsuleKind::Tassimo)),
    ("dolce gusto", Capsules(CapsuleKind::DolceGusto)),
    ("dolcegusto", Capsules(CapsuleKind::DolceGusto)),
    ("senseo", Capsules(CapsuleKind::Senseo)),
    ("sal lavavaj", DishwasherSalt),
    ("sal para lavavaj", DishwasherSalt),
    ("sal de lavavaj", DishwasherSalt),
    ("sal regeneradora", DishwasherSalt),
    ("abrillantador", RinseAid),
    ("lavavajillas", Detergent),
    ("pastillas lavav", Detergent),
    ("jabon de manos", HandSoap),
    ("jabon manos", HandSoap),
    ("jabon liquido", HandSoap),
    ("hand soap", HandSoap),
    ("gel de ducha", ShowerGel),
    ("gel ducha", ShowerGel),
    ("gel de bano", ShowerGel),
    ("shower gel", ShowerGel),
    ("champu", Shampoo),
    ("shampoo", Shampoo),
    ("detergente", Detergent),
    ("insecticida", Insecticide),
    ("antimosquitos", Insecticide),
    ("cucarachas", Insecticide),
    ("vinagre", Vinegar),
    ("escoba", Broom),
    ("mocho", Mop),
    ("fregona", Mop),
    ("azucar", Sugar),
    ("sacarina", Sugar),
    ("sugar", Sugar),
    (" te ", Tea),
    ("infusion", Tea),
    ("manzanilla", Tea),
    ("poleo", Tea),
    (" tila ", Tea),
];

/// Folded, lower-cased, space-padded form the rules are matched against.
fn match_key(name: &str) -> String {
    let folded = fold_accents(&squash_spaces(name).to_lowercase());
    let spaced: String = folded
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    format!(" {} ", squash_spaces(&spaced))
}

/// Maps a raw product name to its amenity, or `None` when no rule applies.
pub fn normalize_product(name: &str) -> Option<AmenityCategory> {
    let key = match_key(name);
    RULES
        .iter()
        .find(|(keyword, _)| key.contains(keyword))
        .map(|(_, category)| *category)
}

/// Normalizes every stock row, keeping the pairing with its category.
pub fn normalize_all(records: &[StockRecord]) -> Vec<(&StockRecord, Option<AmenityCategory>)> {
    records
        .iter()
        .map(|record| (record, normalize_product(&record.product)))
        .collect()
}

/// Resolves a threshold-table amenity name ("Cápsulas Nespresso", "Champú").
/// Labels are tried first so that every category's own label round-trips.
pub fn category_from_label(label: &str) -> Option<AmenityCategory> {
    let key = match_key(label);
    let capsule_kinds = CapsuleKind::ALL.into_iter().map(Capsules);
    AmenityCategory::GENERIC
        .into_iter()
        .chain(capsule_kinds)
        .find(|category| match_key(&category.label()) == key)
        .or_else(|| normalize_product(label))
}
