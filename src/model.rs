// Core structs: apartments, stock, amenities, replenishment lines, errors
use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Coffee machine systems we stock capsules for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CapsuleKind {
    Nespresso,
    Tassimo,
    DolceGusto,
    Senseo,
}

impl CapsuleKind {
    pub const ALL: [CapsuleKind; 4] = [
        CapsuleKind::Nespresso,
        CapsuleKind::Tassimo,
        CapsuleKind::DolceGusto,
        CapsuleKind::Senseo,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CapsuleKind::Nespresso => "Nespresso",
            CapsuleKind::Tassimo => "Tassimo",
            CapsuleKind::DolceGusto => "Dolce Gusto",
            CapsuleKind::Senseo => "Senseo",
        }
    }
}

/// Generic amenity groups tracked against min/max thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum AmenityCategory {
    Sugar,
    Tea,
    Insecticide,
    ShowerGel,
    Shampoo,
    Broom,
    Mop,
    Detergent,
    HandSoap,
    Vinegar,
    RinseAid,
    DishwasherSalt,
    Capsules(CapsuleKind),
}

impl AmenityCategory {
    /// Categories every apartment tracks regardless of its coffee machine.
    pub const GENERIC: [AmenityCategory; 12] = [
        AmenityCategory::Sugar,
        AmenityCategory::Tea,
        AmenityCategory::Insecticide,
        AmenityCategory::ShowerGel,
        AmenityCategory::Shampoo,
        AmenityCategory::Broom,
        AmenityCategory::Mop,
        AmenityCategory::Detergent,
        AmenityCategory::HandSoap,
        AmenityCategory::Vinegar,
        AmenityCategory::RinseAid,
        AmenityCategory::DishwasherSalt,
    ];

    pub fn label(self) -> String {
        match self {
            AmenityCategory::Sugar => "Azúcar".into(),
            AmenityCategory::Tea => "Té/Infusión".into(),
            AmenityCategory::Insecticide => "Insecticida".into(),
            AmenityCategory::ShowerGel => "Gel de ducha".into(),
            AmenityCategory::Shampoo => "Champú".into(),
            AmenityCategory::Broom => "Escoba".into(),
            AmenityCategory::Mop => "Mocho/Fregona".into(),
            AmenityCategory::Detergent => "Detergente".into(),
            AmenityCategory::HandSoap => "Jabón de manos".into(),
            AmenityCategory::Vinegar => "Vinagre".into(),
            AmenityCategory::RinseAid => "Abrillantador".into(),
            AmenityCategory::DishwasherSalt => "Sal lavavajillas".into(),
            AmenityCategory::Capsules(kind) => format!("Cápsulas {}", kind.label()),
        }
    }
}

impl fmt::Display for AmenityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApartmentRecord {
    pub id: String,
    pub warehouse: String,
    pub zone: Option<String>,
    pub coffee: Option<CapsuleKind>,
    pub coords: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockRecord {
    pub warehouse: String,
    pub product: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Threshold {
    pub category: AmenityCategory,
    pub min: f64,
    pub max: f64,
    /// Warehouse-specific override; `None` applies to every warehouse.
    pub warehouse: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplenishmentLine {
    pub apartment: String,
    pub warehouse: String,
    pub category: AmenityCategory,
    pub current: f64,
    pub min: f64,
    pub max: f64,
    /// Units missing to reach the minimum.
    pub shortfall: f64,
    /// Units missing to reach the maximum.
    pub quantity_needed: f64,
    pub needs_restock: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnomalyKind {
    UnmatchedWarehouse,
    AmbiguousWarehouse,
    UnrecognizedProduct,
    UntrackedCapsule,
    UnknownApartment,
}

impl AnomalyKind {
    pub fn label(self) -> &'static str {
        match self {
            AnomalyKind::UnmatchedWarehouse => "warehouse without apartment",
            AnomalyKind::AmbiguousWarehouse => "warehouse shared by several apartments",
            AnomalyKind::UnrecognizedProduct => "unrecognized product",
            AnomalyKind::UntrackedCapsule => "capsules not used by the apartment's machine",
            AnomalyKind::UnknownApartment => "booking for unknown apartment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub warehouse: Option<String>,
    pub apartment: Option<String>,
    pub product: Option<String>,
    pub quantity: Option<f64>,
}

impl Anomaly {
    pub fn from_stock(kind: AnomalyKind, record: &StockRecord) -> Self {
        Self {
            kind,
            warehouse: Some(record.warehouse.clone()),
            apartment: None,
            product: Some(record.product.clone()),
            quantity: Some(record.quantity),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    pub apartment: String,
    pub guest: Option<String>,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DayStatus {
    Turnover,
    CheckIn,
    CheckOut,
    Empty,
    Occupied,
}

impl DayStatus {
    pub fn label(self) -> &'static str {
        match self {
            DayStatus::Turnover => "ENTRADA+SALIDA",
            DayStatus::CheckIn => "ENTRADA",
            DayStatus::CheckOut => "SALIDA",
            DayStatus::Occupied => "OCUPADO",
            DayStatus::Empty => "VACIO",
        }
    }

    /// Sort priority on the board: arrivals first.
    pub fn priority(self) -> u8 {
        match self {
            DayStatus::Turnover => 0,
            DayStatus::CheckIn => 1,
            DayStatus::CheckOut => 2,
            DayStatus::Empty => 3,
            DayStatus::Occupied => 4,
        }
    }

    /// Statuses where the apartment can be prepared (restock dropped off).
    pub fn is_preparable(self) -> bool {
        matches!(self, DayStatus::Turnover | DayStatus::CheckIn | DayStatus::Empty)
    }

    pub fn is_check_in(self) -> bool {
        matches!(self, DayStatus::Turnover | DayStatus::CheckIn)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningReport {
    pub apartment: String,
    pub reported_at: NaiveDateTime,
    pub keys: String,
    pub other_restock: String,
    pub incidents: String,
    pub flag_keys: bool,
    pub flag_other_restock: bool,
    pub flag_incidents: bool,
}

/// Day range the operations board covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub days: u32,
}

impl Period {
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.days).filter_map(|offset| self.start.checked_add_days(Days::new(offset as u64)))
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP error: {0}")]
    HttpError(String),
    #[error("unexpected HTTP status {status} for {url}")]
    InvalidResponse { url: String, status: u16 },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{report}: file is empty or has no rows")]
    Empty { report: &'static str },
    #[error("{report}: missing required columns {missing:?} (found {found:?})")]
    MissingColumns {
        report: &'static str,
        missing: Vec<String>,
        found: Vec<String>,
    },
    #[error("{report}: unsupported format ({detail})")]
    UnsupportedFormat { report: &'static str, detail: String },
    #[error("{report}: CSV error: {source}")]
    Csv {
        report: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error("{report}: invalid HTML: {detail}")]
    Html { report: &'static str, detail: String },
    #[error("{report}: {detail}")]
    Invalid { report: &'static str, detail: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("cannot write export {path}: {source}")]
    Export {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
