// Parsers for the daily reports and the master tables.

pub mod avantio;
pub mod cleaning;
pub mod masters;
pub mod odoo;
pub mod table;

pub use avantio::{AvantioParser, Parser};
pub use cleaning::parse_cleaning_reports;
pub use odoo::parse_stock;
