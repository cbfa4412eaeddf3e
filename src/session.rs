// One reconciliation run: fetch, parse, match, compute, export
use crate::analyzer::operations::{self, Board, Supply};
use crate::analyzer::routes::{self, RoutePlan};
use crate::analyzer::shortfall::CategoryTotal;
use crate::analyzer::{Analyzer, RestockAnalyzer};
use crate::config::{AppConfig, MastersConfig, ReplenishmentMode, SourceConfig};
use crate::model::{
    Anomaly, ApartmentRecord, CleaningReport, Period, ReplenishmentLine, SessionError,
    Threshold,
};
use crate::parser::masters::{self, ApartmentWarehouse};
use crate::parser::{parse_cleaning_reports, parse_stock, AvantioParser, Parser};
use crate::source::{self, FileSource, RawReport, ReportSource};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub generated_at: NaiveDateTime,
    pub mode: ReplenishmentMode,
    pub period: Period,
    pub apartments: Vec<ApartmentRecord>,
    pub anomalies: Vec<Anomaly>,
    pub lines: Vec<ReplenishmentLine>,
    pub summary: Vec<CategoryTotal>,
    pub board: Board,
    pub supply: Supply,
    pub routes: RoutePlan,
    pub cleaning: Vec<CleaningReport>,
}

/// Apartment records and thresholds built from the master tables.
pub struct Masters {
    pub apartments: Vec<ApartmentRecord>,
    pub thresholds: Vec<Threshold>,
}

async fn read_master(path: &Path) -> Result<RawReport, SessionError> {
    Ok(FileSource::new(path).fetch().await?)
}

pub async fn load_masters(cfg: &MastersConfig) -> Result<Masters, SessionError> {
    let warehouses: Vec<ApartmentWarehouse> =
        masters::parse_apartment_warehouses(&read_master(&cfg.apartments).await?)?;

    let zones = match &cfg.zones {
        Some(path) => masters::parse_zones(&read_master(path).await?)?,
        None => HashMap::new(),
    };
    let coffee = match &cfg.coffee {
        Some(path) => masters::parse_coffee(&read_master(path).await?)?,
        None => HashMap::new(),
    };
    let thresholds = match &cfg.thresholds {
        Some(path) => masters::parse_thresholds(&read_master(path).await?)?,
        None => {
            info!("No thresholds file configured, using built-in levels");
            masters::default_thresholds()
        }
    };

    let apartments = masters::assemble_apartments(warehouses, &zones, &coffee);
    info!("Loaded {} apartments, {} threshold rows", apartments.len(), thresholds.len());
    Ok(Masters { apartments, thresholds })
}

async fn fetch_cleaning(cfg: &SourceConfig) -> Result<Vec<CleaningReport>, SessionError> {
    let raw = source::from_config(cfg)?.fetch().await?;
    Ok(parse_cleaning_reports(&raw)?)
}

/// Cleaning reports are optional: a failing source only costs the panel.
async fn load_cleaning(config: &AppConfig) -> Vec<CleaningReport> {
    let Some(cfg) = &config.cleaning else {
        return Vec::new();
    };
    match fetch_cleaning(cfg).await {
        Ok(reports) => {
            info!("Loaded {} cleaning reports", reports.len());
            reports
        }
        Err(e) => {
            warn!("Cleaning reports skipped: {}", e);
            Vec::new()
        }
    }
}

/// Runs every step of a session. Any failing required input aborts the run
/// before computation starts.
pub async fn run_session(config: &AppConfig) -> Result<SessionReport, SessionError> {
    let bookings_src = source::from_config(&config.bookings)?;
    let stock_src = source::from_config(&config.stock)?;

    info!("Fetching bookings and stock...");
    let (bookings_raw, stock_raw, masters) = futures::try_join!(
        async { Ok::<_, SessionError>(bookings_src.fetch().await?) },
        async { Ok::<_, SessionError>(stock_src.fetch().await?) },
        load_masters(&config.masters),
    )?;

    let bookings = AvantioParser::new().parse(&bookings_raw)?;
    let stock = parse_stock(&stock_raw)?;
    info!("Parsed {} bookings and {} stock rows", bookings.len(), stock.len());

    let analyzer = RestockAnalyzer::new(&masters.thresholds, config.mode);
    let apartments = masters.apartments;

    let matched = analyzer.match_stock(&apartments, &stock);
    let lines = analyzer.replenishment_lines(&apartments, &matched);
    let summary = analyzer.summarize(&lines);
    let lists = analyzer.restock_lists(&lines);

    let (grouped, booking_anomalies) = operations::group_bookings(&apartments, &bookings);
    let mut anomalies = matched.anomalies;
    anomalies.extend(booking_anomalies);
    if !anomalies.is_empty() {
        warn!("⚠️ {} anomalies found", anomalies.len());
    }

    let period = Period {
        start: config.period_start.unwrap_or_else(|| Local::now().date_naive()),
        days: config.period_days,
    };
    let on_board: Vec<ApartmentRecord> = apartments
        .iter()
        .filter(|a| config.zones.is_empty() || a.zone.as_ref().is_some_and(|z| config.zones.contains(z)))
        .cloned()
        .collect();
    let board = operations::build_board(&on_board, &grouped, &lists, period, &config.presential_apartments);
    let supply = operations::build_supply(
        &board.rows,
        &config.zones,
        config.mode == ReplenishmentMode::UrgentOnly,
    );
    let routes = routes::build_routes(&board.rows, &apartments, &config.routes);

    let cleaning = load_cleaning(config).await;

    let report = SessionReport {
        generated_at: Local::now().naive_local(),
        mode: config.mode,
        period,
        apartments,
        anomalies,
        lines,
        summary,
        board,
        supply,
        routes,
        cleaning,
    };

    if let Some(path) = &config.export_path {
        export(&report, path).await?;
    }
    Ok(report)
}

pub async fn export(report: &SessionReport, path: &Path) -> Result<(), SessionError> {
    let to_error = |source: std::io::Error| SessionError::Export {
        path: path.display().to_string(),
        source,
    };
    let json = serde_json::to_vec_pretty(report).map_err(|e| to_error(e.into()))?;
    tokio::fs::write(path, json).await.map_err(to_error)?;
    info!("💾 Session exported to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::model::{AmenityCategory, AnomalyKind, CapsuleKind, DayStatus};
    use std::fs;
    use tempfile::TempDir;

    const BOOKINGS: &str = "\
ID Reserva,Alojamiento,Cliente,Fecha entrada hora,Fecha salida hora
1,Apolo 029,Ana,02/02/2026 16:00,05/02/2026 11:00
2,Serranos,Bob,30/01/2026 16:00,02/02/2026 11:00
3,Ruzafa 9,Eve,02/02/2026 16:00,03/02/2026 11:00
";

    const STOCK: &str = "\
Ubicación,Producto,Cantidad
ALM-APOLO,Cápsulas Nespresso,2
ALM-APOLO,Detergente,6
ALM-SERRANOS,Azúcar,3
ALM-X,Azúcar,9
";

    fn write_fixtures(dir: &TempDir, export: bool) -> String {
        let files = [
            ("bookings.csv", BOOKINGS),
            ("stock.csv", STOCK),
            ("apartments.csv", "APARTAMENTO,ALMACEN,LAT,LNG\nApolo 29,ALM-APOLO,39.47,-0.37\nSerranos,ALM-SERRANOS,,\n"),
            ("zones.csv", "APARTAMENTO,ZONA\nApolo 29,Centro\nSerranos,Centro\n"),
            ("coffee.csv", "APARTAMENTO,CAFE_TIPO\nApolo 29,Nespresso\n"),
            ("thresholds.csv", "Amenity,Minimo,Maximo\nCápsulas Nespresso,5,10\nDetergente,2,6\nAzúcar,10,30\n"),
        ];
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let p = |name: &str| dir.path().join(name).display().to_string();
        let export_path = if export {
            format!(r#","export_path": "{}""#, p("out.json"))
        } else {
            String::new()
        };
        format!(
            r#"{{
                "bookings": {{ "path": "{}" }},
                "stock": {{ "path": "{}" }},
                "masters": {{
                    "apartments": "{}", "zones": "{}",
                    "coffee": "{}", "thresholds": "{}"
                }},
                "period_start": "2026-02-02",
                "presential_apartments": ["Serranos"]
                {}
            }}"#,
            p("bookings.csv"),
            p("stock.csv"),
            p("apartments.csv"),
            p("zones.csv"),
            p("coffee.csv"),
            p("thresholds.csv"),
            export_path
        )
    }

    #[tokio::test]
    async fn full_session_from_files() {
        let dir = TempDir::new().unwrap();
        let config = parse_config(&write_fixtures(&dir, true)).unwrap();
        let report = run_session(&config).await.unwrap();

        let capsules = report
            .lines
            .iter()
            .find(|l| l.category == AmenityCategory::Capsules(CapsuleKind::Nespresso))
            .unwrap();
        assert_eq!((capsules.apartment.as_str(), capsules.current, capsules.quantity_needed), ("Apolo 29", 2.0, 8.0));

        let kinds: Vec<_> = report.anomalies.iter().map(|a| a.kind).collect();
        assert!(kinds.contains(&AnomalyKind::UnmatchedWarehouse));
        assert!(kinds.contains(&AnomalyKind::UnknownApartment));

        assert_eq!(report.board.rows.len(), 4);
        assert_eq!(report.board.kpis.check_ins, 1);
        assert_eq!(report.board.kpis.check_outs, 1);
        let serranos = report.board.rows.iter().find(|r| r.apartment == "Serranos").unwrap();
        assert_eq!(serranos.status, DayStatus::CheckOut);
        assert_eq!(serranos.restock, "Azúcar x27, Detergente x6");

        assert_eq!(report.supply.totals[0], ("Azúcar".to_string(), 57));
        assert!(report.supply.totals.iter().any(|(name, qty)| name == "Cápsulas Nespresso" && *qty == 8));

        assert_eq!(report.routes.routes.len(), 1);
        let route = &report.routes.routes[0];
        assert_eq!(route.stops[0].apartment, "Apolo 29");
        assert!(route.url.contains("destination=39.47000000%2C-0.37000000"));
        assert_eq!(report.routes.without_coords, vec!["Serranos".to_string()]);
        assert!(dir.path().join("out.json").exists());
    }

    #[tokio::test]
    async fn missing_stock_file_aborts() {
        let dir = TempDir::new().unwrap();
        let config = parse_config(&write_fixtures(&dir, false)).unwrap();
        fs::remove_file(dir.path().join("stock.csv")).unwrap();
        let err = run_session(&config).await.unwrap_err();
        assert!(matches!(err, SessionError::Source(_)));
    }
}
