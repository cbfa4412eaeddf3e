// Terminal panels for a finished session
use crate::config::ReplenishmentMode;
use crate::session::SessionReport;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use std::io::{self, Write};

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::DynamicFullWidth);
    table.set_header(header.to_vec());
    table
}

fn qty(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn opt(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn flag(text: &str, raised: bool) -> Cell {
    if raised {
        Cell::new(text).fg(Color::Red)
    } else {
        Cell::new(text)
    }
}

pub fn write_anomalies<W: Write>(report: &SessionReport, mut writer: W) -> io::Result<()> {
    writeln!(writer, "Anomalies ({})", report.anomalies.len())?;
    if report.anomalies.is_empty() {
        return writeln!(writer, "  none");
    }

    let mut anomalies: Vec<_> = report.anomalies.iter().collect();
    anomalies.sort_by(|a, b| {
        (a.kind.label(), &a.warehouse, &a.apartment, &a.product)
            .cmp(&(b.kind.label(), &b.warehouse, &b.apartment, &b.product))
    });

    let mut table = new_table(&["Type", "Warehouse", "Apartment", "Product", "Qty"]);
    for a in anomalies {
        table.add_row(vec![
            Cell::new(a.kind.label()).fg(Color::Yellow),
            Cell::new(opt(a.warehouse.as_deref())),
            Cell::new(opt(a.apartment.as_deref())),
            Cell::new(opt(a.product.as_deref())),
            Cell::new(a.quantity.map(qty).unwrap_or_default()),
        ]);
    }
    writeln!(writer, "{table}")
}

pub fn write_shortfalls<W: Write>(report: &SessionReport, mut writer: W) -> io::Result<()> {
    let urgent = report.mode == ReplenishmentMode::UrgentOnly;
    let mut lines: Vec<_> = report
        .lines
        .iter()
        .filter(|l| l.quantity_needed > 0.0 && (!urgent || l.needs_restock))
        .collect();
    lines.sort_by(|a, b| (&a.apartment, a.category).cmp(&(&b.apartment, b.category)));

    writeln!(writer, "Restock per apartment ({} lines)", lines.len())?;
    if lines.is_empty() {
        return writeln!(writer, "  nothing to restock");
    }

    let mut table = new_table(&["Apartment", "Warehouse", "Amenity", "Current", "Min", "Max", "Needed"]);
    for l in lines {
        table.add_row(vec![
            Cell::new(&l.apartment),
            Cell::new(&l.warehouse),
            Cell::new(l.category.label()),
            flag(&qty(l.current), l.needs_restock),
            Cell::new(qty(l.min)),
            Cell::new(qty(l.max)),
            Cell::new(qty(l.quantity_needed)).fg(Color::Green),
        ]);
    }
    writeln!(writer, "{table}")
}

pub fn write_summary<W: Write>(report: &SessionReport, mut writer: W) -> io::Result<()> {
    writeln!(writer, "Replenishment summary")?;
    let mut table = new_table(&["Amenity", "Apartments", "Below min", "Needed"]);
    for total in &report.summary {
        table.add_row(vec![
            Cell::new(total.category.label()),
            Cell::new(total.apartments),
            Cell::new(qty(total.shortfall)),
            Cell::new(qty(total.quantity_needed)),
        ]);
    }
    writeln!(writer, "{table}")
}

pub fn write_board<W: Write>(report: &SessionReport, mut writer: W) -> io::Result<()> {
    let k = &report.board.kpis;
    writeln!(
        writer,
        "Operations from {} ({} days): check-ins {} | check-outs {} | turnovers {} | occupied {} | empty {} | in person {}",
        report.period.start,
        report.period.days,
        k.check_ins,
        k.check_outs,
        k.turnovers,
        k.occupied,
        k.empty,
        k.presential_check_ins
    )?;

    let urgent = report.mode == ReplenishmentMode::UrgentOnly;
    let mut header = vec!["Day", "Zone", "Apartment", "Status", "Guest", "Next check-in", "Restock"];
    if urgent {
        header.push("Complete with");
    }
    let mut table = new_table(&header);
    for row in &report.board.rows {
        let status = if row.status.is_check_in() {
            Cell::new(row.status.label()).fg(Color::Green)
        } else {
            Cell::new(row.status.label())
        };
        let mut cells = vec![
            Cell::new(row.day.format("%d/%m")),
            Cell::new(opt(row.zone.as_deref())),
            Cell::new(&row.apartment),
            status,
            Cell::new(opt(row.guest.as_deref())),
            Cell::new(
                row.next_check_in
                    .map(|dt| dt.format("%d/%m %H:%M").to_string())
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(&row.restock),
        ];
        if urgent {
            cells.push(Cell::new(&row.complete_with));
        }
        table.add_row(cells);
    }
    writeln!(writer, "{table}")
}

pub fn write_supply<W: Write>(report: &SessionReport, mut writer: W) -> io::Result<()> {
    writeln!(writer, "Supply cart ({} drops)", report.supply.items.len())?;
    if report.supply.totals.is_empty() {
        return writeln!(writer, "  empty");
    }
    let mut table = new_table(&["Product", "Total"]);
    for (product, total) in &report.supply.totals {
        table.add_row(vec![Cell::new(product), Cell::new(total)]);
    }
    writeln!(writer, "{table}")
}

pub fn write_routes<W: Write>(report: &SessionReport, mut writer: W) -> io::Result<()> {
    let plan = &report.routes;
    writeln!(writer, "Routes ({})", plan.routes.len())?;
    if plan.routes.is_empty() {
        writeln!(writer, "  no stops with coordinates")?;
    } else {
        let mut table = new_table(&["Day", "Zone", "Leg", "Stops", "Link"]);
        for route in &plan.routes {
            let stops: Vec<&str> = route.stops.iter().map(|s| s.apartment.as_str()).collect();
            table.add_row(vec![
                Cell::new(route.day.format("%d/%m")),
                Cell::new(route.zone.as_deref().unwrap_or("Sin zona")),
                Cell::new(route.leg),
                Cell::new(stops.join(", ")),
                Cell::new(&route.url),
            ]);
        }
        writeln!(writer, "{table}")?;
    }
    if !plan.without_coords.is_empty() {
        writeln!(writer, "  without coordinates: {}", plan.without_coords.join(", "))?;
    }
    Ok(())
}

pub fn write_cleaning<W: Write>(report: &SessionReport, mut writer: W) -> io::Result<()> {
    writeln!(writer, "Last cleaning reports")?;
    let mut table = new_table(&["Apartment", "Reported", "Keys", "Other restock", "Incidents"]);
    for r in &report.cleaning {
        table.add_row(vec![
            Cell::new(&r.apartment),
            Cell::new(r.reported_at.format("%d/%m/%Y %H:%M")),
            flag(&r.keys, r.flag_keys),
            flag(&r.other_restock, r.flag_other_restock),
            flag(&r.incidents, r.flag_incidents),
        ]);
    }
    writeln!(writer, "{table}")
}

/// Writes every panel. The cleaning panel only appears when there are reports.
pub fn render<W: Write>(report: &SessionReport, mut writer: W) -> io::Result<()> {
    write_anomalies(report, &mut writer)?;
    writeln!(writer)?;
    write_shortfalls(report, &mut writer)?;
    writeln!(writer)?;
    write_summary(report, &mut writer)?;
    writeln!(writer)?;
    write_board(report, &mut writer)?;
    writeln!(writer)?;
    write_supply(report, &mut writer)?;
    writeln!(writer)?;
    write_routes(report, &mut writer)?;
    if !report.cleaning.is_empty() {
        writeln!(writer)?;
        write_cleaning(report, &mut writer)?;
    }
    Ok(())
}
