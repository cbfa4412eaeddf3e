// Day-by-day status of every apartment over the operating period
use crate::model::{Anomaly, AnomalyKind, ApartmentRecord, Booking, DayStatus, Period};
use crate::utils::norm_apartment;
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardRow {
    pub day: NaiveDate,
    pub zone: Option<String>,
    pub apartment: String,
    pub status: DayStatus,
    pub guest: Option<String>,
    pub next_check_in: Option<NaiveDateTime>,
    pub restock: String,
    pub complete_with: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Kpis {
    pub check_ins: usize,
    pub check_outs: usize,
    pub turnovers: usize,
    pub occupied: usize,
    pub empty: usize,
    pub presential_check_ins: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Board {
    pub rows: Vec<BoardRow>,
    pub kpis: Kpis,
}

/// Restock and complete-with lists per apartment id.
pub type RestockLists = HashMap<String, (String, String)>;

/// Status of one apartment on one day, with the guest that matters that day.
pub fn day_status<'a>(bookings: &[&'a Booking], day: NaiveDate) -> (DayStatus, Option<&'a Booking>) {
    let mut arriving = None;
    let mut leaving = None;
    let mut staying = None;

    for &booking in bookings {
        let (Some(check_in), Some(check_out)) = (booking.check_in, booking.check_out) else {
            continue;
        };
        let (from, to) = (check_in.date(), check_out.date());
        if from == day {
            arriving = Some(booking);
        } else if to == day {
            leaving = Some(booking);
        } else if from < day && day < to {
            staying = Some(booking);
        }
    }

    match (arriving, leaving, staying) {
        (Some(a), Some(_), _) => (DayStatus::Turnover, Some(a)),
        (Some(a), None, _) => (DayStatus::CheckIn, Some(a)),
        (None, Some(l), _) => (DayStatus::CheckOut, Some(l)),
        (None, None, Some(s)) => (DayStatus::Occupied, Some(s)),
        (None, None, None) => (DayStatus::Empty, None),
    }
}

/// First check-in strictly after `day`.
pub fn next_check_in(bookings: &[&Booking], day: NaiveDate) -> Option<NaiveDateTime> {
    bookings
        .iter()
        .filter_map(|b| b.check_in)
        .filter(|dt| dt.date() > day)
        .min()
}

/// Bookings grouped by normalized apartment name, plus an anomaly for every
/// booked apartment missing from the masters.
pub fn group_bookings<'a>(
    apartments: &[ApartmentRecord],
    bookings: &'a [Booking],
) -> (HashMap<String, Vec<&'a Booking>>, Vec<Anomaly>) {
    let known: HashSet<String> = apartments.iter().map(|a| norm_apartment(&a.id)).collect();
    let mut grouped: HashMap<String, Vec<&Booking>> = HashMap::new();
    let mut unknown = BTreeMap::new();

    for booking in bookings {
        let key = norm_apartment(&booking.apartment);
        if !known.contains(&key) {
            unknown.entry(key.clone()).or_insert_with(|| booking.apartment.clone());
        }
        grouped.entry(key).or_default().push(booking);
    }

    let anomalies = unknown
        .into_values()
        .map(|apartment| Anomaly {
            kind: AnomalyKind::UnknownApartment,
            warehouse: None,
            apartment: Some(apartment),
            product: None,
            quantity: None,
        })
        .collect();
    (grouped, anomalies)
}

pub fn build_board(
    apartments: &[ApartmentRecord],
    bookings: &HashMap<String, Vec<&Booking>>,
    lists: &RestockLists,
    period: Period,
    presential: &[String],
) -> Board {
    let presential: HashSet<String> = presential.iter().map(|a| norm_apartment(a)).collect();
    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for apartment in apartments {
        if !seen.insert(apartment.id.clone()) {
            continue;
        }
        let key = norm_apartment(&apartment.id);
        let own: &[&Booking] = bookings.get(&key).map(Vec::as_slice).unwrap_or(&[]);
        let (restock, complete_with) = lists.get(&apartment.id).cloned().unwrap_or_default();

        for day in period.dates() {
            let (status, booking) = day_status(own, day);
            rows.push(BoardRow {
                day,
                zone: apartment.zone.clone(),
                apartment: apartment.id.clone(),
                status,
                guest: booking.and_then(|b| b.guest.clone()),
                next_check_in: next_check_in(own, day),
                restock: restock.clone(),
                complete_with: complete_with.clone(),
            });
        }
    }

    rows.sort_by(|a, b| {
        a.day
            .cmp(&b.day)
            .then_with(|| a.zone.is_none().cmp(&b.zone.is_none()))
            .then_with(|| a.zone.cmp(&b.zone))
            .then_with(|| a.restock.is_empty().cmp(&b.restock.is_empty()))
            .then_with(|| a.status.priority().cmp(&b.status.priority()))
            .then_with(|| a.apartment.cmp(&b.apartment))
    });

    let mut kpis = Kpis::default();
    for row in rows.iter().filter(|r| r.day == period.start) {
        match row.status {
            DayStatus::Turnover => {
                kpis.turnovers += 1;
                kpis.check_ins += 1;
                kpis.check_outs += 1;
            }
            DayStatus::CheckIn => kpis.check_ins += 1,
            DayStatus::CheckOut => kpis.check_outs += 1,
            DayStatus::Occupied => kpis.occupied += 1,
            DayStatus::Empty => kpis.empty += 1,
        }
        if row.status.is_check_in() && presential.contains(&norm_apartment(&row.apartment)) {
            kpis.presential_check_ins += 1;
        }
    }

    Board { rows, kpis }
}

static ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(.*?)\s*x\s*([0-9]+)\s*$").expect("valid regex"));

/// "Detergente x3, Insecticida x1" → [("Detergente", 3), ("Insecticida", 1)].
/// Items without a count are taken as one unit.
pub fn parse_restock_list(text: &str) -> Vec<(String, u32)> {
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match ITEM.captures(part) {
            Some(caps) => {
                let name = caps[1].trim().to_string();
                let qty = caps[2].parse().ok()?;
                (!name.is_empty()).then_some((name, qty))
            }
            None => Some((part.to_string(), 1)),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyItem {
    pub day: NaiveDate,
    pub zone: Option<String>,
    pub apartment: String,
    pub product: String,
    pub quantity: u32,
    pub from_complete_with: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Supply {
    pub items: Vec<SupplyItem>,
    pub totals: Vec<(String, u32)>,
}

/// What to load in the cart: items for apartments that can be prepared,
/// and where each one goes.
pub fn build_supply(rows: &[BoardRow], zones: &[String], include_complete_with: bool) -> Supply {
    let mut items = Vec::new();
    for row in rows.iter().filter(|r| r.status.is_preparable()) {
        if !zones.is_empty() && !row.zone.as_ref().is_some_and(|z| zones.contains(z)) {
            continue;
        }
        let mut sources = vec![(&row.restock, false)];
        if include_complete_with {
            sources.push((&row.complete_with, true));
        }
        for (text, from_complete_with) in sources {
            for (product, quantity) in parse_restock_list(text) {
                items.push(SupplyItem {
                    day: row.day,
                    zone: row.zone.clone(),
                    apartment: row.apartment.clone(),
                    product,
                    quantity,
                    from_complete_with,
                });
            }
        }
    }

    let mut by_product: BTreeMap<String, u32> = BTreeMap::new();
    for item in &items {
        *by_product.entry(item.product.clone()).or_default() += item.quantity;
    }
    let mut totals: Vec<(String, u32)> = by_product.into_iter().collect();
    totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    items.sort_by(|a, b| {
        (&a.zone, &a.apartment, &a.product, a.from_complete_with)
            .cmp(&(&b.zone, &b.apartment, &b.product, b.from_complete_with))
    });
    Supply { items, totals }
}
