// Google Maps links for the supply rounds
use crate::analyzer::operations::BoardRow;
use crate::config::{RouteConfig, TravelMode};
use crate::model::ApartmentRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::warn;

const DIRECTIONS_URL: &str = "https://www.google.com/maps/dir/?api=1";
const SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stop {
    pub apartment: String,
    pub coord: String,
    pub place_url: String,
}

/// One link of a zone's round; long rounds are split in legs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub day: NaiveDate,
    pub zone: Option<String>,
    pub leg: usize,
    pub stops: Vec<Stop>,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RoutePlan {
    pub routes: Vec<Route>,
    /// Apartments to visit that have no coordinates in the master.
    pub without_coords: Vec<String>,
}

pub fn coord_str((lat, lng): (f64, f64)) -> String {
    format!("{:.8},{:.8}", lat, lng)
}

pub fn place_url(coord: &str) -> String {
    format!("{}&query={}", SEARCH_URL, urlencoding::encode(coord))
}

/// Directions from `origin` through `coords`. Duplicate stops are dropped;
/// the last stop is the destination unless the round returns to base.
pub fn directions_url(
    origin: &str,
    coords: &[String],
    mode: TravelMode,
    return_to_base: bool,
    optimize: bool,
) -> Option<String> {
    let mut seen = BTreeSet::new();
    let clean: Vec<&str> = coords
        .iter()
        .map(String::as_str)
        .filter(|c| c.contains(',') && seen.insert(*c))
        .collect();
    let (&last, rest) = clean.split_last()?;

    let (destination, waypoints) = if return_to_base {
        (origin, clean.as_slice())
    } else {
        (last, rest)
    };

    let mut url = format!(
        "{}&origin={}&destination={}",
        DIRECTIONS_URL,
        urlencoding::encode(origin),
        urlencoding::encode(destination)
    );
    if !waypoints.is_empty() {
        let mut wp = waypoints.join("|");
        if optimize {
            wp = format!("optimize:true|{}", wp);
        }
        url.push_str(&format!("&waypoints={}", urlencoding::encode(&wp)));
    }
    url.push_str(&format!("&travelmode={}", mode.as_str()));
    Some(url)
}

/// Rounds per day and zone over the rows that get restocked: preparable
/// status and a non-empty restock list.
pub fn build_routes(rows: &[BoardRow], apartments: &[ApartmentRecord], cfg: &RouteConfig) -> RoutePlan {
    let coords: HashMap<&str, (f64, f64)> = apartments
        .iter()
        .filter_map(|a| a.coords.map(|c| (a.id.as_str(), c)))
        .collect();

    let mut groups: BTreeMap<(NaiveDate, Option<String>), Vec<Stop>> = BTreeMap::new();
    let mut without_coords = BTreeSet::new();
    for row in rows
        .iter()
        .filter(|r| r.status.is_preparable() && !r.restock.trim().is_empty())
    {
        let Some(&point) = coords.get(row.apartment.as_str()) else {
            without_coords.insert(row.apartment.clone());
            continue;
        };
        let stops = groups.entry((row.day, row.zone.clone())).or_default();
        if stops.iter().any(|s| s.apartment == row.apartment) {
            continue;
        }
        let coord = coord_str(point);
        stops.push(Stop {
            apartment: row.apartment.clone(),
            place_url: place_url(&coord),
            coord,
        });
    }
    if !without_coords.is_empty() {
        warn!("{} apartments to restock have no coordinates", without_coords.len());
    }

    let origin = coord_str(cfg.origin);
    let mut routes = Vec::new();
    for ((day, zone), stops) in groups {
        for (i, chunk) in stops.chunks(cfg.max_stops.max(1)).enumerate() {
            let coords: Vec<String> = chunk.iter().map(|s| s.coord.clone()).collect();
            let Some(url) = directions_url(&origin, &coords, cfg.travel_mode, cfg.return_to_base, true) else {
                continue;
            };
            routes.push(Route {
                day,
                zone: zone.clone(),
                leg: i + 1,
                stops: chunk.to_vec(),
                url,
            });
        }
    }

    RoutePlan {
        routes,
        without_coords: without_coords.into_iter().collect(),
    }
}
