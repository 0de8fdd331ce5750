use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Order range for orders restricted to the station they were placed at.
pub const RANGE_STATION: i32 = -1;
/// Order range for orders spanning the solar system.
pub const RANGE_SOLAR_SYSTEM: i32 = 0;
/// Order range for orders spanning the whole region.
pub const RANGE_REGION: i32 = 32767;

/// A single live buy or sell order. The cache copies these verbatim and never looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub order_id:         i64,
    pub type_id:          i64,
    pub region_id:        i64,
    pub system_id:        i64,
    pub station_id:       i64,
    pub price:            f64,
    /// `true` for buy orders.
    pub bid:              bool,
    pub volume_remaining: i64,
    pub volume_entered:   i64,
    pub min_volume:       i64,
    /// Range in jumps, see [`RANGE_STATION`], [`RANGE_SOLAR_SYSTEM`] and [`RANGE_REGION`].
    pub range:            i32,
    /// Order duration in days.
    pub duration:         i32,
    pub issued:           DateTime<Utc>,
}

/// An order record as the market API reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiOrder {
    pub order_id:      i64,
    pub type_id:       i64,
    pub location_id:   i64,
    pub system_id:     i64,
    pub price:         f64,
    pub is_buy_order:  bool,
    pub volume_remain: i64,
    pub volume_total:  i64,
    pub min_volume:    i64,
    /// `station`, `solarsystem`, `region` or a number of jumps.
    pub range:         String,
    pub duration:      i32,
    pub issued:        DateTime<Utc>,
}

/// How a lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupState {
    /// Served from the backing store within the freshness window.
    Fresh,
    /// Served from the backing store past the freshness window; a background refresh was submitted.
    Stale,
    /// Nothing was stored, the orders come straight from the hydrator.
    Hydrated,
}

#[derive(Debug, Clone)]
pub struct Lookup {
    pub orders: Vec<MarketOrder>,
    pub state:  LookupState,
}

/// Map a textual order range into jumps. Unparseable ranges are treated as station-only.
pub fn range_to_jumps(range: &str) -> i32 {
    match range {
        "station" => RANGE_STATION,
        "solarsystem" => RANGE_SOLAR_SYSTEM,
        "region" => RANGE_REGION,
        jumps => jumps.parse().unwrap_or(RANGE_STATION),
    }
}
