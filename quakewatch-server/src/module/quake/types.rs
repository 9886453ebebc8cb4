///! Earthquake bulletin data types

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bulletin timestamp formats, tried in order. The page normally prints
/// "30 August 2026 - 08:15 PM" but older entries omit the AM/PM marker.
const DATETIME_FORMATS: [&str; 2] = ["%d %B %Y - %I:%M %p", "%d %B %Y - %H:%M"];

/// One earthquake entry from the bulletin table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quake {
    /// Identity key derived from the raw datetime, coordinate, and
    /// magnitude cells (see [`quake_id`])
    pub id: String,
    /// Date/Time string exactly as printed, e.g. "30 August 2026 - 08:15 PM"
    pub datetime: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Depth in kilometers
    pub depth: f64,
    /// Magnitude
    pub magnitude: f64,
    /// Location description, e.g. "012 km N 45° E of Calatagan (Batangas)"
    pub location: String,
    /// Absolute URL of the per-event bulletin page, if the row carried one
    pub detail_url: Option<String>,
}

impl Quake {
    /// Parse the bulletin timestamp. Returns `None` when the text does not
    /// match any known bulletin format; callers filtering by time range
    /// drop such records rather than erroring.
    pub fn parsed_datetime(&self) -> Option<NaiveDateTime> {
        parse_bulletin_datetime(&self.datetime)
    }
}

/// Parse a bulletin date/time string into a naive (source-local) datetime.
pub fn parse_bulletin_datetime(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

/// Derive the identity key for a bulletin row.
///
/// The bulletin exposes no real event id, so identity is the concatenation
/// of the raw datetime, latitude, longitude, and magnitude cells with all
/// whitespace removed. Two genuinely distinct events sharing those four
/// fields would collide; the source has not been observed to produce that.
pub fn quake_id(datetime: &str, latitude: &str, longitude: &str, magnitude: &str) -> String {
    [datetime, latitude, longitude, magnitude]
        .concat()
        .split_whitespace()
        .collect()
}

/// A full snapshot of the bulletin table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuakeSnapshot {
    /// When this snapshot was fetched
    pub fetched_at: DateTime<Utc>,
    /// Parsed table rows (newest first, as on the page)
    pub quakes: Vec<Quake>,
}

impl QuakeSnapshot {
    pub fn new(quakes: Vec<Quake>) -> Self {
        Self {
            fetched_at: Utc::now(),
            quakes,
        }
    }

    /// Id of the most recent entry (first row), if any
    pub fn latest_id(&self) -> Option<&str> {
        self.quakes.first().map(|q| q.id.as_str())
    }
}
