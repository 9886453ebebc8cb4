///! Pass-through client for the USGS FDSN event catalog
///!
///! Forwards a bounding-box / time-range / magnitude-threshold query to the
///! USGS event API and relays the GeoJSON response verbatim. No caching,
///! no parsing, no state.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

const USGS_FDSN_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";

// Default bounding box covering the Philippine archipelago
const DEFAULT_MIN_LATITUDE: f64 = 4.5;
const DEFAULT_MAX_LATITUDE: f64 = 21.5;
const DEFAULT_MIN_LONGITUDE: f64 = 116.0;
const DEFAULT_MAX_LONGITUDE: f64 = 127.0;
const DEFAULT_MIN_MAGNITUDE: f64 = 1.0;

/// Inbound query parameters, FDSN naming. Missing fields fall back to the
/// regional defaults above.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogQuery {
    pub starttime: Option<String>,
    pub endtime: Option<String>,
    pub minmagnitude: f64,
    pub minlatitude: f64,
    pub maxlatitude: f64,
    pub minlongitude: f64,
    pub maxlongitude: f64,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            starttime: None,
            endtime: None,
            minmagnitude: DEFAULT_MIN_MAGNITUDE,
            minlatitude: DEFAULT_MIN_LATITUDE,
            maxlatitude: DEFAULT_MAX_LATITUDE,
            minlongitude: DEFAULT_MIN_LONGITUDE,
            maxlongitude: DEFAULT_MAX_LONGITUDE,
        }
    }
}

/// Relay a catalog query to USGS and return the response body verbatim.
pub async fn query_catalog(client: &Client, query: &CatalogQuery) -> Result<String> {
    let mut params = vec![
        ("format", "geojson".to_string()),
        ("minmagnitude", query.minmagnitude.to_string()),
        ("minlatitude", query.minlatitude.to_string()),
        ("maxlatitude", query.maxlatitude.to_string()),
        ("minlongitude", query.minlongitude.to_string()),
        ("maxlongitude", query.maxlongitude.to_string()),
        ("orderby", "time".to_string()),
    ];
    if let Some(start) = &query.starttime {
        params.push(("starttime", start.clone()));
    }
    if let Some(end) = &query.endtime {
        params.push(("endtime", end.clone()));
    }

    let response = client
        .get(USGS_FDSN_URL)
        .query(&params)
        .send()
        .await
        .context("Failed to reach USGS event catalog")?
        .error_for_status()
        .context("USGS event catalog returned an error status")?;

    response
        .text()
        .await
        .context("Failed to read USGS catalog response body")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounding_box_covers_philippines() {
        let query = CatalogQuery::default();
        assert!(query.minlatitude < 5.0 && query.maxlatitude > 21.0);
        assert!(query.minlongitude < 117.0 && query.maxlongitude > 126.0);
        assert!(query.starttime.is_none());
        assert!(query.endtime.is_none());
    }
}
