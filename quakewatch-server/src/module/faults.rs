///! Pass-through client for the active-faults feature service
///!
///! Issues a fixed feature query against the PHIVOLCS ArcGIS service and
///! relays the GeoJSON response verbatim.

use anyhow::{Context, Result};
use reqwest::Client;

const FAULTS_SERVICE_URL: &str =
    "https://gisweb.phivolcs.dost.gov.ph/arcgis/rest/services/ActiveFaults/MapServer/0/query";

/// Fetch the full active-faults layer and return the body verbatim.
pub async fn query_active_faults(client: &Client) -> Result<String> {
    let params = [
        ("where", "1=1"),
        ("outFields", "*"),
        ("returnGeometry", "true"),
        ("f", "geojson"),
    ];

    let response = client
        .get(FAULTS_SERVICE_URL)
        .query(&params)
        .send()
        .await
        .context("Failed to reach active-faults feature service")?
        .error_for_status()
        .context("Active-faults feature service returned an error status")?;

    response
        .text()
        .await
        .context("Failed to read active-faults response body")
}
