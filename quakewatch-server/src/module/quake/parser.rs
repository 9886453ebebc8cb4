///! HTML extraction for the earthquake bulletin page
///!
///! The bulletin renders the latest events as an HTML table, one row per
///! event: date-time (wrapping the detail link), latitude, longitude,
///! depth, magnitude, location. Rows that do not carry at least six cells
///! are layout chrome and are skipped.

use scraper::{Html, Selector};
use url::Url;

use super::types::{quake_id, Quake};

fn selector(css: &str) -> Selector {
    // Selectors are static literals; parse cannot fail at runtime.
    Selector::parse(css).expect("static CSS selector")
}

/// Extract bulletin rows from raw page HTML.
///
/// Returns the events in source presentation order (most recent first).
/// An empty result means the page yielded no parseable rows, which the
/// fetcher treats as an extraction failure.
pub fn parse_bulletin(html: &str, base_url: &Url) -> Vec<Quake> {
    let document = Html::parse_document(html);
    let row_selector = selector("table tr");
    let cell_selector = selector("td");
    let link_selector = selector("a");

    let mut quakes = Vec::new();

    for row in document.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| {
                cell.text()
                    .collect::<String>()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();

        if cells.len() < 6 {
            continue;
        }

        let datetime = cells[0].clone();
        let (latitude, longitude, depth, magnitude) = match (
            cells[1].parse::<f64>(),
            cells[2].parse::<f64>(),
            cells[3].parse::<f64>(),
            cells[4].parse::<f64>(),
        ) {
            (Ok(lat), Ok(lon), Ok(depth), Ok(mag)) => (lat, lon, depth, mag),
            _ => {
                tracing::debug!("Skipping bulletin row with non-numeric cells: {:?}", cells);
                continue;
            }
        };

        let detail_url = row
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve_detail_link(base_url, href));

        quakes.push(Quake {
            id: quake_id(&datetime, &cells[1], &cells[2], &cells[4]),
            datetime,
            latitude,
            longitude,
            depth,
            magnitude,
            location: cells[5].clone(),
            detail_url,
        });
    }

    quakes
}

/// Resolve a per-event detail link against the bulletin base URL.
///
/// The bulletin emits Windows-style relative paths
/// (`..\2026_Earthquake_Information\August\...html`), so backslashes are
/// normalized before resolution.
fn resolve_detail_link(base_url: &Url, href: &str) -> Option<String> {
    let normalized = href.trim().replace('\\', "/");
    if normalized.is_empty() {
        return None;
    }
    base_url.join(&normalized).ok().map(|url| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://earthquake.example.gov.ph/").unwrap()
    }

    const SAMPLE: &str = r#"
        <html><body><table>
          <tr><th>Date - Time</th><th>Lat</th><th>Lon</th><th>Depth</th><th>Mag</th><th>Location</th></tr>
          <tr>
            <td><a href="..\2026_Earthquake_Information\August\2026_0830_1215.html">
              30 August 2026 - 08:15 PM</a></td>
            <td>12.34</td><td>124.56</td><td>010</td><td>3.4</td>
            <td>012 km N 45&#176; E of Calatagan (Batangas)</td>
          </tr>
          <tr>
            <td>29 August 2026 - 11:02 AM</td>
            <td>6.78</td><td>126.01</td><td>33</td><td>4.1</td>
            <td>008 km S 12&#176; W of Manay (Davao Oriental)</td>
          </tr>
          <tr><td colspan="6">page footer</td></tr>
        </table></body></html>
    "#;

    #[test]
    fn test_parse_sample_rows() {
        let quakes = parse_bulletin(SAMPLE, &base());
        assert_eq!(quakes.len(), 2);

        let first = &quakes[0];
        assert_eq!(first.datetime, "30 August 2026 - 08:15 PM");
        assert_eq!(first.latitude, 12.34);
        assert_eq!(first.longitude, 124.56);
        assert_eq!(first.depth, 10.0);
        assert_eq!(first.magnitude, 3.4);
        assert!(first.location.contains("Calatagan"));

        // Source order is preserved
        assert_eq!(quakes[1].datetime, "29 August 2026 - 11:02 AM");
        assert!(quakes[1].detail_url.is_none());
    }

    #[test]
    fn test_backslash_link_resolved() {
        let quakes = parse_bulletin(SAMPLE, &base());
        let link = quakes[0].detail_url.as_deref().unwrap();
        assert_eq!(
            link,
            "https://earthquake.example.gov.ph/2026_Earthquake_Information/August/2026_0830_1215.html"
        );
    }

    #[test]
    fn test_short_rows_skipped() {
        let html = "<table><tr><td>only</td><td>five</td><td>cells</td><td>in</td><td>row</td></tr></table>";
        assert!(parse_bulletin(html, &base()).is_empty());
    }

    #[test]
    fn test_non_numeric_rows_skipped() {
        let html = r#"<table><tr>
            <td>30 August 2026 - 08:15 PM</td>
            <td>abc</td><td>124.56</td><td>10</td><td>3.4</td><td>Somewhere</td>
        </tr></table>"#;
        assert!(parse_bulletin(html, &base()).is_empty());
    }

    #[test]
    fn test_id_from_raw_cells() {
        let quakes = parse_bulletin(SAMPLE, &base());
        assert_eq!(quakes[0].id, "30August2026-08:15PM12.34124.563.4");
    }

    #[test]
    fn test_empty_page() {
        assert!(parse_bulletin("<html><body></body></html>", &base()).is_empty());
    }
}
