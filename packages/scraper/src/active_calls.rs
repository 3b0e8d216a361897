//! Active calls HTML table scraper.
//!
//! Fetches the county's active calls page and reads the calls table row by
//! row. Columns, in order: call ID, block, received time, call type,
//! status, district. Header rows carry no `<td>` cells and are skipped.

use std::time::Duration;

use async_trait::async_trait;
use hpd_alerts_incident_models::{Incident, Snapshot};
use scraper::{ElementRef, Html, Selector};

use crate::{ScrapeError, SnapshotSource};

/// Public page listing active calls.
pub const DEFAULT_URL: &str = "https://activecalls.henrico.us/";

/// CSS selector for the calls table on [`DEFAULT_URL`].
pub const DEFAULT_TABLE_SELECTOR: &str = "table#dgCalls";

const USER_AGENT: &str = "HPD-Alerts/1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Scraper for the active calls table.
#[derive(Debug, Clone)]
pub struct ActiveCallsScraper {
    client: reqwest::Client,
    url: String,
}

impl ActiveCallsScraper {
    /// Creates a scraper for the given page URL.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the HTTP client cannot be built.
    pub fn new(url: &str) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.to_owned(),
        })
    }
}

#[async_trait]
impl SnapshotSource for ActiveCallsScraper {
    async fn fetch(&self) -> Result<Snapshot, ScrapeError> {
        log::debug!("Scrape request to {}", self.url);

        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        let body = response.text().await?;

        let snapshot = parse_active_calls(&body, DEFAULT_TABLE_SELECTOR)?;
        log::debug!("Scraped {} active calls", snapshot.len());
        Ok(snapshot)
    }

    fn name(&self) -> &str {
        "active_calls"
    }
}

/// Parses the active calls table out of an HTML page.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if the selector is invalid or no table
/// matches it.
pub fn parse_active_calls(html: &str, table_selector: &str) -> Result<Snapshot, ScrapeError> {
    let document = Html::parse_document(html);

    let table_sel = parse_selector(table_selector)?;
    let row_sel = parse_selector("tr")?;
    let cell_sel = parse_selector("td")?;

    let table = document.select(&table_sel).next().ok_or_else(|| {
        ScrapeError::Parse(format!(
            "no element matching '{table_selector}' found in response"
        ))
    })?;

    let mut snapshot = Snapshot::new();

    for row in table.select(&row_sel) {
        let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
        let column = |i: usize| cells.get(i).cloned().unwrap_or_default();

        let id = column(0);
        if id.is_empty() {
            continue;
        }

        let incident = Incident::new(
            id.clone(),
            column(1),
            column(2),
            column(3),
            column(4),
            column(5),
        );
        snapshot.insert(id, incident);
    }

    Ok(snapshot)
}

fn cell_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector)
        .map_err(|e| ScrapeError::Parse(format!("invalid CSS selector '{selector}': {e}")))
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <table id="dgCalls">
          <tr><th>Call #</th><th>Block</th><th>Received</th><th>Type</th><th>Status</th><th>District</th></tr>
          <tr>
            <td>24-101</td><td>100 Block Main St</td><td>10/19 08:01</td>
            <td>LARCENY</td><td>DISPATCHED</td><td>D1</td>
          </tr>
          <tr>
            <td> 24-102 </td><td>Broad St /  Staples Mill Rd</td><td>10/19 08:05</td>
            <td>ACCIDENT</td><td>ENROUTE</td><td>D3</td>
          </tr>
          <tr><td></td><td>spacer</td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn parses_rows_and_skips_header() {
        let snapshot = parse_active_calls(PAGE, DEFAULT_TABLE_SELECTOR).unwrap();

        assert_eq!(snapshot.len(), 2);
        let first = &snapshot["24-101"];
        assert_eq!(first.block, "100 Block Main St");
        assert_eq!(first.received, "10/19 08:01");
        assert_eq!(first.call_type, "LARCENY");
        assert_eq!(first.status, "DISPATCHED");
        assert_eq!(first.district, "D1");
        assert!(first.location.is_none());
    }

    #[test]
    fn trims_and_collapses_cell_text() {
        let snapshot = parse_active_calls(PAGE, DEFAULT_TABLE_SELECTOR).unwrap();

        assert_eq!(snapshot["24-102"].block, "Broad St / Staples Mill Rd");
    }

    #[test]
    fn empty_table_is_empty_snapshot() {
        let html = r#"<table id="dgCalls"><tr><th>Call #</th></tr></table>"#;
        assert!(parse_active_calls(html, DEFAULT_TABLE_SELECTOR).unwrap().is_empty());
    }

    #[test]
    fn missing_table_is_an_error() {
        let html = "<html><body><p>Service unavailable</p></body></html>";
        assert!(matches!(
            parse_active_calls(html, DEFAULT_TABLE_SELECTOR),
            Err(ScrapeError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn fetches_snapshot_over_http() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let scraper = ActiveCallsScraper::new(&server.uri()).unwrap();
        let snapshot = scraper.fetch().await.unwrap();

        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let scraper = ActiveCallsScraper::new(&server.uri()).unwrap();

        assert!(matches!(scraper.fetch().await, Err(ScrapeError::Http(_))));
    }
}
