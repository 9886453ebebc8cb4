///! Retrying fetch-and-extract for the earthquake bulletin page

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::error::QuakeError;
use super::parser::parse_bulletin;
use super::types::QuakeSnapshot;

const REQUEST_TIMEOUT_SECONDS: u64 = 8;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);
const USER_AGENT: &str = "Mozilla/5.0 quakewatch/0.1";

/// Seam for the snapshot cache and poller; tests substitute a fake.
#[async_trait]
pub trait FetchSnapshot: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<QuakeSnapshot, QuakeError>;
}

/// Fetches the bulletin page and extracts a snapshot, retrying on failure.
pub struct QuakeFetcher {
    client: Client,
    bulletin_url: Url,
    max_attempts: u32,
    retry_delay: Duration,
}

impl QuakeFetcher {
    pub fn new(bulletin_url: Url) -> Result<Self, QuakeError> {
        // The bulletin host serves a broken certificate chain, so TLS
        // verification is disabled for this one client. Deliberate trust
        // decision scoped to the bulletin fetch; the pass-through clients
        // verify normally.
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .danger_accept_invalid_certs(true)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            bulletin_url,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    pub fn with_retry_policy(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Single fetch attempt: GET the page, extract rows, reject empty output.
    async fn fetch_attempt(&self) -> Result<QuakeSnapshot, QuakeError> {
        let response = self
            .client
            .get(self.bulletin_url.clone())
            .send()
            .await?
            .error_for_status()?;

        let html = response.text().await?;

        let quakes = parse_bulletin(&html, &self.bulletin_url);
        if quakes.is_empty() {
            return Err(QuakeError::EmptyExtraction);
        }

        Ok(QuakeSnapshot::new(quakes))
    }
}

#[async_trait]
impl FetchSnapshot for QuakeFetcher {
    /// Fetch the bulletin with up to `max_attempts` total attempts and a
    /// fixed delay between them. Succeeds only on a non-empty extraction;
    /// exhaustion fails with the last underlying cause attached.
    async fn fetch_snapshot(&self) -> Result<QuakeSnapshot, QuakeError> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                tracing::debug!(
                    "Retrying bulletin fetch in {:?} (attempt {}/{})",
                    self.retry_delay,
                    attempt,
                    self.max_attempts
                );
                tokio::time::sleep(self.retry_delay).await;
            }

            match self.fetch_attempt().await {
                Ok(snapshot) => {
                    tracing::debug!(
                        "Fetched {} bulletin entries (attempt {}/{})",
                        snapshot.quakes.len(),
                        attempt,
                        self.max_attempts
                    );
                    return Ok(snapshot);
                }
                Err(e) => {
                    tracing::warn!(
                        "Bulletin fetch attempt {}/{} failed: {}",
                        attempt,
                        self.max_attempts,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(QuakeError::RetriesExhausted {
            attempts: self.max_attempts,
            source: Box::new(last_error.unwrap_or(QuakeError::EmptyExtraction)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ROW_HTML: &str = r#"<table><tr>
        <td>30 August 2026 - 08:15 PM</td>
        <td>12.34</td><td>124.56</td><td>10</td><td>3.4</td><td>Somewhere</td>
    </tr></table>"#;

    fn fetcher_for(server: &MockServer) -> QuakeFetcher {
        QuakeFetcher::new(Url::parse(&server.uri()).unwrap())
            .unwrap()
            .with_retry_policy(3, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_successful_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ROW_HTML))
            .expect(1)
            .mount(&server)
            .await;

        let snapshot = fetcher_for(&server).fetch_snapshot().await.unwrap();
        assert_eq!(snapshot.quakes.len(), 1);
        assert_eq!(snapshot.quakes[0].magnitude, 3.4);
    }

    #[tokio::test]
    async fn test_empty_extraction_retried_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body>no table</body></html>"),
            )
            .expect(3)
            .mount(&server)
            .await;

        let err = fetcher_for(&server).fetch_snapshot().await.unwrap_err();
        match err {
            QuakeError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, QuakeError::EmptyExtraction));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_then_recovery() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ROW_HTML))
            .mount(&server)
            .await;

        let snapshot = fetcher_for(&server).fetch_snapshot().await.unwrap();
        assert_eq!(snapshot.quakes.len(), 1);
    }

    #[test]
    fn test_fetcher_construction() {
        let url = Url::parse("https://earthquake.example.gov.ph/").unwrap();
        let fetcher = QuakeFetcher::new(url)
            .unwrap()
            .with_retry_policy(5, Duration::from_millis(10));
        assert_eq!(fetcher.max_attempts, 5);
        assert_eq!(fetcher.retry_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_retry_policy_floor() {
        let url = Url::parse("https://earthquake.example.gov.ph/").unwrap();
        let fetcher = QuakeFetcher::new(url)
            .unwrap()
            .with_retry_policy(0, Duration::ZERO);
        // At least one attempt is always made
        assert_eq!(fetcher.max_attempts, 1);
    }
}
