///! Error taxonomy for the bulletin fetch/cache pipeline

use thiserror::Error;

/// Failures surfaced by the fetcher and snapshot cache.
#[derive(Debug, Error)]
pub enum QuakeError {
    /// Network or timeout failure talking to the bulletin host
    #[error("bulletin request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The page was retrieved but yielded no valid bulletin rows;
    /// treated like a network failure for retry purposes
    #[error("no earthquake rows extracted from bulletin page")]
    EmptyExtraction,

    /// All fetch attempts failed; carries the last underlying cause
    #[error("bulletin fetch failed after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<QuakeError>,
    },

    /// Fetch failed and no cached snapshot exists to fall back to.
    /// The only variant a pull-query caller ever sees.
    #[error("bulletin source unavailable and no cached data")]
    UpstreamUnavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_exhausted_keeps_cause() {
        let err = QuakeError::RetriesExhausted {
            attempts: 3,
            source: Box::new(QuakeError::EmptyExtraction),
        };
        assert!(err.to_string().contains("3 attempts"));
        let cause = std::error::Error::source(&err).unwrap();
        assert!(cause.to_string().contains("no earthquake rows"));
    }
}
