use thiserror::Error;

/// Failures of the transport and markup collaborators. The walker turns these
/// into row skips; the pipeline treats them as fatal for the listing page.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} is not valid UTF-8")]
    Decode {
        url: String,
        #[source]
        source: std::str::Utf8Error,
    },
}
