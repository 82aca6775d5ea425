use std::future::Future;

use anyhow::Result;
use scraper::Html;
use tracing::debug;

use crate::error::ScrapeError;
use crate::parser;

/// Plain GET of a page body.
pub trait Transport {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ScrapeError>>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        let request_error = |source| ScrapeError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(request_error)?;
        debug!(url, bytes = body.len(), "Fetched page");
        Ok(body.to_vec())
    }
}

/// Fetch a page and parse it into a document.
pub async fn fetch_document<T: Transport>(transport: &T, url: &str) -> Result<Html, ScrapeError> {
    let body = transport.fetch(url).await?;
    parser::parse_document(url, &body)
}

/// In-memory transport serving fixture pages by URL.
#[cfg(test)]
pub struct FixtureTransport {
    pages: std::collections::HashMap<String, Vec<u8>>,
    requested: std::cell::RefCell<Vec<String>>,
}

#[cfg(test)]
impl FixtureTransport {
    pub fn new() -> Self {
        Self {
            pages: std::collections::HashMap::new(),
            requested: std::cell::RefCell::new(Vec::new()),
        }
    }

    pub fn with_page(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    pub fn with_fixture(self, url: &str, fixture: &str) -> Self {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", fixture)).unwrap();
        self.with_page(url, html)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

#[cfg(test)]
impl Transport for FixtureTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        self.requested.borrow_mut().push(url.to_string());
        self.pages.get(url).cloned().ok_or_else(|| ScrapeError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}
