//! Network access for remote schemas.
use std::time::Duration;
use thiserror::Error;

/// Errors returned while downloading a schema.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} answered with HTTP status {status}")]
    Status { url: String, status: u16 },
}

/// Source of remote schema bodies.
pub trait SchemaFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP fetcher; a slow server blocks the run until the timeout.
///
/// # Examples
/// ```rust,no_run
/// use htrvx_core::schema::{HttpFetcher, SchemaFetcher};
///
/// let fetcher = HttpFetcher::new()?;
/// let body = fetcher.fetch("https://www.loc.gov/standards/alto/v4/alto-4-2.xsd")?;
/// # let _ = body;
/// # Ok::<(), htrvx_core::schema::FetchError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("htrvx/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpFetcher { client })
    }
}

impl SchemaFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::info!(url, "downloading schema");
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}
