use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

// The portal serves a trimmed page to unknown agents.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>>;

/// Capability interface for retrieving a document body.
///
/// `Ok(None)` means the document is unavailable in a recoverable way (the
/// server answered, but not with the page); `Err` is a transport failure.
/// The caller decides which of the two is fatal for its purposes.
pub trait Fetch: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a>;
}

/// Plain HTTP GET fetcher over a shared reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            debug!("GET {url}");
            let response = self
                .client
                .get(url)
                .send()
                .await
                .with_context(|| format!("Request to {url} failed"))?;
            let status = response.status();
            if !status.is_success() {
                warn!("GET {url} returned {status}");
                return Ok(None);
            }
            let body = response
                .text()
                .await
                .with_context(|| format!("Reading body of {url} failed"))?;
            Ok(Some(body))
        })
    }
}

/// Fetcher that never reaches the network. Every detail expansion comes
/// back empty, so sections keep their local tables — used by the `parse`
/// subcommand and in tests.
pub struct OfflineFetcher;

impl Fetch for OfflineFetcher {
    fn fetch<'a>(&'a self, _url: &'a str) -> FetchFuture<'a> {
        Box::pin(async { Ok(None) })
    }
}
