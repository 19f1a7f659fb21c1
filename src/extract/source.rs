//! Page sources for the recall extractor
//!
//! The extractor only needs "give me the HTML behind this URL". `HttpSource`
//! fetches live pages; `FileSource` serves a directory of saved pages so the
//! whole pipeline can run offline.

use std::fs;
use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use url::Url;

use crate::config::ExtractorConfig;
use crate::error::{PipelineError, Result};

/// Anything that can serve the HTML behind a URL
pub trait PageSource {
    /// Fetch a page
    ///
    /// `Ok(None)` means the page does not exist (end of the listing);
    /// transport failures and other non-success statuses are `IngestionError`s.
    fn fetch(&self, url: &str) -> Result<Option<String>>;
}

impl<S: PageSource + ?Sized> PageSource for &S {
    fn fetch(&self, url: &str) -> Result<Option<String>> {
        (**self).fetch(url)
    }
}

impl<S: PageSource + ?Sized> PageSource for Box<S> {
    fn fetch(&self, url: &str) -> Result<Option<String>> {
        (**self).fetch(url)
    }
}

/// Live source over HTTP
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    /// Build a client with the configured timeout and user agent
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PipelineError::ingestion(&config.base_url, format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl PageSource for HttpSource {
    fn fetch(&self, url: &str) -> Result<Option<String>> {
        log::debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| PipelineError::ingestion(url, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(PipelineError::ingestion(url, format!("HTTP status {status}")));
        }

        response
            .text()
            .map(Some)
            .map_err(|e| PipelineError::ingestion(url, format!("cannot read body: {e}")))
    }
}

/// Offline source over a directory of saved pages
///
/// A URL maps to `<root>/<url path>.html`, so `/categorie/94/3` is served
/// from `categorie/94/3.html`. Missing files behave like a 404.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File a URL is served from
    pub fn path_for(&self, url: &str) -> Result<PathBuf> {
        let parsed = Url::parse(url).map_err(|e| PipelineError::ingestion(url, format!("invalid URL: {e}")))?;
        let relative = parsed.path().trim_matches('/');
        if relative.is_empty() {
            return Ok(self.root.join("index.html"));
        }
        if relative.split('/').any(|segment| segment == "..") {
            return Err(PipelineError::ingestion(url, "path escapes the page directory"));
        }
        Ok(self.root.join(format!("{relative}.html")))
    }
}

impl PageSource for FileSource {
    fn fetch(&self, url: &str) -> Result<Option<String>> {
        let path = self.path_for(url)?;
        match fs::read_to_string(&path) {
            Ok(html) => Ok(Some(html)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PipelineError::ingestion(url, format!("cannot read {}: {e}", path.display()))),
        }
    }
}
