// src/ingest/types.rs
use serde::{Deserialize, Serialize};

/// Untyped listing record as it arrives from the API. Schema varies by source.
pub type RawListing = serde_json::Map<String, serde_json::Value>;

/// Ordered query pairs; keys may repeat (`locations=1&locations=2`).
pub type QueryParams = Vec<(&'static str, String)>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedListing {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub link: String,
    pub published_at: String,
}

#[derive(Debug, Clone)]
pub struct FetchPage {
    pub page: usize,
    pub items: Vec<RawListing>,
    /// Entries in the envelope before dropping non-object ones; drives pagination.
    pub raw_count: usize,
    /// True when the page came from the minimal-parameter retry.
    pub degraded: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("listing request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("listing API rejected parameters (HTTP {status})")]
    Unprocessable { status: u16 },

    #[error("listing API returned HTTP {status}")]
    Status { status: u16 },

    #[error("listing response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    pub fn is_unprocessable(&self) -> bool {
        matches!(self, FetchError::Unprocessable { .. })
    }
}

/// One GET per page against a listings endpoint.
#[async_trait::async_trait]
pub trait ListingsApi: Send + Sync {
    async fn get_page(&self, params: &QueryParams) -> Result<serde_json::Value, FetchError>;
    fn name(&self) -> &'static str;
}

/// Everything a fetch produced: items collected before pagination ended and
/// the error that ended it early, if any.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub listings: Vec<RawListing>,
    pub pages: usize,
    pub error: Option<FetchError>,
}

impl FetchReport {
    pub fn is_total_failure(&self) -> bool {
        self.error.is_some() && self.listings.is_empty()
    }
}
