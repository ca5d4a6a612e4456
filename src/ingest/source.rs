// src/ingest/source.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};

use crate::ingest::types::{FetchError, ListingsApi, QueryParams};

pub const SITE_V4_URL: &str = "https://www.wanted.co.kr/api/v4/jobs";
pub const OPENAPI_V2_URL: &str = "https://openapi.wanted.jobs/v2/jobs";
pub const REQUEST_TIMEOUT_SECS: u64 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVariant {
    /// Public site endpoint; no credentials.
    #[default]
    SiteV4,
    /// Official endpoint; needs client id/secret headers.
    OpenApiV2,
}

impl ApiVariant {
    /// Unknown names fall back to the site endpoint.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "openapi_v2" => ApiVariant::OpenApiV2,
            "site_v4" | "" => ApiVariant::SiteV4,
            other => {
                tracing::warn!(target: "fetch", source = other, "unknown source; using site_v4");
                ApiVariant::SiteV4
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVariant::SiteV4 => "site_v4",
            ApiVariant::OpenApiV2 => "openapi_v2",
        }
    }

    pub fn default_url(&self) -> &'static str {
        match self {
            ApiVariant::SiteV4 => SITE_V4_URL,
            ApiVariant::OpenApiV2 => OPENAPI_V2_URL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    pub variant: ApiVariant,
    pub url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            variant: ApiVariant::SiteV4,
            url: SITE_V4_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

pub struct HttpListingsApi {
    client: Client,
    url: String,
    variant: ApiVariant,
}

impl HttpListingsApi {
    pub fn new(settings: &SourceSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(default_headers(settings))
            .build()?;
        Ok(Self {
            client,
            url: settings.url.clone(),
            variant: settings.variant,
        })
    }
}

fn default_headers(settings: &SourceSettings) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    match settings.variant {
        ApiVariant::SiteV4 => {
            headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        }
        ApiVariant::OpenApiV2 => {
            for (name, value) in [
                ("client-id", &settings.client_id),
                ("client-secret", &settings.client_secret),
            ] {
                match HeaderValue::from_str(value) {
                    Ok(v) => {
                        headers.insert(HeaderName::from_static(name), v);
                    }
                    Err(_) => {
                        tracing::warn!(target: "fetch", header = name, "credential is not a valid header value; omitted");
                    }
                }
            }
        }
    }
    headers
}

#[async_trait]
impl ListingsApi for HttpListingsApi {
    async fn get_page(&self, params: &QueryParams) -> Result<serde_json::Value, FetchError> {
        let resp = self.client.get(&self.url).query(params).send().await?;
        let status = resp.status();
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(FetchError::Unprocessable {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn name(&self) -> &'static str {
        self.variant.as_str()
    }
}
