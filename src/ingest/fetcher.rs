// src/ingest/fetcher.rs
//! Sequential pagination over a `ListingsApi`.

use metrics::counter;

use crate::ingest::envelope::extract_items;
use crate::ingest::params::{build_params, minimal_params, FetchSettings};
use crate::ingest::types::{FetchError, FetchPage, FetchReport, ListingsApi};

/// Lazy page sequence. Once it has returned `None` (or an error) it stays
/// exhausted; build a new `Pager` to start over.
pub struct Pager<'a> {
    api: &'a dyn ListingsApi,
    settings: &'a FetchSettings,
    next: usize,
    done: bool,
}

impl<'a> Pager<'a> {
    pub fn new(api: &'a dyn ListingsApi, settings: &'a FetchSettings) -> Self {
        Self {
            api,
            settings,
            next: 0,
            done: false,
        }
    }

    pub async fn next_page(&mut self) -> Option<Result<FetchPage, FetchError>> {
        if self.done || self.next >= self.settings.max_pages {
            self.done = true;
            return None;
        }
        let page = self.next;
        self.next += 1;

        let (body, degraded) = match self.request(page).await {
            Ok(ok) => ok,
            Err(e) => {
                self.done = true;
                counter!("digest_fetch_errors_total").increment(1);
                return Some(Err(e));
            }
        };
        counter!("digest_pages_fetched_total").increment(1);

        let (items, raw_count) = extract_items(&body);
        tracing::debug!(
            target: "fetch",
            source = self.api.name(),
            page,
            items = items.len(),
            raw_count,
            degraded,
            "page fetched"
        );

        if raw_count == 0 {
            self.done = true;
            return None;
        }
        if raw_count < self.settings.limit {
            self.done = true;
        }
        Some(Ok(FetchPage {
            page,
            items,
            raw_count,
            degraded,
        }))
    }

    /// One request for `page`, replaced once by the minimal parameter set if
    /// the API rejects the filters.
    async fn request(&self, page: usize) -> Result<(serde_json::Value, bool), FetchError> {
        match self.api.get_page(&build_params(self.settings, page)).await {
            Ok(body) => Ok((body, false)),
            Err(e) if e.is_unprocessable() => {
                tracing::warn!(
                    target: "fetch",
                    source = self.api.name(),
                    page,
                    error = %e,
                    "filters rejected; retrying page with minimal parameters"
                );
                counter!("digest_param_fallbacks_total").increment(1);
                let body = self
                    .api
                    .get_page(&minimal_params(self.settings, page))
                    .await?;
                Ok((body, true))
            }
            Err(e) => Err(e),
        }
    }
}

/// Drains a fresh `Pager`. Items gathered before an error are kept.
pub async fn fetch_all(api: &dyn ListingsApi, settings: &FetchSettings) -> FetchReport {
    let mut report = FetchReport::default();
    let mut pager = Pager::new(api, settings);
    while let Some(next) = pager.next_page().await {
        match next {
            Ok(page) => {
                report.pages += 1;
                report.listings.extend(page.items);
            }
            Err(e) => {
                report.error = Some(e);
                break;
            }
        }
    }
    counter!("digest_listings_fetched_total").increment(report.listings.len() as u64);
    report
}
