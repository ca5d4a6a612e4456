// src/pipeline.rs
//! One run: load state → fetch → filter → (render → deliver → commit).
//!
//! State is written only after the mail transport confirmed the send, so a
//! failed delivery leaves every listing eligible again on the next run.

use std::fmt::Display;

use chrono::{DateTime, TimeZone};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::config::AppConfig;
use crate::digest::{self, Digest};
use crate::ingest::{self, FetchReport, ListingsApi, NormalizedListing};
use crate::notify::{self, DeliveryError, MailTransport};
use crate::state::{SeenIds, StateError, StateStore};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_pages_fetched_total", "Listing pages fetched.");
        describe_counter!("digest_fetch_errors_total", "Page requests that ended pagination.");
        describe_counter!(
            "digest_param_fallbacks_total",
            "Pages re-requested with the minimal parameter set."
        );
        describe_counter!("digest_listings_fetched_total", "Raw listings fetched.");
        describe_counter!("digest_listings_new_total", "Listings selected for delivery.");
        describe_counter!("digest_deliveries_total", "Digests sent.");
        describe_counter!("digest_delivery_failures_total", "Digest sends that failed.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Start,
    Fetching,
    Filtering,
    Idle,
    Rendering,
    Delivering,
    Committing,
    Done,
    Failed,
}

fn enter(phase: RunPhase) {
    tracing::debug!(target: "pipeline", ?phase, "phase");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing new; no mail, no state write.
    Idle,
    /// A digest went out. `forced` marks a force-test placeholder.
    Delivered { count: usize, forced: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub fetched: usize,
    pub pages: usize,
    pub fetch_failed: bool,
    pub delivered: Vec<NormalizedListing>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn status_line(&self) -> String {
        let degraded = if self.fetch_failed {
            " (fetch incomplete)"
        } else {
            ""
        };
        match self.outcome {
            RunOutcome::Idle => format!(
                "No new listings ({} fetched){degraded}; no mail sent.",
                self.fetched
            ),
            RunOutcome::Delivered { forced: true, .. } => {
                format!("Test notification sent ({} fetched){degraded}.", self.fetched)
            }
            RunOutcome::Delivered { count, .. } => {
                format!("Mail sent: {count} new listing(s){degraded}.")
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    /// The mail went out but the seen ids could not be persisted.
    #[error("mail sent but state not saved: {0}")]
    Commit(#[from] StateError),
}

impl RunError {
    pub fn status_line(&self) -> String {
        match self {
            RunError::Delivery(e) if e.is_config() => format!("Mail configuration error: {e}"),
            RunError::Delivery(e) => format!("Mail delivery failed: {e}. State not updated."),
            RunError::Commit(e) => format!("Mail sent, but saving state failed: {e}"),
        }
    }
}

/// Fetch failures degrade to "fewer listings"; they never abort the run.
pub fn listings_or_empty(report: &mut FetchReport) -> Vec<ingest::RawListing> {
    if let Some(e) = &report.error {
        tracing::warn!(
            target: "pipeline",
            error = %e,
            kept = report.listings.len(),
            "fetch ended early; continuing with what was collected"
        );
    }
    std::mem::take(&mut report.listings)
}

/// Picks the deliverable listings. Pure: `seen` is only read.
pub fn select(
    cfg: &AppConfig,
    raw: &[ingest::RawListing],
    seen: &SeenIds,
) -> Vec<NormalizedListing> {
    if cfg.only_new {
        ingest::filter_new(raw, seen)
    } else {
        ingest::normalize_all(raw)
    }
}

pub async fn run_once<Tz>(
    cfg: &AppConfig,
    api: &dyn ListingsApi,
    transport: &dyn MailTransport,
    store: &StateStore,
    now: DateTime<Tz>,
) -> Result<RunReport, RunError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    ensure_metrics_described();

    enter(RunPhase::Start);
    let mut seen = match store.load() {
        Ok(ids) => ids,
        Err(e) => {
            tracing::warn!(target: "pipeline", error = %e, "state unreadable; starting from empty");
            SeenIds::new()
        }
    };

    enter(RunPhase::Fetching);
    let mut fetch = ingest::fetch_all(api, &cfg.fetch).await;
    let fetch_failed = fetch.error.is_some();
    let raw = listings_or_empty(&mut fetch);

    enter(RunPhase::Filtering);
    let listings = select(cfg, &raw, &seen);
    counter!("digest_listings_new_total").increment(listings.len() as u64);
    tracing::info!(
        target: "pipeline",
        source = api.name(),
        pages = fetch.pages,
        fetched = raw.len(),
        selected = listings.len(),
        seen = seen.len(),
        only_new = cfg.only_new,
        "listings filtered"
    );

    let mut report = RunReport {
        fetched: raw.len(),
        pages: fetch.pages,
        fetch_failed,
        delivered: Vec::new(),
        outcome: RunOutcome::Idle,
    };

    let digest: Digest = if listings.is_empty() {
        enter(RunPhase::Idle);
        if !cfg.force_test {
            return Ok(report);
        }
        tracing::info!(target: "pipeline", "force-test mode: sending placeholder");
        digest::render_test_notice(&cfg.display, &now)
    } else {
        enter(RunPhase::Rendering);
        digest::render(&listings, &cfg.display, &now)
    };

    enter(RunPhase::Delivering);
    if let Err(e) = notify::deliver(&digest, &cfg.mail, transport).await {
        enter(RunPhase::Failed);
        return Err(e.into());
    }

    enter(RunPhase::Committing);
    let forced = listings.is_empty();
    if !forced {
        for it in &listings {
            seen.insert(it.id.as_str());
        }
        if let Err(e) = store.save(&seen, cfg.state_keep_last) {
            enter(RunPhase::Failed);
            return Err(e.into());
        }
    }

    enter(RunPhase::Done);
    report.outcome = RunOutcome::Delivered {
        count: listings.len(),
        forced,
    };
    report.delivered = listings;
    Ok(report)
}
