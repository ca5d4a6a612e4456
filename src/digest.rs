// src/digest.rs
//! HTML digest of new listings, with a plain-text alternative.

use chrono::{DateTime, TimeZone};
use html_escape::encode_quoted_attribute;
use std::fmt::{Display, Write as _};

use crate::ingest::NormalizedListing;

pub const DEFAULT_SUBJECT_PREFIX: &str = "[Wanted]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
    pub subject_prefix: String,
    /// Shown in the header when set.
    pub query: Option<String>,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
            query: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub html: String,
    pub text: String,
}

fn esc(s: &str) -> String {
    encode_quoted_attribute(s).into_owned()
}

fn meta_line(it: &NormalizedListing) -> String {
    [&it.company, &it.location, &it.published_at]
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" · ")
}

fn header_html<Tz: TimeZone>(
    count: usize,
    display: &DisplaySettings,
    now: &DateTime<Tz>,
) -> String
where
    Tz::Offset: Display,
{
    let mut head = format!(
        "<h2>New Wanted listings</h2><p>As of {}",
        now.format("%Y-%m-%d %H:%M")
    );
    if let Some(q) = display.query.as_deref().filter(|q| !q.trim().is_empty()) {
        let _ = write!(head, " | Keyword: <b>{}</b>", esc(q.trim()));
    }
    let _ = write!(head, " | Count: <b>{count}</b></p>");
    head
}

pub fn subject_for(prefix: &str, count: usize) -> String {
    let noun = if count == 1 { "listing" } else { "listings" };
    format!("{} {count} new {noun}", prefix.trim()).trim().to_string()
}

pub fn render<Tz: TimeZone>(
    listings: &[NormalizedListing],
    display: &DisplaySettings,
    now: &DateTime<Tz>,
) -> Digest
where
    Tz::Offset: Display,
{
    let mut items = String::new();
    let mut text = format!(
        "New Wanted listings as of {} ({})\n\n",
        now.format("%Y-%m-%d %H:%M"),
        listings.len()
    );
    for (n, it) in listings.iter().enumerate() {
        let link = if it.link.is_empty() { "#" } else { it.link.as_str() };
        let meta = meta_line(it);
        let _ = write!(
            items,
            r#"<li style="margin:8px 0;"><a href="{}" target="_blank">{}</a><br><span style="color:#666;">{}</span></li>"#,
            esc(link),
            esc(&it.title),
            esc(&meta)
        );
        let _ = writeln!(text, "{}. {}", n + 1, it.title);
        if !meta.is_empty() {
            let _ = writeln!(text, "   {meta}");
        }
        if !it.link.is_empty() {
            let _ = writeln!(text, "   {}", it.link);
        }
    }

    let html = format!(
        "{}\n<ol>\n{}\n</ol>\n<p style=\"color:#888;font-size:12px;\">Sent automatically by a scheduled job.</p>",
        header_html(listings.len(), display, now),
        items
    );

    Digest {
        subject: subject_for(&display.subject_prefix, listings.len()),
        html,
        text,
    }
}

/// Placeholder sent in force-test mode when there is nothing new.
pub fn render_test_notice<Tz: TimeZone>(display: &DisplaySettings, now: &DateTime<Tz>) -> Digest
where
    Tz::Offset: Display,
{
    let stamp = now.format("%Y-%m-%d %H:%M").to_string();
    Digest {
        subject: format!("{} Test notification", display.subject_prefix.trim())
            .trim()
            .to_string(),
        html: format!(
            "{}\n<p>No new listings right now. This message verifies the delivery pipeline.</p>",
            header_html(0, display, now)
        ),
        text: format!(
            "Test notification as of {stamp}.\nNo new listings right now. This message verifies the delivery pipeline.\n"
        ),
    }
}
