// src/ingest/normalize.rs
//! Raw record → canonical listing, and the novelty filter on top of it.

use std::collections::HashSet;

use serde_json::Value;

use crate::ingest::types::{NormalizedListing, RawListing};
use crate::state::SeenIds;

pub const LINK_BASE: &str = "https://www.wanted.co.kr/wd/";
pub const UNTITLED: &str = "(untitled)";

const ID_KEYS: &[&str] = &["id", "position_id", "job_id"];
const TITLE_KEYS: &[&str] = &["title", "position", "name"];
const COMPANY_NESTED_KEYS: &[&str] = &["name_ko", "name", "title"];
const LOCATION_KEYS: &[&str] = &["location", "city", "workplace"];
const PUBLISHED_KEYS: &[&str] = &["published_at", "created_at", "posting_created_at"];

/// Scalar as text, or `None` for values that should fall through to the next
/// candidate field (null, empty string, zero, false, arrays, objects).
fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn first_of(map: &RawListing, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| map.get(*k).and_then(scalar_text))
}

fn company_of(raw: &RawListing) -> String {
    raw.get("company")
        .and_then(Value::as_object)
        .and_then(|c| first_of(c, COMPANY_NESTED_KEYS))
        .or_else(|| first_of(raw, &["company_name"]))
        .unwrap_or_default()
}

fn location_of(raw: &RawListing) -> String {
    first_of(raw, LOCATION_KEYS)
        .or_else(|| {
            raw.get("address")
                .and_then(Value::as_object)
                .and_then(|a| first_of(a, &["location"]))
        })
        .unwrap_or_default()
}

pub fn listing_link(id: &str) -> String {
    if id.is_empty() {
        String::new()
    } else {
        format!("{LINK_BASE}{id}")
    }
}

pub fn normalize(raw: &RawListing) -> NormalizedListing {
    let id = first_of(raw, ID_KEYS).unwrap_or_default();
    NormalizedListing {
        link: listing_link(&id),
        title: first_of(raw, TITLE_KEYS).unwrap_or_else(|| UNTITLED.to_string()),
        company: company_of(raw),
        location: location_of(raw),
        published_at: first_of(raw, PUBLISHED_KEYS).unwrap_or_default(),
        id,
    }
}

fn normalize_where<F>(raw: &[RawListing], mut keep: F) -> Vec<NormalizedListing>
where
    F: FnMut(&NormalizedListing) -> bool,
{
    let mut batch: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for r in raw {
        let it = normalize(r);
        if it.id.is_empty() || !keep(&it) || !batch.insert(it.id.clone()) {
            continue;
        }
        out.push(it);
    }
    out
}

/// Listings whose id is not in `seen`, in input order. `seen` is not touched.
pub fn filter_new(raw: &[RawListing], seen: &SeenIds) -> Vec<NormalizedListing> {
    normalize_where(raw, |it| !seen.contains(&it.id))
}

/// Every listing with a usable id, in input order (`only_new = false`).
pub fn normalize_all(raw: &[RawListing]) -> Vec<NormalizedListing> {
    normalize_where(raw, |_| true)
}
