// src/ingest/envelope.rs
//! Response envelope dispatch. The API has shipped its record list under
//! several top-level keys over time, and sometimes as a bare array.

use serde_json::Value;

use crate::ingest::types::RawListing;

struct Strategy {
    name: &'static str,
    matches: fn(&Value) -> bool,
    extract: fn(&Value) -> &[Value],
}

fn keyed_array<'a>(v: &'a Value, key: &str) -> Option<&'a [Value]> {
    v.as_object()?.get(key)?.as_array().map(Vec::as_slice)
}

fn has_data(v: &Value) -> bool {
    keyed_array(v, "data").is_some()
}
fn data(v: &Value) -> &[Value] {
    keyed_array(v, "data").unwrap_or(&[])
}
fn has_results(v: &Value) -> bool {
    keyed_array(v, "results").is_some()
}
fn results(v: &Value) -> &[Value] {
    keyed_array(v, "results").unwrap_or(&[])
}
fn has_jobs(v: &Value) -> bool {
    keyed_array(v, "jobs").is_some()
}
fn jobs(v: &Value) -> &[Value] {
    keyed_array(v, "jobs").unwrap_or(&[])
}
fn bare(v: &Value) -> &[Value] {
    v.as_array().map(Vec::as_slice).unwrap_or(&[])
}

// Priority order is fixed: first structural match wins.
const STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "data",
        matches: has_data,
        extract: data,
    },
    Strategy {
        name: "results",
        matches: has_results,
        extract: results,
    },
    Strategy {
        name: "jobs",
        matches: has_jobs,
        extract: jobs,
    },
    Strategy {
        name: "bare",
        matches: Value::is_array,
        extract: bare,
    },
];

/// Returns the records of the first matching envelope plus the raw entry
/// count. Unknown shapes yield an empty list rather than an error.
pub fn extract_items(body: &Value) -> (Vec<RawListing>, usize) {
    let Some(strategy) = STRATEGIES.iter().find(|s| (s.matches)(body)) else {
        tracing::debug!(target: "fetch", "no known envelope shape; treating as empty page");
        return (Vec::new(), 0);
    };
    let entries = (strategy.extract)(body);
    let items: Vec<RawListing> = entries
        .iter()
        .filter_map(|e| e.as_object().cloned())
        .collect();
    if items.len() != entries.len() {
        tracing::debug!(
            target: "fetch",
            envelope = strategy.name,
            skipped = entries.len() - items.len(),
            "non-object entries skipped"
        );
    }
    (items, entries.len())
}
