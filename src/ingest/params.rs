// src/ingest/params.rs
//! Query construction for one page request.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::types::QueryParams;

pub const DEFAULT_COUNTRY: &str = "kr";
pub const DEFAULT_LIMIT: usize = 50;
pub const DEFAULT_MAX_PAGES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSettings {
    pub query: Option<String>,
    pub locations: Vec<String>,
    pub tag_type_ids: Vec<String>,
    pub years: Vec<String>,
    pub country: String,
    pub job_sort: Option<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            query: None,
            locations: Vec::new(),
            tag_type_ids: Vec::new(),
            years: Vec::new(),
            country: DEFAULT_COUNTRY.to_string(),
            job_sort: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub filters: FilterSettings,
    pub limit: usize,
    pub max_pages: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            filters: FilterSettings::default(),
            limit: DEFAULT_LIMIT,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl FetchSettings {
    pub fn offset(&self, page: usize) -> usize {
        page.saturating_mul(self.limit)
    }
}

/// Integer codes only; `years=-1` means "any experience".
fn is_numeric(s: &str) -> bool {
    s.parse::<i64>().is_ok()
}

/// Sort tokens the API accepts look like `job.latest_order` or
/// `company.response_rate_order`.
pub fn is_valid_sort(token: &str) -> bool {
    static RE_SORT: OnceCell<Regex> = OnceCell::new();
    RE_SORT
        .get_or_init(|| Regex::new(r"^(job|company)\.[a-z_]+$").expect("static sort regex"))
        .is_match(token)
}

fn query_term(filters: &FilterSettings) -> Option<&str> {
    filters
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
}

fn push_numeric(params: &mut QueryParams, key: &'static str, values: &[String]) {
    for v in values {
        let v = v.trim();
        if is_numeric(v) {
            params.push((key, v.to_string()));
        } else {
            tracing::debug!(target: "fetch", key, value = v, "dropping non-numeric filter value");
        }
    }
}

/// Full parameter set for `page` (0-based).
pub fn build_params(settings: &FetchSettings, page: usize) -> QueryParams {
    let filters = &settings.filters;
    let mut params = QueryParams::new();

    if let Some(q) = query_term(filters) {
        params.push(("query", q.to_string()));
    }
    push_numeric(&mut params, "locations", &filters.locations);
    push_numeric(&mut params, "tag_type_ids", &filters.tag_type_ids);
    push_numeric(&mut params, "years", &filters.years);
    params.push(("country", filters.country.clone()));

    if let Some(sort) = filters.job_sort.as_deref().map(str::trim) {
        if is_valid_sort(sort) {
            params.push(("job_sort", sort.to_string()));
        } else if !sort.is_empty() {
            tracing::debug!(target: "fetch", job_sort = sort, "dropping unknown sort token");
        }
    }

    params.push(("limit", settings.limit.to_string()));
    params.push(("offset", settings.offset(page).to_string()));
    params
}

/// Fallback set used after the API rejects the full filter set.
pub fn minimal_params(settings: &FetchSettings, page: usize) -> QueryParams {
    let mut params = QueryParams::new();
    params.push(("country", settings.filters.country.clone()));
    params.push(("limit", settings.limit.to_string()));
    params.push(("offset", settings.offset(page).to_string()));
    if let Some(q) = query_term(&settings.filters) {
        params.push(("query", q.to_string()));
    }
    params
}
