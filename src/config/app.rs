// src/config/app.rs
//! File-level config shape and its resolution into one immutable `AppConfig`.

use serde::Deserialize;

use crate::digest::{DisplaySettings, DEFAULT_SUBJECT_PREFIX};
use crate::ingest::params::{DEFAULT_COUNTRY, DEFAULT_LIMIT, DEFAULT_MAX_PAGES};
use crate::ingest::{ApiVariant, FetchSettings, FilterSettings, SourceSettings};
use crate::notify::email::DEFAULT_SMTP_PORT;
use crate::notify::MailSettings;
use crate::state::DEFAULT_KEEP_LAST;

// --- env names ---
pub const ENV_CLIENT_ID: &str = "WANTED_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "WANTED_CLIENT_SECRET";
pub const ENV_SMTP_PASS: &str = "SMTP_PASS";
pub const ENV_FORCE_TEST: &str = "WM_FORCE_TEST";

/// Filter values may be written as a list (`[1, "2"]`) or a CSV string (`"1,2"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FilterValues {
    Csv(String),
    List(Vec<FilterValue>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Int(i64),
    Text(String),
}

/// Numeric settings written either as a number (`465`) or a string (`"465"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberValue {
    Int(u64),
    Text(String),
}

impl NumberValue {
    /// `None` for text that is not a non-negative integer or does not fit `T`.
    fn get<T: TryFrom<u64>>(&self, key: &'static str) -> Option<T> {
        let n = match self {
            NumberValue::Int(n) => Some(*n),
            NumberValue::Text(s) => s.trim().parse::<u64>().ok(),
        };
        let v = n.and_then(|n| T::try_from(n).ok());
        if v.is_none() {
            tracing::warn!(target: "config", key, value = ?self, "not a usable number; using default");
        }
        v
    }
}

fn number<T: TryFrom<u64>>(v: Option<NumberValue>, key: &'static str) -> Option<T> {
    v.as_ref().and_then(|v| v.get(key))
}

impl Default for FilterValues {
    fn default() -> Self {
        FilterValues::List(Vec::new())
    }
}

impl FilterValues {
    fn into_strings(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            FilterValues::Csv(s) => s.split(',').map(str::to_string).collect(),
            FilterValues::List(v) => v
                .into_iter()
                .map(|x| match x {
                    FilterValue::Int(i) => i.to_string(),
                    FilterValue::Text(s) => s,
                })
                .collect(),
        };
        raw.into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub source: Option<String>,
    pub site_v4: RawSiteV4,
    pub openapi: RawOpenApi,
    pub filters: RawFilters,
    pub paging: RawPaging,
    pub only_new: Option<bool>,
    pub state_keep_last: Option<NumberValue>,
    pub email: RawEmail,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSiteV4 {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOpenApi {
    pub url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFilters {
    pub query: Option<String>,
    pub locations: FilterValues,
    pub tag_type_ids: FilterValues,
    pub years: FilterValues,
    pub country: Option<String>,
    pub job_sort: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPaging {
    pub limit: Option<NumberValue>,
    pub max_pages: Option<NumberValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawEmail {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<NumberValue>,
    pub auth: RawMailAuth,
    pub send: RawMailSend,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMailAuth {
    /// true → STARTTLS; false → implicit TLS.
    pub use_tls: Option<bool>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMailSend {
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    pub to_name: Option<String>,
    pub to_email: Option<String>,
    pub subject_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub source: SourceSettings,
    pub fetch: FetchSettings,
    pub only_new: bool,
    pub state_keep_last: usize,
    pub mail: MailSettings,
    pub display: DisplaySettings,
    pub force_test: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        resolve(RawConfig::default(), |_| None)
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Resolve file config against an environment lookup. A non-empty env value
/// wins over the file value for API credentials and the SMTP password.
pub fn resolve<E>(raw: RawConfig, env: E) -> AppConfig
where
    E: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| non_empty(env(key));

    let variant = ApiVariant::parse(raw.source.as_deref().unwrap_or_default());
    let url = match variant {
        ApiVariant::SiteV4 => non_empty(raw.site_v4.url),
        ApiVariant::OpenApiV2 => non_empty(raw.openapi.url),
    }
    .unwrap_or_else(|| variant.default_url().to_string());
    let source = SourceSettings {
        variant,
        url,
        client_id: lookup(ENV_CLIENT_ID)
            .or_else(|| non_empty(raw.openapi.client_id))
            .unwrap_or_default(),
        client_secret: lookup(ENV_CLIENT_SECRET)
            .or_else(|| non_empty(raw.openapi.client_secret))
            .unwrap_or_default(),
    };

    let query = non_empty(raw.filters.query);
    let fetch = FetchSettings {
        filters: FilterSettings {
            query: query.clone(),
            locations: raw.filters.locations.into_strings(),
            tag_type_ids: raw.filters.tag_type_ids.into_strings(),
            years: raw.filters.years.into_strings(),
            country: non_empty(raw.filters.country).unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            job_sort: non_empty(raw.filters.job_sort),
        },
        limit: number(raw.paging.limit, "paging.limit")
            .unwrap_or(DEFAULT_LIMIT)
            .max(1),
        max_pages: number(raw.paging.max_pages, "paging.max_pages").unwrap_or(DEFAULT_MAX_PAGES),
    };

    let auth = raw.email.auth;
    let send = raw.email.send;
    let user_name = non_empty(auth.user_name).unwrap_or_default();
    let user_email = non_empty(auth.user_email).unwrap_or_default();
    let from_email = non_empty(send.from_email).unwrap_or_else(|| user_email.clone());
    let from_name = non_empty(send.from_name).unwrap_or_else(|| {
        if user_name.is_empty() {
            user_email.clone()
        } else {
            user_name.clone()
        }
    });
    let mail = MailSettings {
        host: non_empty(raw.email.smtp_host).unwrap_or_default(),
        port: Some(number(raw.email.smtp_port, "email.smtp_port").unwrap_or(DEFAULT_SMTP_PORT)),
        use_starttls: auth.use_tls.unwrap_or(false),
        username: user_email,
        password: lookup(ENV_SMTP_PASS)
            .or_else(|| auth.password.filter(|p| !p.is_empty()))
            .unwrap_or_default(),
        from_name,
        from_email,
        to_name: non_empty(send.to_name).unwrap_or_default(),
        to_email: non_empty(send.to_email).unwrap_or_default(),
    };

    let display = DisplaySettings {
        subject_prefix: send
            .subject_prefix
            .unwrap_or_else(|| DEFAULT_SUBJECT_PREFIX.to_string()),
        query,
    };

    AppConfig {
        source,
        fetch,
        only_new: raw.only_new.unwrap_or(true),
        // Zero would drop the ids of the digest that was just sent.
        state_keep_last: number(raw.state_keep_last, "state_keep_last")
            .unwrap_or(DEFAULT_KEEP_LAST)
            .max(1),
        mail,
        display,
        force_test: lookup(ENV_FORCE_TEST).is_some_and(|v| truthy(&v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.source.variant, ApiVariant::SiteV4);
        assert_eq!(cfg.fetch.limit, 50);
        assert_eq!(cfg.fetch.max_pages, 2);
        assert_eq!(cfg.fetch.filters.country, "kr");
        assert!(cfg.only_new);
        assert_eq!(cfg.state_keep_last, 5000);
        assert_eq!(cfg.mail.port, Some(465));
        assert_eq!(cfg.display.subject_prefix, "[Wanted]");
        assert!(!cfg.force_test);
    }

    #[test]
    fn env_secret_beats_file_value() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "source": "openapi_v2",
                "openapi": { "client_id": "file-id", "client_secret": "file-secret" },
                "email": { "auth": { "password": "file-pw" } }
            }"#,
        )
        .unwrap();
        let cfg = resolve(
            raw,
            env_of(&[(ENV_CLIENT_SECRET, "env-secret"), (ENV_SMTP_PASS, "env-pw")]),
        );
        assert_eq!(cfg.source.client_id, "file-id");
        assert_eq!(cfg.source.client_secret, "env-secret");
        assert_eq!(cfg.source.url, "https://openapi.wanted.jobs/v2/jobs");
        assert_eq!(cfg.mail.password, "env-pw");
    }

    #[test]
    fn empty_env_value_does_not_override() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "email": { "auth": { "password": "file-pw" } } }"#).unwrap();
        let cfg = resolve(raw, env_of(&[(ENV_SMTP_PASS, "")]));
        assert_eq!(cfg.mail.password, "file-pw");
    }

    #[test]
    fn filter_values_accept_csv_and_lists() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "filters": { "locations": "1, 2,,x", "years": [0, "5"] } }"#,
        )
        .unwrap();
        let cfg = resolve(raw, |_| None);
        assert_eq!(cfg.fetch.filters.locations, vec!["1", "2", "x"]);
        assert_eq!(cfg.fetch.filters.years, vec!["0", "5"]);
    }

    #[test]
    fn sender_falls_back_to_auth_identity() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "email": { "auth": { "user_name": "Bot", "user_email": "bot@x.test" } } }"#,
        )
        .unwrap();
        let cfg = resolve(raw, |_| None);
        assert_eq!(cfg.mail.from_email, "bot@x.test");
        assert_eq!(cfg.mail.from_name, "Bot");
        assert_eq!(cfg.mail.username, "bot@x.test");
    }

    #[test]
    fn force_test_flag_is_truthy_only() {
        assert!(resolve(RawConfig::default(), env_of(&[(ENV_FORCE_TEST, "yes")])).force_test);
        assert!(!resolve(RawConfig::default(), env_of(&[(ENV_FORCE_TEST, "0")])).force_test);
    }

    #[test]
    fn zero_limit_is_clamped() {
        let raw: RawConfig = serde_json::from_str(r#"{ "paging": { "limit": 0 } }"#).unwrap();
        assert_eq!(resolve(raw, |_| None).fetch.limit, 1);
    }

    #[test]
    fn zero_keep_last_is_clamped() {
        let raw: RawConfig = serde_json::from_str(r#"{ "state_keep_last": 0 }"#).unwrap();
        assert_eq!(resolve(raw, |_| None).state_keep_last, 1);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "state_keep_last": "200",
                "paging": { "limit": "20", "max_pages": " 3 " },
                "email": { "smtp_port": "587" }
            }"#,
        )
        .unwrap();
        let cfg = resolve(raw, |_| None);
        assert_eq!(cfg.mail.port, Some(587));
        assert_eq!(cfg.fetch.limit, 20);
        assert_eq!(cfg.fetch.max_pages, 3);
        assert_eq!(cfg.state_keep_last, 200);
    }

    #[test]
    fn unusable_numbers_fall_back_to_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "paging": { "limit": "fifty" }, "email": { "smtp_port": 70000 } }"#,
        )
        .unwrap();
        let cfg = resolve(raw, |_| None);
        assert_eq!(cfg.fetch.limit, 50);
        assert_eq!(cfg.mail.port, Some(465));
    }
}
