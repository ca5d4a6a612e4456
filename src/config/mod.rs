// src/config/mod.rs
pub mod app;

pub use app::{resolve, AppConfig, RawConfig};

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "WM_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Load raw config from an explicit path. Supports JSON or TOML, picked by
/// extension; files without a known extension are tried as JSON, then TOML.
pub fn load_raw_from(path: &Path) -> Result<RawConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_raw(&content, ext.as_str()).with_context(|| format!("parsing {}", path.display()))
}

fn parse_raw(s: &str, hint_ext: &str) -> Result<RawConfig> {
    match hint_ext {
        "json" => Ok(serde_json::from_str(s)?),
        "toml" => Ok(toml::from_str(s)?),
        _ => serde_json::from_str::<RawConfig>(s)
            .or_else(|_| toml::from_str(s))
            .map_err(|_| anyhow!("unsupported config format (expected JSON or TOML)")),
    }
}

/// `$WM_CONFIG_PATH`, else `config.json` in the working dir.
pub fn config_path_from_env() -> PathBuf {
    std::env::var(ENV_CONFIG_PATH)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load the file at `path` and resolve it against the process environment.
pub fn load_from(path: &Path) -> Result<AppConfig> {
    let raw = load_raw_from(path)?;
    Ok(resolve(raw, |k| std::env::var(k).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_and_toml_parse_to_same_shape() {
        let json = r#"{ "source": "site_v4", "paging": { "limit": 10, "max_pages": 3 } }"#;
        let toml = "source = \"site_v4\"\n[paging]\nlimit = 10\nmax_pages = 3\n";
        let a = resolve(parse_raw(json, "json").unwrap(), |_| None);
        let b = resolve(parse_raw(toml, "toml").unwrap(), |_| None);
        assert_eq!(a, b);
        assert_eq!(a.fetch.max_pages, 3);
    }

    #[test]
    fn unknown_extension_sniffs_format() {
        assert!(parse_raw("only_new = false", "").is_ok());
        assert!(parse_raw("{ \"only_new\": false }", "conf").is_ok());
        assert!(parse_raw("<xml/>", "").is_err());
    }
}
