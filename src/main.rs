//! Scheduled job entrypoint: one fetch → filter → mail → commit cycle per
//! invocation, then exit.
//!
//! Config path: `WM_CONFIG_PATH` (default `config.json`).
//! State path: `WM_STATE_PATH` (default `last_ids.txt`).

use std::process::ExitCode;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wanted_digest::config;
use wanted_digest::ingest::HttpListingsApi;
use wanted_digest::notify::SmtpMailer;
use wanted_digest::{run_once, StateStore};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wanted_digest=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env locally; no-op in CI where secrets come from the environment.
    let _ = dotenvy::dotenv();
    init_tracing();

    let path = config::config_path_from_env();
    let setup = config::load_from(&path).and_then(|cfg| {
        let api = HttpListingsApi::new(&cfg.source).context("building HTTP client")?;
        Ok((cfg, api))
    });
    let (cfg, api) = match setup {
        Ok(ok) => ok,
        Err(e) => {
            println!("Configuration error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let store = StateStore::from_env();
    let mailer = SmtpMailer::new();

    match run_once(&cfg, &api, &mailer, &store, chrono::Local::now()).await {
        Ok(report) => {
            println!("{}", report.status_line());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(target: "pipeline", error = %e, "run failed");
            println!("{}", e.status_line());
            ExitCode::FAILURE
        }
    }
}
