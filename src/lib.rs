// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod digest;
pub mod ingest;
pub mod notify;
pub mod pipeline;
pub mod state;

// ---- Re-exports for stable public API ----
pub use crate::config::AppConfig;
pub use crate::digest::{Digest, DisplaySettings};
pub use crate::ingest::{FetchReport, ListingsApi, NormalizedListing, RawListing};
pub use crate::notify::{DeliveryError, MailSettings, MailTransport};
pub use crate::pipeline::{run_once, RunError, RunOutcome, RunReport};
pub use crate::state::{SeenIds, StateStore};
