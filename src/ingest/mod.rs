// src/ingest/mod.rs
pub mod envelope;
pub mod fetcher;
pub mod normalize;
pub mod params;
pub mod source;
pub mod types;

pub use fetcher::{fetch_all, Pager};
pub use normalize::{filter_new, normalize, normalize_all};
pub use params::{FetchSettings, FilterSettings};
pub use source::{ApiVariant, HttpListingsApi, SourceSettings};
pub use types::{FetchError, FetchPage, FetchReport, ListingsApi, NormalizedListing, RawListing};
