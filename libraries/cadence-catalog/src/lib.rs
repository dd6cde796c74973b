//! Cadence Catalog Client
//!
//! HTTP client for the remote music catalog, plus the two pieces of logic
//! that sit directly on top of it.
//!
//! # Features
//!
//! - **Catalog API**: search, song lookup, playlist queues, radio
//!   continuations and stream resolution ([`HttpCatalog`], implementing
//!   `cadence_core::CatalogService`)
//! - **Share links**: resolve a shared link to the songs it points at
//! - **Search paging**: accumulate continuation pages, dropping pages that
//!   belong to a superseded query
//!
//! # Example
//!
//! ```ignore
//! use cadence_catalog::{CatalogConfig, HttpCatalog};
//! use cadence_core::SearchFilter;
//!
//! let catalog = HttpCatalog::new(CatalogConfig::new("https://catalog.example.com"))?;
//! let page = catalog.search("daft punk", SearchFilter::Song, None).await?;
//! println!("{} results", page.items.len());
//! ```

mod client;
mod error;
pub mod pager;
mod types;
pub mod uri;

pub use client::HttpCatalog;
pub use error::{CatalogError, Result};
pub use pager::{PageOutcome, SearchPager};
pub use types::CatalogConfig;
pub use uri::{resolve_uri, ShareLink};
