//! # Search Buddy
//!
//! Batch bibliographic metadata extraction and positionality statement
//! detection for folders of scholarly PDFs.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Document, MetadataRecord, PositionalityResult, OutputRecord)
//! - [`pipeline`]: Metadata resolver, section locator, positionality detector and the batch runner
//! - [`sources`]: Bibliographic registries (CrossRef, DataCite) behind a trait
//! - [`reasoning`]: Hosted LLM client used by the fallback detection passes
//! - [`output`]: CSV, JSON and table writers
//! - [`utils`]: HTTP client, retry, PDF text source and text helpers
//! - [`config`]: Configuration management

pub mod config;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod reasoning;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{Document, MetadataRecord, OutputRecord, PositionalityResult};
pub use pipeline::{BatchReport, Pipeline, PipelineError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
