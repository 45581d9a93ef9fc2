//! Utility modules supporting the pipeline.
//!
//! - [`HttpClient`]: shared reqwest client with timeouts and a polite user agent
//! - [`TextSource`] / [`PdfTextSource`]: per-page text and embedded metadata
//! - [`with_retry`]: execute an operation with retry on transient errors
//! - [`truncate_at_word`], [`csv_escape`]: text helpers
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use search_buddy::sources::SourceError;
//! use search_buddy::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let data = with_retry(RetryConfig::default(), || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod http;
mod pdf;
mod retry;
mod text;

pub use http::{default_user_agent, HttpClient};
pub use pdf::{
    decode_pdf_string, normalize_pdf_date, parse_xmp, MemoryTextSource, PdfExtractError,
    PdfTextSource, TextSource,
};
pub use retry::{
    llm_retry_config, registry_retry_config, with_retry, RetryConfig, TransientError,
};
pub use text::{csv_escape, squash_whitespace, truncate_at_word};
