//! Core data models for documents, metadata and detection results.

mod document;
mod metadata;
mod positionality;
mod record;

pub use document::Document;
pub use metadata::{non_blank, AuthorSource, EmbeddedMetadata, MetadataRecord, RegistryResult};
pub use positionality::{Confidence, PositionalityResult, Strategy};
pub use record::OutputRecord;
