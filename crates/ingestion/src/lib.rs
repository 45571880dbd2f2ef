//! Import pipeline for the tyosis importer.
//!
//! This crate handles:
//! - Date token parsing and rendering
//! - Line decoding and stored-value encoding
//! - Streaming sources into the store with first-write verification

pub mod codec;
pub mod date;
pub mod pipeline;

pub use codec::{Decoded, RecordCodec, SkipReason};
pub use date::{DateNormalizer, DatePattern};
pub use pipeline::{check_inputs, ImportPipeline, ImportSummary, SourceState, SourceStats};
