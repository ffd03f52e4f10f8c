//! Collection metadata persistence for the AI-OPS knowledge base.
//!
//! This crate provides a trait-based metadata store with a JSON-file
//! implementation: one human-readable record per collection, keyed by title.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;

pub use trait_::{LoadFailure, LoadReport, MetadataStore, Result, StorageError};
pub use json_storage::{record_file_name, JsonMetadataStore};
