//! Storage layer for the service crate.
//!
//! The whole application state lives in one JSON document on disk. Every
//! access goes through [`DocumentStore`], which serializes callers behind a
//! single lock, replaces the file atomically (temp file + rename) and keeps a
//! rolling set of timestamped backups of the pre-mutation state.
//!
//! The lock is process-local: two processes pointing at the same file are not
//! coordinated.

pub mod backup;
pub mod document;
pub mod document_store;
pub mod errors;
pub mod filter;

pub use backup::BackupRotation;
pub use document::{Document, COLLECTIONS};
pub use document_store::{DeleteMode, DocumentStore, StoreOptions};
pub use errors::StoreError;
pub use models::Record;
