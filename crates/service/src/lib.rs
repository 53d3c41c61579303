//! Service layer for the 360 Emlak listing site.
//! - `storage` owns the single JSON data file (locking, atomic writes, backups).
//! - The domain services (`auth`, `users`, `properties`, `site`, `admin`) are
//!   synchronous and share one `Arc<DocumentStore>`.
//! - Typed records and validation come from the `models` crate.

pub mod admin;
pub mod auth;
pub mod errors;
pub mod pagination;
pub mod properties;
pub mod runtime;
pub mod site;
pub mod storage;
pub mod users;

pub use errors::ServiceError;
