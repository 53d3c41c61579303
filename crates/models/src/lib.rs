//! Typed views over the records kept in the JSON data file.
//!
//! The store itself is schema-less; these types give the service layer a
//! checked shape for users, listings, tours and site content, plus the
//! validation rules applied before anything is written.

pub mod errors;
pub mod page;
pub mod property;
pub mod record;
pub mod user;
pub mod validate;

pub use record::{from_record, to_record, Record};
