//! Listings: CRUD, public search, tour editing and admin moderation.

pub mod search;
pub mod service;
mod tour;

pub use search::{PropertyFilter, SearchQuery, SortOrder};
pub use service::{OwnerStats, PropertyService};
