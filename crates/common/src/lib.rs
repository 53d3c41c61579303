//! Cross-cutting helpers shared by every crate in the workspace:
//! logging setup, runtime environment checks, timestamps and small wire types.

pub mod env;
pub mod time;
pub mod types;
pub mod utils;
