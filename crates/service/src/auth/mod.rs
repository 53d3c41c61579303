//! Auth module: domain types, errors and the account service.
//!
//! Accounts live in the `users` collection of the document store; passwords
//! are Argon2 hashes and sessions are HS256 JWTs.

pub mod domain;
pub mod errors;
pub mod service;

pub use domain::{AuthSession, Claims, LoginInput, RegisterInput};
pub use errors::AuthError;
pub use service::{AuthService, AuthSettings};
