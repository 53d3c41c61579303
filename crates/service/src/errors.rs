use thiserror::Error;

use crate::storage::StoreError;

/// Errors returned by the listing, user, site and admin services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self {
        Self::NotFound(format!("{entity} not found"))
    }

    pub fn forbidden(action: &str) -> Self {
        Self::Forbidden(format!("not allowed to {action}"))
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 2001,
            ServiceError::NotFound(_) => 2003,
            ServiceError::Conflict(_) => 2002,
            ServiceError::Forbidden(_) => 2005,
            ServiceError::Model(models::errors::ModelError::Validation(_)) => 2001,
            ServiceError::Model(models::errors::ModelError::Malformed(_)) => 2101,
            ServiceError::Store(_) => 2200,
        }
    }
}
