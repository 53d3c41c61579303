use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("malformed record: {0}")]
    Malformed(String),
}

impl ModelError {
    pub fn invalid(field: &str, rule: &str) -> Self {
        Self::Validation(format!("{field}: {rule}"))
    }
}
