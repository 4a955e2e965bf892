use thiserror::Error;

/// Input that breaks a domain rule before any repository is consulted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("`{value}` is not a boolean value")]
    InvalidFlag { value: String },
}
