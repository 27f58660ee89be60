//! Error types for slot-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SlotError {
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid civil time: {0}")]
    InvalidCivilTime(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
}

pub type Result<T> = std::result::Result<T, SlotError>;
