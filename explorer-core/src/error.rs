//! Error types for Explorer Core

use thiserror::Error;

/// Core errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid mint position: {0}")]
    InvalidPosition(String),

    #[error("Invalid peer id: {0}")]
    InvalidPeerId(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
