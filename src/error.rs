//! Error taxonomy shared by the library API.
//!
//! Validation failures come from user input (table name, target columns,
//! mapping). Decode failures come from reading the spreadsheet and carry the
//! underlying library message verbatim.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Decode(String),

    #[error("load was superseded by a newer load")]
    Superseded,
}

impl ConvertError {
    pub fn validation(message: impl Into<String>) -> Self {
        ConvertError::Validation(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        ConvertError::Decode(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ConvertError::Validation(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, ConvertError::Decode(_))
    }
}

pub type ConvertResult<T> = std::result::Result<T, ConvertError>;
