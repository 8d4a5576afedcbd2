//! Store Error Types
//!
//! Errors raised by the persistence layer. Sync handlers never surface these;
//! they classify and log them (see [`StoreError::is_not_found`]).

use thiserror::Error;

/// Errors from the chat/contact/message store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// True for the benign "target row does not exist" outcome that
    /// update, receipt and reaction handlers expect under event races.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("row".to_string()),
            other => Self::Database(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_other_errors_are_not_benign() {
        let err = StoreError::Migration("bad schema".into());
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Migration error: bad schema");
    }
}
