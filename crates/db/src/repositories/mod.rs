use thiserror::Error;

use seatwise_core::store::StoreError;

pub mod course;
pub mod enrollment;
pub mod memory;

pub use course::SqlCourseRepository;
pub use enrollment::SqlEnrollmentRepository;
pub use memory::{InMemoryCourseRepository, InMemoryEnrollmentRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => StoreError::Backend(error.to_string()),
            RepositoryError::Decode(message) => StoreError::Decode(message),
        }
    }
}

pub(crate) fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
