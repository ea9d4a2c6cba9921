use thiserror::Error;

use crate::domain::course::CourseId;
use crate::domain::enrollment::StudentId;
use crate::store::StoreError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("course `{0}` was not found")]
    CourseNotFound(CourseId),
    #[error("student `{student_id}` is already enrolled in course `{course_id}`")]
    AlreadyEnrolled { course_id: CourseId, student_id: StudentId },
    #[error("course `{course_id}` is full (capacity {capacity})")]
    CourseFull { course_id: CourseId, capacity: u32 },
    #[error("student `{student_id}` is not enrolled in course `{course_id}`")]
    NotEnrolled { course_id: CourseId, student_id: StudentId },
    #[error("roster for course `{course_id}` kept changing after {attempts} commit attempts")]
    Contention { course_id: CourseId, attempts: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdmissionError {
    /// Recoverable, user-facing outcomes as opposed to infrastructure faults.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            Self::CourseNotFound(_)
                | Self::AlreadyEnrolled { .. }
                | Self::CourseFull { .. }
                | Self::NotEnrolled { .. }
        )
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Admission(AdmissionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<AdmissionError> for ApplicationError {
    fn from(value: AdmissionError) -> Self {
        match value {
            AdmissionError::Store(error) => Self::Persistence(error.to_string()),
            contention @ AdmissionError::Contention { .. } => {
                Self::Persistence(contention.to_string())
            }
            domain => Self::Domain(DomainError::Admission(domain)),
        }
    }
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Unauthorized { .. } => "A verified student identity is required.",
            Self::Forbidden { .. } => "This action requires an administrator.",
            Self::NotFound { .. } => "The requested course or enrollment does not exist.",
            Self::Conflict { .. } => "The enrollment request conflicts with the current roster.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Unauthorized { message, .. }
            | Self::Forbidden { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Unauthorized { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Unauthorized { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::Admission(error)) => match error {
                AdmissionError::CourseNotFound(_) => {
                    Self::NotFound { message: error.to_string(), correlation_id }
                }
                AdmissionError::AlreadyEnrolled { .. }
                | AdmissionError::CourseFull { .. }
                | AdmissionError::NotEnrolled { .. } => {
                    Self::Conflict { message: error.to_string(), correlation_id }
                }
                AdmissionError::Contention { .. } | AdmissionError::Store(_) => {
                    Self::ServiceUnavailable { message: error.to_string(), correlation_id }
                }
            },
            ApplicationError::Domain(DomainError::InvariantViolation(_)) => Self::BadRequest {
                message: "domain validation failed".to_owned(),
                correlation_id,
            },
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}
