pub mod admission;
pub mod config;
pub mod domain;
pub mod errors;
pub mod schedule;
pub mod store;

pub use admission::{AdmissionController, CapacityLedger};
pub use domain::course::{Course, CourseId};
pub use domain::enrollment::{Enrollment, StudentId};
pub use errors::{AdmissionError, ApplicationError, DomainError, InterfaceError};
pub use schedule::{conflicts, is_available, ScheduleParseError};
pub use store::{CourseStore, EnrollmentStore, StoreError};
