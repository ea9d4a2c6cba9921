//! Persistence contracts consumed by the admission engine.
//!
//! Implementations live in `seatwise-db`. Both traits are mandatory in full:
//! the roster query by student is part of the contract, not an optional
//! capability a caller has to check for.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::course::{Course, CourseId};
use crate::domain::enrollment::{Enrollment, StudentId};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("roster for course `{course_id}` changed concurrently (expected version {expected:?})")]
    VersionConflict { course_id: CourseId, expected: Option<u64> },
    #[error("store backend failure: {0}")]
    Backend(String),
    #[error("malformed persisted data: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn get(&self, id: &CourseId) -> Result<Option<Course>, StoreError>;

    /// Full catalog ordered by course id.
    async fn list(&self) -> Result<Vec<Course>, StoreError>;

    /// Upserts the course. An unassigned id receives a generated one. A new
    /// course starts with `enrolled_count` and `roster_version` at 0, an existing
    /// one keeps its values; those move only through
    /// [`CourseStore::sync_enrolled_count`].
    async fn save(&self, course: Course) -> Result<Course, StoreError>;

    async fn delete(&self, id: &CourseId) -> Result<bool, StoreError>;

    /// Records `enrolled_count` derived from roster `roster_version`. Applied
    /// only when `roster_version` is newer than the one already stored, so
    /// writers finishing out of order cannot regress the count. Returns the
    /// stored course, or `None` when the course no longer exists.
    async fn sync_enrolled_count(
        &self,
        id: &CourseId,
        enrolled_count: u32,
        roster_version: u64,
    ) -> Result<Option<Course>, StoreError>;
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn get(&self, course_id: &CourseId) -> Result<Option<Enrollment>, StoreError>;

    /// Unconditional upsert. The stored version still advances (to one past
    /// the previous version, or 1), so concurrent compare-and-swap writers
    /// observe the overwrite as a conflict.
    async fn save(&self, enrollment: Enrollment) -> Result<Enrollment, StoreError>;

    /// Atomically replaces the roster when the stored version equals
    /// `expected_version` (`None`: no roster may exist yet). The returned
    /// enrollment carries the new version. A mismatch yields
    /// [`StoreError::VersionConflict`] and leaves the store untouched.
    async fn compare_and_swap(
        &self,
        enrollment: Enrollment,
        expected_version: Option<u64>,
    ) -> Result<Enrollment, StoreError>;

    /// Every roster containing `student_id`, ordered by course id.
    async fn get_by_student(&self, student_id: &StudentId) -> Result<Vec<Enrollment>, StoreError>;
}
