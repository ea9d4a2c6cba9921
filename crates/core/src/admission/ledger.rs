use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::course::CourseId;
use crate::domain::enrollment::{Enrollment, StudentId};
use crate::store::{EnrollmentStore, StoreError};

/// One async mutex per course id. Different courses never contend. An entry
/// lives only while a writer holds or waits for it.
#[derive(Default)]
struct CourseLocks {
    locks: SyncMutex<HashMap<CourseId, Arc<Mutex<()>>>>,
}

impl CourseLocks {
    async fn acquire(&self, course_id: &CourseId) -> CourseGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(course_id.clone()).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        CourseGuard { locks: self, course_id: course_id.clone(), guard: Some(guard) }
    }

    fn release(&self, course_id: &CourseId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(course_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(course_id);
        }
    }

    fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Single-writer permit for one course, released on drop.
pub struct CourseGuard<'a> {
    locks: &'a CourseLocks,
    course_id: CourseId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CourseGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.release(&self.course_id);
    }
}

/// Owns the rosters and the single-writer discipline per course.
///
/// Writers hold [`CapacityLedger::lock`] for the whole read-validate-commit
/// sequence; the commit itself is a compare-and-swap against the version that
/// was read, so writers outside this process are caught as well.
pub struct CapacityLedger {
    enrollments: Arc<dyn EnrollmentStore>,
    locks: CourseLocks,
}

impl CapacityLedger {
    pub fn new(enrollments: Arc<dyn EnrollmentStore>) -> Self {
        Self { enrollments, locks: CourseLocks::default() }
    }

    pub async fn lock(&self, course_id: &CourseId) -> CourseGuard<'_> {
        self.locks.acquire(course_id).await
    }

    /// Courses with a writer holding or waiting for their lock.
    pub fn locked_courses(&self) -> usize {
        self.locks.tracked()
    }

    /// Persisted roster, or an unpersisted empty one for a course nobody joined yet.
    pub async fn roster(&self, course_id: &CourseId) -> Result<Enrollment, StoreError> {
        Ok(self
            .enrollments
            .get(course_id)
            .await?
            .unwrap_or_else(|| Enrollment::empty(course_id.clone())))
    }

    /// Writes `next` if the stored roster is still at the version `next` was derived from.
    pub async fn commit(&self, next: Enrollment) -> Result<Enrollment, StoreError> {
        let expected_version = next.expected_version();
        self.enrollments.compare_and_swap(next, expected_version).await
    }

    pub async fn rosters_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<Enrollment>, StoreError> {
        self.enrollments.get_by_student(student_id).await
    }
}
