//! Admission control: capacity-safe, idempotent enrollment and cancellation.
//!
//! The roster is authoritative. A course's `enrolled_count` is synced from
//! the committed roster size, tagged with the roster version it came from.

pub mod ledger;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AdmissionConfig;
use crate::domain::course::{Course, CourseId};
use crate::domain::enrollment::{Enrollment, StudentId};
use crate::errors::AdmissionError;
use crate::store::{CourseStore, EnrollmentStore, StoreError};

pub use ledger::CapacityLedger;

pub struct AdmissionController {
    courses: Arc<dyn CourseStore>,
    ledger: CapacityLedger,
    max_commit_attempts: u32,
}

impl AdmissionController {
    pub fn new(
        courses: Arc<dyn CourseStore>,
        enrollments: Arc<dyn EnrollmentStore>,
        config: &AdmissionConfig,
    ) -> Self {
        Self {
            courses,
            ledger: CapacityLedger::new(enrollments),
            max_commit_attempts: config.max_commit_attempts.max(1),
        }
    }

    pub fn with_defaults(
        courses: Arc<dyn CourseStore>,
        enrollments: Arc<dyn EnrollmentStore>,
    ) -> Self {
        Self::new(courses, enrollments, &AdmissionConfig::default())
    }

    pub async fn enroll(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<Enrollment, AdmissionError> {
        self.require_course(course_id).await?;
        let _guard = self.ledger.lock(course_id).await;

        for attempt in 1..=self.max_commit_attempts {
            let course = self.require_course(course_id).await?;
            let current = self.ledger.roster(course_id).await?;

            if current.contains(student_id) {
                return Err(rejected(
                    "admission.enroll.rejected",
                    AdmissionError::AlreadyEnrolled {
                        course_id: course_id.clone(),
                        student_id: student_id.clone(),
                    },
                ));
            }
            if current.size() >= course.capacity {
                return Err(rejected(
                    "admission.enroll.rejected",
                    AdmissionError::CourseFull {
                        course_id: course_id.clone(),
                        capacity: course.capacity,
                    },
                ));
            }

            match self.ledger.commit(current.with_student(student_id.clone())).await {
                Ok(committed) => {
                    self.sync_count(&committed).await;
                    info!(
                        event_name = "admission.enroll.accepted",
                        course_id = %course_id,
                        student_id = %student_id,
                        enrolled_count = committed.size(),
                        capacity = course.capacity,
                        roster_version = committed.version,
                        "student admitted to course"
                    );
                    return Ok(committed);
                }
                Err(StoreError::VersionConflict { .. }) => {
                    warn!(
                        event_name = "admission.enroll.conflict_retry",
                        course_id = %course_id,
                        student_id = %student_id,
                        attempt,
                        "roster changed concurrently, re-validating"
                    );
                }
                Err(error) => return Err(error.into()),
            }
        }

        Err(AdmissionError::Contention {
            course_id: course_id.clone(),
            attempts: self.max_commit_attempts,
        })
    }

    pub async fn cancel(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<Enrollment, AdmissionError> {
        self.require_course(course_id).await?;
        let _guard = self.ledger.lock(course_id).await;

        for attempt in 1..=self.max_commit_attempts {
            self.require_course(course_id).await?;
            let current = self.ledger.roster(course_id).await?;

            if !current.contains(student_id) {
                return Err(rejected(
                    "admission.cancel.rejected",
                    AdmissionError::NotEnrolled {
                        course_id: course_id.clone(),
                        student_id: student_id.clone(),
                    },
                ));
            }

            match self.ledger.commit(current.without_student(student_id)).await {
                Ok(committed) => {
                    self.sync_count(&committed).await;
                    info!(
                        event_name = "admission.cancel.accepted",
                        course_id = %course_id,
                        student_id = %student_id,
                        enrolled_count = committed.size(),
                        roster_version = committed.version,
                        "student removed from course"
                    );
                    return Ok(committed);
                }
                Err(StoreError::VersionConflict { .. }) => {
                    warn!(
                        event_name = "admission.cancel.conflict_retry",
                        course_id = %course_id,
                        student_id = %student_id,
                        attempt,
                        "roster changed concurrently, re-validating"
                    );
                }
                Err(error) => return Err(error.into()),
            }
        }

        Err(AdmissionError::Contention {
            course_id: course_id.clone(),
            attempts: self.max_commit_attempts,
        })
    }

    pub fn locked_courses(&self) -> usize {
        self.ledger.locked_courses()
    }

    pub async fn enrollments_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<Enrollment>, AdmissionError> {
        Ok(self.ledger.rosters_for_student(student_id).await?)
    }

    async fn require_course(&self, course_id: &CourseId) -> Result<Course, AdmissionError> {
        match self.courses.get(course_id).await? {
            Some(course) => Ok(course),
            None => Err(rejected(
                "admission.course_not_found",
                AdmissionError::CourseNotFound(course_id.clone()),
            )),
        }
    }

    /// The roster is already committed here, so a failed count write is logged
    /// and left for the next mutation of the course to heal.
    async fn sync_count(&self, committed: &Enrollment) {
        match self
            .courses
            .sync_enrolled_count(&committed.course_id, committed.size(), committed.version)
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => warn!(
                event_name = "admission.sync_count.course_missing",
                course_id = %committed.course_id,
                "course disappeared after roster commit"
            ),
            Err(error) => warn!(
                event_name = "admission.sync_count.failed",
                course_id = %committed.course_id,
                roster_version = committed.version,
                error = %error,
                "enrolled count not updated after roster commit"
            ),
        }
    }
}

fn rejected(event_name: &'static str, error: AdmissionError) -> AdmissionError {
    info!(event_name, reason = %error, "admission request rejected");
    error
}
