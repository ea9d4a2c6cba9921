use std::collections::BTreeMap;

use tokio::sync::RwLock;

use seatwise_core::domain::course::{Course, CourseId};
use seatwise_core::domain::enrollment::{Enrollment, StudentId};
use seatwise_core::store::{CourseStore, EnrollmentStore, StoreError};

#[derive(Default)]
pub struct InMemoryCourseRepository {
    courses: RwLock<BTreeMap<CourseId, Course>>,
}

impl InMemoryCourseRepository {
    pub fn with_courses(courses: impl IntoIterator<Item = Course>) -> Self {
        let courses = courses
            .into_iter()
            .map(|mut course| {
                course.enrolled_count = 0;
                course.roster_version = 0;
                (course.id.clone(), course)
            })
            .collect();
        Self { courses: RwLock::new(courses) }
    }
}

#[async_trait::async_trait]
impl CourseStore for InMemoryCourseRepository {
    async fn get(&self, id: &CourseId) -> Result<Option<Course>, StoreError> {
        let courses = self.courses.read().await;
        Ok(courses.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Course>, StoreError> {
        let courses = self.courses.read().await;
        Ok(courses.values().cloned().collect())
    }

    async fn save(&self, mut course: Course) -> Result<Course, StoreError> {
        if course.id.is_unassigned() {
            course.id = CourseId::generate();
        }

        let mut courses = self.courses.write().await;
        let (enrolled_count, roster_version) = courses
            .get(&course.id)
            .map(|existing| (existing.enrolled_count, existing.roster_version))
            .unwrap_or((0, 0));
        course.enrolled_count = enrolled_count;
        course.roster_version = roster_version;
        courses.insert(course.id.clone(), course.clone());
        Ok(course)
    }

    async fn delete(&self, id: &CourseId) -> Result<bool, StoreError> {
        let mut courses = self.courses.write().await;
        Ok(courses.remove(id).is_some())
    }

    async fn sync_enrolled_count(
        &self,
        id: &CourseId,
        enrolled_count: u32,
        roster_version: u64,
    ) -> Result<Option<Course>, StoreError> {
        let mut courses = self.courses.write().await;
        let Some(course) = courses.get_mut(id) else {
            return Ok(None);
        };
        if roster_version > course.roster_version {
            course.enrolled_count = enrolled_count;
            course.roster_version = roster_version;
        }
        Ok(Some(course.clone()))
    }
}

#[derive(Default)]
pub struct InMemoryEnrollmentRepository {
    enrollments: RwLock<BTreeMap<CourseId, Enrollment>>,
}

#[async_trait::async_trait]
impl EnrollmentStore for InMemoryEnrollmentRepository {
    async fn get(&self, course_id: &CourseId) -> Result<Option<Enrollment>, StoreError> {
        let enrollments = self.enrollments.read().await;
        Ok(enrollments.get(course_id).cloned())
    }

    async fn save(&self, mut enrollment: Enrollment) -> Result<Enrollment, StoreError> {
        let mut enrollments = self.enrollments.write().await;
        enrollment.version =
            enrollments.get(&enrollment.course_id).map_or(1, |stored| stored.version + 1);
        enrollments.insert(enrollment.course_id.clone(), enrollment.clone());
        Ok(enrollment)
    }

    async fn compare_and_swap(
        &self,
        mut enrollment: Enrollment,
        expected_version: Option<u64>,
    ) -> Result<Enrollment, StoreError> {
        let mut enrollments = self.enrollments.write().await;
        let stored_version = enrollments.get(&enrollment.course_id).map(|stored| stored.version);
        if stored_version != expected_version {
            return Err(StoreError::VersionConflict {
                course_id: enrollment.course_id,
                expected: expected_version,
            });
        }

        enrollment.version = expected_version.map_or(1, |version| version + 1);
        enrollments.insert(enrollment.course_id.clone(), enrollment.clone());
        Ok(enrollment)
    }

    async fn get_by_student(&self, student_id: &StudentId) -> Result<Vec<Enrollment>, StoreError> {
        let enrollments = self.enrollments.read().await;
        Ok(enrollments.values().filter(|e| e.contains(student_id)).cloned().collect())
    }
}
