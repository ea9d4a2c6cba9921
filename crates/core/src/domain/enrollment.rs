use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::course::CourseId;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Roster of one course. There is exactly one per course and it is never
/// deleted, an empty roster is a valid state after cancellations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub course_id: CourseId,
    pub roster: BTreeSet<StudentId>,
    pub last_modified: DateTime<Utc>,
    /// Optimistic-concurrency token; 0 until first persisted.
    pub version: u64,
}

impl Enrollment {
    pub fn empty(course_id: CourseId) -> Self {
        Self { course_id, roster: BTreeSet::new(), last_modified: Utc::now(), version: 0 }
    }

    pub fn contains(&self, student_id: &StudentId) -> bool {
        self.roster.contains(student_id)
    }

    pub fn size(&self) -> u32 {
        u32::try_from(self.roster.len()).unwrap_or(u32::MAX)
    }

    /// Version the store must currently hold for a compare-and-swap of this value.
    pub fn expected_version(&self) -> Option<u64> {
        (self.version > 0).then_some(self.version)
    }

    pub fn with_student(&self, student_id: StudentId) -> Self {
        let mut next = self.clone();
        next.roster.insert(student_id);
        next.last_modified = Utc::now();
        next
    }

    pub fn without_student(&self, student_id: &StudentId) -> Self {
        let mut next = self.clone();
        next.roster.remove(student_id);
        next.last_modified = Utc::now();
        next
    }
}

#[cfg(test)]
mod tests {
    use super::{Enrollment, StudentId};
    use crate::domain::course::CourseId;

    #[test]
    fn roster_keeps_students_unique() {
        let enrollment = Enrollment::empty(CourseId("c-1".to_string()))
            .with_student(StudentId("s-1".to_string()))
            .with_student(StudentId("s-1".to_string()));

        assert_eq!(enrollment.size(), 1);
    }

    #[test]
    fn unpersisted_roster_expects_absence() {
        let mut enrollment = Enrollment::empty(CourseId("c-1".to_string()));
        assert_eq!(enrollment.expected_version(), None);

        enrollment.version = 4;
        assert_eq!(enrollment.expected_version(), Some(4));
    }

    #[test]
    fn removing_last_student_leaves_empty_roster() {
        let student = StudentId("s-1".to_string());
        let enrollment = Enrollment::empty(CourseId("c-1".to_string()))
            .with_student(student.clone())
            .without_student(&student);

        assert!(enrollment.roster.is_empty());
        assert!(!enrollment.contains(&student));
    }
}
