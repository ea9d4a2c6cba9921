use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CourseId(pub String);

impl CourseId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for CourseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub instructor: String,
    pub capacity: u32,
    pub enrolled_count: u32,
    #[serde(default)]
    pub schedule_start: Option<String>,
    #[serde(default)]
    pub schedule_end: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Version of the enrollment roster `enrolled_count` was derived from.
    #[serde(default)]
    pub roster_version: u64,
}

impl Course {
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        instructor: impl Into<String>,
        capacity: u32,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            instructor: instructor.into(),
            capacity,
            enrolled_count: 0,
            schedule_start: None,
            schedule_end: None,
            description: None,
            roster_version: 0,
        }
    }

    pub fn with_schedule(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.schedule_start = Some(start.into());
        self.schedule_end = Some(end.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn seats_left(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled_count)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::InvariantViolation("course title must not be empty".into()));
        }
        if self.capacity == 0 {
            return Err(DomainError::InvariantViolation(format!(
                "course `{}` capacity must be greater than zero",
                self.id
            )));
        }
        if self.enrolled_count > self.capacity {
            return Err(DomainError::InvariantViolation(format!(
                "course `{}` enrolled_count {} exceeds capacity {}",
                self.id, self.enrolled_count, self.capacity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Course, CourseId};

    #[test]
    fn rejects_zero_capacity() {
        let course = Course::new(CourseId("c-1".to_string()), "Compilers", "Aho", 0);
        assert!(course.validate().is_err());
    }

    #[test]
    fn seats_left_never_underflows() {
        let mut course = Course::new(CourseId("c-1".to_string()), "Compilers", "Aho", 2);
        course.enrolled_count = 3;
        assert_eq!(course.seats_left(), 0);
        assert!(course.validate().is_err());
    }

    #[test]
    fn generated_ids_are_assigned() {
        assert!(!CourseId::generate().is_unassigned());
        assert!(CourseId(String::new()).is_unassigned());
    }
}
