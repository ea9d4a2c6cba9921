//! Enrollment by keyword and title when the model never reached for a tool.
//!
//! Matching runs over the unfiltered catalog in catalog order and the first
//! title that is a substring of the message (or contains it) wins.

use std::sync::Arc;

use tracing::{info, warn};

use seatwise_core::domain::course::{Course, CourseId};
use seatwise_core::domain::enrollment::StudentId;
use seatwise_core::errors::AdmissionError;
use seatwise_core::store::CourseStore;
use seatwise_core::AdmissionController;

const ENROLLMENT_KEYWORDS: &[&str] =
    &["enroll", "register", "signmeup", "signup", "수강신청", "신청", "등록"];
const SUGGESTION_LIMIT: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FallbackOutcome {
    pub reply: String,
    pub enrolled: Option<CourseId>,
}

impl FallbackOutcome {
    fn reply(reply: impl Into<String>) -> Self {
        Self { reply: reply.into(), enrolled: None }
    }
}

pub struct FallbackMatcher {
    courses: Arc<dyn CourseStore>,
    admission: Arc<AdmissionController>,
}

/// Drops all whitespace and lowercases.
pub fn normalize(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_lowercase).collect()
}

pub fn has_enrollment_intent(message: &str) -> bool {
    let normalized = normalize(message);
    ENROLLMENT_KEYWORDS.iter().any(|keyword| normalized.contains(keyword))
}

pub fn match_course<'a>(message: &str, catalog: &'a [Course]) -> Option<&'a Course> {
    let message = normalize(message);
    catalog.iter().find(|course| {
        let title = normalize(&course.title);
        !title.is_empty() && (message.contains(&title) || title.contains(&message))
    })
}

impl FallbackMatcher {
    pub fn new(courses: Arc<dyn CourseStore>, admission: Arc<AdmissionController>) -> Self {
        Self { courses, admission }
    }

    pub async fn resolve(
        &self,
        student_id: &StudentId,
        message: &str,
        correlation_id: &str,
    ) -> FallbackOutcome {
        let catalog = match self.courses.list().await {
            Ok(catalog) => catalog,
            Err(error) => {
                warn!(
                    event_name = "agent.fallback.catalog_failed",
                    correlation_id,
                    error = %error,
                    "could not load catalog for fallback matching"
                );
                return FallbackOutcome::reply(
                    "Sorry, I could not load the course list right now. Please try again later.",
                );
            }
        };

        let Some(course) = match_course(message, &catalog) else {
            info!(event_name = "agent.fallback.no_match", correlation_id, "no course title matched");
            return FallbackOutcome::reply(suggestions(&catalog));
        };

        info!(
            event_name = "agent.fallback.matched",
            correlation_id,
            course_id = %course.id,
            student_id = %student_id,
            "enrolling matched course"
        );
        let title = &course.title;
        match self.admission.enroll(student_id, &course.id).await {
            Ok(_) => FallbackOutcome {
                reply: format!("Done! You are now enrolled in {title}."),
                enrolled: Some(course.id.clone()),
            },
            Err(AdmissionError::AlreadyEnrolled { .. }) => {
                FallbackOutcome::reply(format!("You are already enrolled in {title}."))
            }
            Err(AdmissionError::CourseFull { .. }) => {
                FallbackOutcome::reply(format!("Sorry, {title} is already full."))
            }
            Err(error) => {
                warn!(
                    event_name = "agent.fallback.enroll_failed",
                    correlation_id,
                    course_id = %course.id,
                    error = %error,
                    "fallback enrollment failed"
                );
                FallbackOutcome::reply(format!(
                    "Sorry, I could not enroll you in {title}. Please try again later."
                ))
            }
        }
    }
}

fn suggestions(catalog: &[Course]) -> String {
    let titles = catalog
        .iter()
        .map(|course| course.title.trim())
        .filter(|title| !title.is_empty())
        .take(SUGGESTION_LIMIT)
        .collect::<Vec<_>>();

    if titles.is_empty() {
        return "There are no courses open for enrollment right now.".to_string();
    }
    format!(
        "I could not tell which course you meant. Try one of these: {}.",
        titles.join(", ")
    )
}
