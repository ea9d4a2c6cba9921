use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use seatwise_core::domain::course::{Course, CourseId};
use seatwise_core::domain::enrollment::StudentId;
use seatwise_core::errors::AdmissionError;
use seatwise_core::schedule::is_available;
use seatwise_core::store::CourseStore;
use seatwise_core::AdmissionController;

use crate::llm::{ToolCall, ToolDeclaration};

pub const LIST_COURSES: &str = "listCourses";
pub const GET_MY_ENROLLMENTS: &str = "getMyEnrollments";
pub const ENROLL_COURSE: &str = "enrollCourse";

/// Caller of one chat exchange.
#[derive(Clone, Debug)]
pub struct ToolContext {
    pub student_id: StudentId,
    pub correlation_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolEffect {
    None,
    Enrolled(CourseId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolOutput {
    pub payload: Value,
    pub effect: ToolEffect,
}

impl ToolOutput {
    pub fn payload(payload: Value) -> Self {
        Self { payload, effect: ToolEffect::None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::payload(json!({ "status": "error", "message": message.into() }))
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn declaration(&self) -> ToolDeclaration;
    async fn execute(&self, context: &ToolContext, input: Value) -> Result<ToolOutput>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// The three course tools backed by the given catalog and admission path.
    pub fn course_tools(courses: Arc<dyn CourseStore>, admission: Arc<AdmissionController>) -> Self {
        let mut registry = Self::default();
        registry.register(ListCoursesTool { courses: courses.clone(), admission: admission.clone() });
        registry.register(GetMyEnrollmentsTool { courses: courses.clone(), admission: admission.clone() });
        registry.register(EnrollCourseTool { courses, admission });
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Declarations in name order.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        let mut declarations = self.tools.values().map(|tool| tool.declaration()).collect::<Vec<_>>();
        declarations.sort_by(|a, b| a.name.cmp(&b.name));
        declarations
    }

    /// Never fails: unknown tools and tool errors become `{"status":"error"}` payloads.
    pub async fn execute(&self, context: &ToolContext, call: &ToolCall) -> ToolOutput {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(
                event_name = "agent.tool.unknown",
                correlation_id = %context.correlation_id,
                tool = %call.name,
                "model requested an unknown tool"
            );
            return ToolOutput::error(format!("unknown tool `{}`", call.name));
        };

        match tool.execute(context, call.arguments.clone()).await {
            Ok(output) => output,
            Err(error) => {
                warn!(
                    event_name = "agent.tool.failed",
                    correlation_id = %context.correlation_id,
                    tool = %call.name,
                    error = %error,
                    "tool execution failed"
                );
                ToolOutput::error(format!("`{}` failed, please try again later", call.name))
            }
        }
    }
}

fn course_entry(course: &Course) -> Value {
    json!({
        "id": course.id.0,
        "title": course.title,
        "instructor": course.instructor,
        "capacity": course.capacity,
        "enrolled_count": course.enrolled_count,
        "seats_left": course.seats_left(),
        "schedule_start": course.schedule_start,
        "schedule_end": course.schedule_end,
        "description": course.description,
    })
}

async fn enrolled_courses(
    courses: &dyn CourseStore,
    admission: &AdmissionController,
    student_id: &StudentId,
) -> Result<Vec<(Course, String)>> {
    let mut enrolled = Vec::new();
    for enrollment in admission.enrollments_for_student(student_id).await? {
        if let Some(course) = courses.get(&enrollment.course_id).await? {
            enrolled.push((course, enrollment.last_modified.to_rfc3339()));
        }
    }
    Ok(enrolled)
}

pub struct ListCoursesTool {
    courses: Arc<dyn CourseStore>,
    admission: Arc<AdmissionController>,
}

#[async_trait]
impl Tool for ListCoursesTool {
    fn name(&self) -> &'static str {
        LIST_COURSES
    }

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: LIST_COURSES.to_string(),
            description: "List courses the student can still enroll in: not already taken and \
                          not clashing with their current schedule."
                .to_string(),
            parameters: None,
        }
    }

    async fn execute(&self, context: &ToolContext, _input: Value) -> Result<ToolOutput> {
        let enrolled = enrolled_courses(self.courses.as_ref(), &self.admission, &context.student_id)
            .await?
            .into_iter()
            .map(|(course, _)| course)
            .collect::<Vec<_>>();

        let available = self
            .courses
            .list()
            .await?
            .iter()
            .filter(|course| is_available(course, &enrolled))
            .map(course_entry)
            .collect::<Vec<_>>();

        Ok(ToolOutput::payload(json!({ "courses": available })))
    }
}

pub struct GetMyEnrollmentsTool {
    courses: Arc<dyn CourseStore>,
    admission: Arc<AdmissionController>,
}

#[async_trait]
impl Tool for GetMyEnrollmentsTool {
    fn name(&self) -> &'static str {
        GET_MY_ENROLLMENTS
    }

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: GET_MY_ENROLLMENTS.to_string(),
            description: "List the courses the student is currently enrolled in.".to_string(),
            parameters: None,
        }
    }

    async fn execute(&self, context: &ToolContext, _input: Value) -> Result<ToolOutput> {
        // Rosters hold other students' ids; only course-level fields leave this tool.
        let enrollments = enrolled_courses(self.courses.as_ref(), &self.admission, &context.student_id)
            .await?
            .into_iter()
            .map(|(course, last_modified)| {
                json!({
                    "course_id": course.id.0,
                    "title": course.title,
                    "last_modified": last_modified,
                })
            })
            .collect::<Vec<_>>();

        Ok(ToolOutput::payload(json!({ "enrollments": enrollments })))
    }
}

pub struct EnrollCourseTool {
    courses: Arc<dyn CourseStore>,
    admission: Arc<AdmissionController>,
}

#[async_trait]
impl Tool for EnrollCourseTool {
    fn name(&self) -> &'static str {
        ENROLL_COURSE
    }

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: ENROLL_COURSE.to_string(),
            description: "Enroll the student in one course by its id.".to_string(),
            parameters: Some(json!({
                "type": "object",
                "properties": {
                    "courseId": {
                        "type": "string",
                        "description": "The `id` of a course returned by listCourses."
                    }
                },
                "required": ["courseId"]
            })),
        }
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Result<ToolOutput> {
        let Some(course_id) = input
            .get("courseId")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
        else {
            return Ok(ToolOutput::payload(json!({
                "status": "invalid_arguments",
                "message": "enrollCourse needs a non-empty string `courseId`.",
            })));
        };
        let course_id = CourseId(course_id.to_string());

        let outcome = self.admission.enroll(&context.student_id, &course_id).await;
        let output = match outcome {
            Ok(enrollment) => {
                let title = self
                    .courses
                    .get(&course_id)
                    .await
                    .ok()
                    .flatten()
                    .map(|course| course.title)
                    .unwrap_or_else(|| course_id.0.clone());
                ToolOutput {
                    payload: json!({
                        "status": "success",
                        "message": format!("Enrolled in {title}."),
                        "courseId": course_id.0,
                        "title": title,
                        "enrolledCount": enrollment.size(),
                    }),
                    effect: ToolEffect::Enrolled(course_id),
                }
            }
            Err(error) => {
                let message = if error.is_domain() {
                    error.to_string()
                } else {
                    warn!(
                        event_name = "agent.tool.enroll_failed",
                        correlation_id = %context.correlation_id,
                        course_id = %course_id,
                        error = %error,
                        "enrollment failed on an infrastructure fault"
                    );
                    "Enrollment is temporarily unavailable, please try again later.".to_string()
                };
                ToolOutput::payload(json!({
                    "status": enroll_status(&error),
                    "message": message,
                    "courseId": course_id.0,
                }))
            }
        };
        Ok(output)
    }
}

fn enroll_status(error: &AdmissionError) -> &'static str {
    match error {
        AdmissionError::AlreadyEnrolled { .. } => "already_enrolled",
        AdmissionError::CourseFull { .. } => "course_full",
        AdmissionError::CourseNotFound(_) => "not_found",
        AdmissionError::NotEnrolled { .. }
        | AdmissionError::Contention { .. }
        | AdmissionError::Store(_) => "error",
    }
}
