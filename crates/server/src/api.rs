//! JSON API for the course catalog, enrollments and the chat assistant.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use seatwise_agent::{ChatAssistant, ChatReply};
use seatwise_core::domain::course::{Course, CourseId};
use seatwise_core::domain::enrollment::{Enrollment, StudentId};
use seatwise_core::errors::{ApplicationError, InterfaceError};
use seatwise_core::store::CourseStore;
use seatwise_core::AdmissionController;

use crate::identity::{IdentityError, IdentityVerifier};

#[derive(Clone)]
pub struct ApiState {
    pub courses: Arc<dyn CourseStore>,
    pub admission: Arc<AdmissionController>,
    pub assistant: Arc<ChatAssistant>,
    pub identity: Arc<dyn IdentityVerifier>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub correlation_id: String,
}

pub type ApiError = (StatusCode, Json<ApiErrorBody>);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CourseResponse {
    #[serde(flatten)]
    pub course: Course,
    pub seats_left: u32,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        let seats_left = course.seats_left();
        Self { course, seats_left }
    }
}

/// Admin payload for creating a course. Counts are never accepted from callers.
#[derive(Clone, Debug, Deserialize)]
pub struct CourseRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub instructor: String,
    pub capacity: u32,
    #[serde(default)]
    pub schedule_start: Option<String>,
    #[serde(default)]
    pub schedule_end: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CourseRequest {
    fn into_course(self) -> Course {
        let id = self.id.map(|id| id.trim().to_string()).unwrap_or_default();
        let mut course = Course::new(CourseId(id), self.title, self.instructor, self.capacity);
        course.schedule_start = self.schedule_start;
        course.schedule_end = self.schedule_end;
        course.description = self.description;
        course
    }
}

/// Partial admin update; absent fields keep their stored value.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub instructor: Option<String>,
    pub capacity: Option<u32>,
    pub schedule_start: Option<String>,
    pub schedule_end: Option<String>,
    pub description: Option<String>,
}

impl CourseUpdate {
    fn apply(self, mut course: Course) -> Course {
        if let Some(title) = self.title {
            course.title = title;
        }
        if let Some(instructor) = self.instructor {
            course.instructor = instructor;
        }
        if let Some(capacity) = self.capacity {
            course.capacity = capacity;
        }
        if let Some(start) = self.schedule_start {
            course.schedule_start = Some(start);
        }
        if let Some(end) = self.schedule_end {
            course.schedule_end = Some(end);
        }
        if let Some(description) = self.description {
            course.description = Some(description);
        }
        course
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct EnrollRequest {
    pub course_id: String,
}

/// Roster summary for the caller. Other students' ids are never included.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnrollmentResponse {
    pub course_id: String,
    pub enrolled: bool,
    pub enrolled_count: u32,
    pub last_modified: String,
}

impl EnrollmentResponse {
    fn for_student(enrollment: &Enrollment, student_id: &StudentId) -> Self {
        Self {
            course_id: enrollment.course_id.0.clone(),
            enrolled: enrollment.contains(student_id),
            enrolled_count: enrollment.size(),
            last_modified: enrollment.last_modified.to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MyEnrollment {
    pub course_id: String,
    pub title: Option<String>,
    pub last_modified: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/courses", get(list_courses).post(create_course))
        .route("/api/courses/{id}", get(get_course).put(update_course).delete(delete_course))
        .route("/api/enrollments", post(enroll))
        .route("/api/enrollments/me", get(my_enrollments))
        .route("/api/enrollments/{course_id}", delete(cancel))
        .route("/api/agent/chat", post(chat))
        .with_state(state)
}

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

fn api_error(error: InterfaceError) -> ApiError {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!(
            event_name = "api.request.failed",
            correlation_id = %error.correlation_id(),
            status = status.as_u16(),
            error = %error,
            "request failed"
        );
    }
    // Domain outcomes carry their own explanation; faults get the generic message.
    let message = if status.is_client_error() {
        error.message().to_string()
    } else {
        error.user_message().to_string()
    };
    (status, Json(ApiErrorBody { error: message, correlation_id: error.correlation_id().to_string() }))
}

fn application_error(error: impl Into<ApplicationError>, correlation_id: &str) -> ApiError {
    api_error(error.into().into_interface(correlation_id))
}

fn bad_request(message: &str, correlation_id: &str) -> ApiError {
    api_error(InterfaceError::BadRequest {
        message: message.to_string(),
        correlation_id: correlation_id.to_string(),
    })
}

fn caller(state: &ApiState, headers: &HeaderMap, correlation_id: &str) -> Result<StudentId, ApiError> {
    state.identity.verify(headers).map_err(|error| {
        api_error(InterfaceError::Unauthorized {
            message: error.to_string(),
            correlation_id: correlation_id.to_string(),
        })
    })
}

fn admin(state: &ApiState, headers: &HeaderMap, correlation_id: &str) -> Result<StudentId, ApiError> {
    state.identity.verify_admin(headers).map_err(|error| {
        let message = error.to_string();
        let correlation_id = correlation_id.to_string();
        api_error(match error {
            IdentityError::NotAdmin(_) => InterfaceError::Forbidden { message, correlation_id },
            _ => InterfaceError::Unauthorized { message, correlation_id },
        })
    })
}

fn course_not_found(course_id: &CourseId, correlation_id: String) -> ApiError {
    api_error(InterfaceError::NotFound {
        message: format!("course `{course_id}` was not found"),
        correlation_id,
    })
}

fn validated(course: Course, correlation_id: &str) -> Result<Course, ApiError> {
    course.validate().map_err(|violation| bad_request(&violation.to_string(), correlation_id))?;
    Ok(course)
}

pub async fn list_courses(
    State(state): State<ApiState>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let correlation_id = correlation_id();
    let courses = state.courses.list().await.map_err(|error| application_error(error, &correlation_id))?;
    Ok(Json(courses.into_iter().map(CourseResponse::from).collect()))
}

pub async fn get_course(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<CourseResponse>, ApiError> {
    let correlation_id = correlation_id();
    let course_id = CourseId(id);
    match state.courses.get(&course_id).await {
        Ok(Some(course)) => Ok(Json(course.into())),
        Ok(None) => Err(course_not_found(&course_id, correlation_id)),
        Err(error) => Err(application_error(error, &correlation_id)),
    }
}

pub async fn create_course(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<CourseRequest>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    let correlation_id = correlation_id();
    let admin_id = admin(&state, &headers, &correlation_id)?;
    let course = validated(request.into_course(), &correlation_id)?;

    if !course.id.is_unassigned() {
        let existing =
            state.courses.get(&course.id).await.map_err(|error| application_error(error, &correlation_id))?;
        if existing.is_some() {
            return Err(api_error(InterfaceError::Conflict {
                message: format!("course `{}` already exists", course.id),
                correlation_id,
            }));
        }
    }

    let saved = state.courses.save(course).await.map_err(|error| application_error(error, &correlation_id))?;
    info!(
        event_name = "api.course.created",
        correlation_id = %correlation_id,
        course_id = %saved.id,
        admin_id = %admin_id,
        "course created"
    );
    Ok((StatusCode::CREATED, Json(saved.into())))
}

pub async fn update_course(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<CourseUpdate>,
) -> Result<Json<CourseResponse>, ApiError> {
    let correlation_id = correlation_id();
    let admin_id = admin(&state, &headers, &correlation_id)?;
    let course_id = CourseId(id);

    let Some(current) =
        state.courses.get(&course_id).await.map_err(|error| application_error(error, &correlation_id))?
    else {
        return Err(course_not_found(&course_id, correlation_id));
    };
    // Validated against the stored count, so capacity cannot drop below current enrollment.
    let course = validated(update.apply(current), &correlation_id)?;

    let saved = state.courses.save(course).await.map_err(|error| application_error(error, &correlation_id))?;
    info!(
        event_name = "api.course.updated",
        correlation_id = %correlation_id,
        course_id = %saved.id,
        admin_id = %admin_id,
        "course updated"
    );
    Ok(Json(saved.into()))
}

pub async fn delete_course(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let correlation_id = correlation_id();
    let admin_id = admin(&state, &headers, &correlation_id)?;
    let course_id = CourseId(id);

    let removed =
        state.courses.delete(&course_id).await.map_err(|error| application_error(error, &correlation_id))?;
    if !removed {
        return Err(course_not_found(&course_id, correlation_id));
    }
    info!(
        event_name = "api.course.deleted",
        correlation_id = %correlation_id,
        course_id = %course_id,
        admin_id = %admin_id,
        "course deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

pub async fn enroll(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<EnrollRequest>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError> {
    let correlation_id = correlation_id();
    let student_id = caller(&state, &headers, &correlation_id)?;
    let course_id = request.course_id.trim();
    if course_id.is_empty() {
        return Err(bad_request("course_id must not be empty", &correlation_id));
    }
    let course_id = CourseId(course_id.to_string());

    let enrollment = state
        .admission
        .enroll(&student_id, &course_id)
        .await
        .map_err(|error| application_error(error, &correlation_id))?;

    info!(
        event_name = "api.enrollment.created",
        correlation_id = %correlation_id,
        course_id = %course_id,
        student_id = %student_id,
        "enrollment created"
    );
    Ok((StatusCode::CREATED, Json(EnrollmentResponse::for_student(&enrollment, &student_id))))
}

pub async fn cancel(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(course_id): Path<String>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let correlation_id = correlation_id();
    let student_id = caller(&state, &headers, &correlation_id)?;
    let course_id = CourseId(course_id);

    let enrollment = state
        .admission
        .cancel(&student_id, &course_id)
        .await
        .map_err(|error| application_error(error, &correlation_id))?;

    info!(
        event_name = "api.enrollment.cancelled",
        correlation_id = %correlation_id,
        course_id = %course_id,
        student_id = %student_id,
        "enrollment cancelled"
    );
    Ok(Json(EnrollmentResponse::for_student(&enrollment, &student_id)))
}

pub async fn my_enrollments(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Vec<MyEnrollment>>, ApiError> {
    let correlation_id = correlation_id();
    let student_id = caller(&state, &headers, &correlation_id)?;

    let enrollments = state
        .admission
        .enrollments_for_student(&student_id)
        .await
        .map_err(|error| application_error(error, &correlation_id))?;

    let mut mine = Vec::with_capacity(enrollments.len());
    for enrollment in enrollments {
        let title = state
            .courses
            .get(&enrollment.course_id)
            .await
            .map_err(|error| application_error(error, &correlation_id))?
            .map(|course| course.title);
        mine.push(MyEnrollment {
            course_id: enrollment.course_id.0,
            title,
            last_modified: enrollment.last_modified.to_rfc3339(),
        });
    }
    Ok(Json(mine))
}

pub async fn chat(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let correlation_id = correlation_id();
    let student_id = caller(&state, &headers, &correlation_id)?;
    if request.message.trim().is_empty() {
        return Err(bad_request("message must not be empty", &correlation_id));
    }

    Ok(Json(state.assistant.chat(&student_id, &request.message).await))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use axum::Json;

    use seatwise_agent::{
        ChatAssistant, LanguageModel, LlmError, Message, ModelTurn, ToolChoice, ToolDeclaration,
    };
    use seatwise_core::config::AppConfig;
    use seatwise_core::domain::course::{Course, CourseId};
    use seatwise_core::AdmissionController;
    use seatwise_db::{InMemoryCourseRepository, InMemoryEnrollmentRepository};

    use super::{
        cancel, chat, create_course, delete_course, enroll, get_course, list_courses,
        my_enrollments, update_course, ApiState, ChatRequest, CourseRequest, CourseUpdate,
        EnrollRequest,
    };
    use crate::identity::GatewayHeaderVerifier;

    struct Echo;

    #[async_trait]
    impl LanguageModel for Echo {
        async fn complete(
            &self,
            _history: &[Message],
            _tools: &[ToolDeclaration],
            _tool_choice: ToolChoice,
        ) -> Result<ModelTurn, LlmError> {
            Ok(ModelTurn::text("Happy to help."))
        }
    }

    fn state_with(assistant: impl FnOnce(&ApiState) -> ChatAssistant) -> ApiState {
        let courses = Arc::new(InMemoryCourseRepository::with_courses([
            Course::new(CourseId("algo".to_string()), "Algorithms", "Knuth", 1),
            Course::new(CourseId("db".to_string()), "Databases", "Codd", 10),
        ]));
        let admission = Arc::new(AdmissionController::with_defaults(
            courses.clone(),
            Arc::new(InMemoryEnrollmentRepository::default()),
        ));
        let mut state = ApiState {
            courses,
            admission,
            assistant: Arc::new(ChatAssistant::Unavailable { reason: "not configured".to_string() }),
            identity: Arc::new(
                GatewayHeaderVerifier::new("x-student-id", "x-user-role").expect("valid headers"),
            ),
        };
        state.assistant = Arc::new(assistant(&state));
        state
    }

    fn state() -> ApiState {
        state_with(|state| {
            ChatAssistant::with_model(Arc::new(Echo), state.courses.clone(), state.admission.clone())
        })
    }

    fn student(id: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-student-id", HeaderValue::from_static(id));
        headers
    }

    fn admin_user() -> HeaderMap {
        let mut headers = student("u-admin");
        headers.insert("x-user-role", HeaderValue::from_static("admin"));
        headers
    }

    fn course_body(id: Option<&str>, title: &str, capacity: u32) -> Json<CourseRequest> {
        Json(CourseRequest {
            id: id.map(str::to_string),
            title: title.to_string(),
            instructor: "Dijkstra".to_string(),
            capacity,
            schedule_start: Some("Tue 13:00".to_string()),
            schedule_end: Some("Tue 14:30".to_string()),
            description: None,
        })
    }

    fn enroll_body(course_id: &str) -> Json<EnrollRequest> {
        Json(EnrollRequest { course_id: course_id.to_string() })
    }

    #[tokio::test]
    async fn lists_and_fetches_courses() {
        let state = state();

        let Json(courses) = list_courses(State(state.clone())).await.expect("list");
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].course.id.0, "algo");
        assert_eq!(courses[0].seats_left, 1);

        let missing = get_course(State(state), Path("nope".to_string())).await;
        let (status, Json(body)) = missing.expect_err("missing course");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.correlation_id.is_empty());
    }

    #[tokio::test]
    async fn enrollment_requires_identity() {
        let result = enroll(State(state()), HeaderMap::new(), enroll_body("algo")).await;
        let (status, _) = result.expect_err("no identity");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn enroll_maps_domain_outcomes_to_statuses() {
        let state = state();

        let (status, Json(created)) =
            enroll(State(state.clone()), student("s-1"), enroll_body("algo")).await.expect("enroll");
        assert_eq!(status, StatusCode::CREATED);
        assert!(created.enrolled);
        assert_eq!(created.enrolled_count, 1);

        let repeat = enroll(State(state.clone()), student("s-1"), enroll_body("algo")).await;
        assert_eq!(repeat.expect_err("repeat").0, StatusCode::CONFLICT);

        let full = enroll(State(state.clone()), student("s-2"), enroll_body("algo")).await;
        let (status, Json(body)) = full.expect_err("full");
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.error.contains("full"));

        let missing = enroll(State(state.clone()), student("s-2"), enroll_body("nope")).await;
        assert_eq!(missing.expect_err("missing").0, StatusCode::NOT_FOUND);

        let blank = enroll(State(state), student("s-2"), enroll_body("  ")).await;
        assert_eq!(blank.expect_err("blank").0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cancel_and_list_my_enrollments() {
        let state = state();
        enroll(State(state.clone()), student("s-1"), enroll_body("db")).await.expect("enroll db");
        enroll(State(state.clone()), student("s-1"), enroll_body("algo")).await.expect("enroll algo");

        let Json(mine) = my_enrollments(State(state.clone()), student("s-1")).await.expect("mine");
        let ids = mine.iter().map(|e| e.course_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["algo", "db"]);
        assert_eq!(mine[0].title.as_deref(), Some("Algorithms"));

        let Json(cancelled) =
            cancel(State(state.clone()), student("s-1"), Path("algo".to_string())).await.expect("cancel");
        assert!(!cancelled.enrolled);
        assert_eq!(cancelled.enrolled_count, 0);

        let again = cancel(State(state.clone()), student("s-1"), Path("algo".to_string())).await;
        assert_eq!(again.expect_err("not enrolled").0, StatusCode::CONFLICT);

        let Json(mine) = my_enrollments(State(state), student("s-1")).await.expect("mine");
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn chat_returns_assistant_reply() {
        let Json(reply) = chat(
            State(state()),
            student("s-1"),
            Json(ChatRequest { message: "hello".to_string() }),
        )
        .await
        .expect("chat");
        assert_eq!(reply.response, "Happy to help.");

        let blank = chat(
            State(state()),
            student("s-1"),
            Json(ChatRequest { message: " ".to_string() }),
        )
        .await;
        assert_eq!(blank.expect_err("blank").0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unconfigured_assistant_still_answers() {
        let state = state_with(|state| {
            ChatAssistant::from_config(
                &AppConfig::default().llm,
                state.courses.clone(),
                state.admission.clone(),
            )
        });

        let Json(reply) = chat(
            State(state),
            student("s-1"),
            Json(ChatRequest { message: "list courses".to_string() }),
        )
        .await
        .expect("chat");
        assert_eq!(reply.response, seatwise_agent::assistant::UNAVAILABLE_REPLY);
    }

    #[tokio::test]
    async fn course_management_is_admin_only() {
        let state = state();

        let anonymous =
            create_course(State(state.clone()), HeaderMap::new(), course_body(None, "Graphs", 5))
                .await;
        assert_eq!(anonymous.expect_err("no identity").0, StatusCode::UNAUTHORIZED);

        let as_student =
            create_course(State(state.clone()), student("s-1"), course_body(None, "Graphs", 5))
                .await;
        assert_eq!(as_student.expect_err("not admin").0, StatusCode::FORBIDDEN);

        let update = update_course(
            State(state.clone()),
            student("s-1"),
            Path("algo".to_string()),
            Json(CourseUpdate::default()),
        )
        .await;
        assert_eq!(update.expect_err("not admin").0, StatusCode::FORBIDDEN);

        let removal =
            delete_course(State(state.clone()), student("s-1"), Path("algo".to_string())).await;
        assert_eq!(removal.expect_err("not admin").0, StatusCode::FORBIDDEN);

        let Json(courses) = list_courses(State(state)).await.expect("list");
        assert_eq!(courses.len(), 2);
    }

    #[tokio::test]
    async fn admin_creates_validated_courses() {
        let state = state();

        let (status, Json(created)) =
            create_course(State(state.clone()), admin_user(), course_body(None, "Graphs", 5))
                .await
                .expect("create");
        assert_eq!(status, StatusCode::CREATED);
        assert!(!created.course.id.is_unassigned());
        assert_eq!(created.course.enrolled_count, 0);
        assert_eq!(created.seats_left, 5);

        let blank =
            create_course(State(state.clone()), admin_user(), course_body(None, "  ", 5)).await;
        let (status, Json(body)) = blank.expect_err("blank title");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("title"));

        let empty =
            create_course(State(state.clone()), admin_user(), course_body(None, "Graphs", 0)).await;
        assert_eq!(empty.expect_err("zero capacity").0, StatusCode::BAD_REQUEST);

        let duplicate =
            create_course(State(state.clone()), admin_user(), course_body(Some("algo"), "Again", 5))
                .await;
        assert_eq!(duplicate.expect_err("duplicate id").0, StatusCode::CONFLICT);

        let Json(courses) = list_courses(State(state)).await.expect("list");
        assert_eq!(courses.len(), 3);
    }

    #[tokio::test]
    async fn admin_update_keeps_enrollment_and_guards_capacity() {
        let state = state();
        enroll(State(state.clone()), student("s-1"), enroll_body("db")).await.expect("enroll");
        enroll(State(state.clone()), student("s-2"), enroll_body("db")).await.expect("enroll");

        let Json(updated) = update_course(
            State(state.clone()),
            admin_user(),
            Path("db".to_string()),
            Json(CourseUpdate {
                title: Some("Database Systems".to_string()),
                capacity: Some(4),
                ..CourseUpdate::default()
            }),
        )
        .await
        .expect("update");
        assert_eq!(updated.course.title, "Database Systems");
        assert_eq!(updated.course.instructor, "Codd");
        assert_eq!(updated.course.enrolled_count, 2);
        assert_eq!(updated.seats_left, 2);

        let shrink = update_course(
            State(state.clone()),
            admin_user(),
            Path("db".to_string()),
            Json(CourseUpdate { capacity: Some(1), ..CourseUpdate::default() }),
        )
        .await;
        assert_eq!(shrink.expect_err("below enrollment").0, StatusCode::BAD_REQUEST);

        let missing = update_course(
            State(state),
            admin_user(),
            Path("nope".to_string()),
            Json(CourseUpdate::default()),
        )
        .await;
        assert_eq!(missing.expect_err("missing").0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_deletes_courses() {
        let state = state();

        let status = delete_course(State(state.clone()), admin_user(), Path("algo".to_string()))
            .await
            .expect("delete");
        assert_eq!(status, StatusCode::NO_CONTENT);

        let again =
            delete_course(State(state.clone()), admin_user(), Path("algo".to_string())).await;
        assert_eq!(again.expect_err("already gone").0, StatusCode::NOT_FOUND);

        let enroll_gone = enroll(State(state), student("s-1"), enroll_body("algo")).await;
        assert_eq!(enroll_gone.expect_err("deleted course").0, StatusCode::NOT_FOUND);
    }
}
