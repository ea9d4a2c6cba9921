use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use seatwise_core::config::AdmissionConfig;
use seatwise_core::domain::course::{Course, CourseId};
use seatwise_core::domain::enrollment::StudentId;
use seatwise_core::errors::AdmissionError;
use seatwise_core::store::{CourseStore, EnrollmentStore, StoreError};
use seatwise_core::AdmissionController;
use seatwise_db::{
    connect_with_settings, migrations, InMemoryCourseRepository, InMemoryEnrollmentRepository,
    SqlCourseRepository, SqlEnrollmentRepository,
};

type Stores = (Arc<dyn CourseStore>, Arc<dyn EnrollmentStore>);

fn memory_stores() -> Stores {
    (Arc::new(InMemoryCourseRepository::default()), Arc::new(InMemoryEnrollmentRepository::default()))
}

async fn sql_stores() -> Stores {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    (Arc::new(SqlCourseRepository::new(pool.clone())), Arc::new(SqlEnrollmentRepository::new(pool)))
}

fn student(id: &str) -> StudentId {
    StudentId(id.to_string())
}

async fn seed(courses: &Arc<dyn CourseStore>, id: &str, capacity: u32) -> CourseId {
    let course = Course::new(CourseId(id.to_string()), format!("Course {id}"), "Staff", capacity);
    courses.save(course).await.expect("seed course").id
}

async fn assert_count_matches_roster(stores: &Stores, course_id: &CourseId) {
    let (courses, enrollments) = stores;
    let course = courses.get(course_id).await.expect("get course").expect("course exists");
    let roster_size =
        enrollments.get(course_id).await.expect("get roster").map(|e| e.size()).unwrap_or(0);
    assert_eq!(course.enrolled_count, roster_size);
    assert!(course.enrolled_count <= course.capacity);
}

async fn enroll_then_reject_repeat(stores: Stores) {
    let controller = AdmissionController::with_defaults(stores.0.clone(), stores.1.clone());
    let course_id = seed(&stores.0, "algo", 2).await;

    let admitted = controller.enroll(&student("s-1"), &course_id).await.expect("admitted");
    assert!(admitted.contains(&student("s-1")));
    assert_eq!(admitted.version, 1);

    let repeat = controller.enroll(&student("s-1"), &course_id).await;
    assert_eq!(
        repeat,
        Err(AdmissionError::AlreadyEnrolled { course_id: course_id.clone(), student_id: student("s-1") })
    );
    assert_count_matches_roster(&stores, &course_id).await;
}

#[tokio::test]
async fn repeat_enrollment_is_rejected_in_memory() {
    enroll_then_reject_repeat(memory_stores()).await;
}

#[tokio::test]
async fn repeat_enrollment_is_rejected_in_sqlite() {
    enroll_then_reject_repeat(sql_stores().await).await;
}

async fn last_seat_goes_to_one_student(stores: Stores) {
    let controller = AdmissionController::with_defaults(stores.0.clone(), stores.1.clone());
    let course_id = seed(&stores.0, "os", 2).await;

    controller.enroll(&student("s-1"), &course_id).await.expect("first seat");
    controller.enroll(&student("s-2"), &course_id).await.expect("last seat");

    let full = controller.enroll(&student("s-3"), &course_id).await;
    assert_eq!(full, Err(AdmissionError::CourseFull { course_id: course_id.clone(), capacity: 2 }));

    let course = stores.0.get(&course_id).await.expect("get").expect("exists");
    assert_eq!(course.enrolled_count, 2);
    assert_eq!(course.seats_left(), 0);
}

#[tokio::test]
async fn full_course_rejects_in_memory() {
    last_seat_goes_to_one_student(memory_stores()).await;
}

#[tokio::test]
async fn full_course_rejects_in_sqlite() {
    last_seat_goes_to_one_student(sql_stores().await).await;
}

async fn cancel_frees_the_seat(stores: Stores) {
    let controller = AdmissionController::with_defaults(stores.0.clone(), stores.1.clone());
    let course_id = seed(&stores.0, "db", 1).await;

    let not_yet = controller.cancel(&student("s-1"), &course_id).await;
    assert!(matches!(not_yet, Err(AdmissionError::NotEnrolled { .. })));

    controller.enroll(&student("s-1"), &course_id).await.expect("enroll");
    let emptied = controller.cancel(&student("s-1"), &course_id).await.expect("cancel");
    assert_eq!(emptied.size(), 0);

    let roster = stores.1.get(&course_id).await.expect("get").expect("empty roster persists");
    assert_eq!(roster.size(), 0);
    assert_count_matches_roster(&stores, &course_id).await;

    controller.enroll(&student("s-2"), &course_id).await.expect("seat is free again");
    assert_count_matches_roster(&stores, &course_id).await;
}

#[tokio::test]
async fn cancel_round_trip_in_memory() {
    cancel_frees_the_seat(memory_stores()).await;
}

#[tokio::test]
async fn cancel_round_trip_in_sqlite() {
    cancel_frees_the_seat(sql_stores().await).await;
}

#[tokio::test]
async fn unknown_course_is_reported() {
    let stores = memory_stores();
    let controller = AdmissionController::with_defaults(stores.0.clone(), stores.1.clone());
    let missing = CourseId("missing".to_string());

    let result = controller.enroll(&student("s-1"), &missing).await;
    assert_eq!(result, Err(AdmissionError::CourseNotFound(missing.clone())));
    assert!(stores.1.get(&missing).await.expect("get").is_none());
}

#[tokio::test]
async fn enrollments_for_student_span_courses() {
    let stores = sql_stores().await;
    let controller = AdmissionController::with_defaults(stores.0.clone(), stores.1.clone());
    let algo = seed(&stores.0, "algo", 5).await;
    let os = seed(&stores.0, "os", 5).await;
    seed(&stores.0, "net", 5).await;

    controller.enroll(&student("s-1"), &os).await.expect("enroll os");
    controller.enroll(&student("s-1"), &algo).await.expect("enroll algo");
    controller.enroll(&student("s-2"), &algo).await.expect("enroll other student");

    let mine = controller.enrollments_for_student(&student("s-1")).await.expect("list");
    let ids = mine.iter().map(|e| e.course_id.clone()).collect::<Vec<_>>();
    assert_eq!(ids, vec![algo, os]);
}

#[tokio::test]
async fn unknown_courses_leave_no_lock_behind() {
    let stores = memory_stores();
    let controller = AdmissionController::with_defaults(stores.0.clone(), stores.1.clone());

    for index in 0..1_000 {
        let course_id = CourseId(format!("ghost-{index}"));
        let result = controller.enroll(&student("s-1"), &course_id).await;
        assert_eq!(result, Err(AdmissionError::CourseNotFound(course_id)));
    }
    let algo = seed(&stores.0, "algo", 2).await;
    controller.enroll(&student("s-1"), &algo).await.expect("enroll");
    controller.cancel(&student("s-1"), &algo).await.expect("cancel");

    assert_eq!(controller.locked_courses(), 0);
}

/// Course store whose count sync can be switched to fail.
struct FlakyCountStore {
    inner: InMemoryCourseRepository,
    fail_sync: AtomicBool,
}

#[async_trait]
impl CourseStore for FlakyCountStore {
    async fn get(&self, id: &CourseId) -> Result<Option<Course>, StoreError> {
        self.inner.get(id).await
    }

    async fn list(&self) -> Result<Vec<Course>, StoreError> {
        self.inner.list().await
    }

    async fn save(&self, course: Course) -> Result<Course, StoreError> {
        self.inner.save(course).await
    }

    async fn delete(&self, id: &CourseId) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }

    async fn sync_enrolled_count(
        &self,
        id: &CourseId,
        enrolled_count: u32,
        roster_version: u64,
    ) -> Result<Option<Course>, StoreError> {
        if self.fail_sync.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.sync_enrolled_count(id, enrolled_count, roster_version).await
    }
}

#[tokio::test]
async fn committed_enrollment_survives_a_failed_count_sync() {
    let flaky = Arc::new(FlakyCountStore {
        inner: InMemoryCourseRepository::default(),
        fail_sync: AtomicBool::new(true),
    });
    let courses: Arc<dyn CourseStore> = flaky.clone();
    let stores: Stores = (courses, Arc::new(InMemoryEnrollmentRepository::default()));
    let controller = AdmissionController::with_defaults(stores.0.clone(), stores.1.clone());
    let course_id = seed(&stores.0, "algo", 3).await;

    let first = controller.enroll(&student("s-1"), &course_id).await.expect("roster committed");
    assert!(first.contains(&student("s-1")));
    let stale = stores.0.get(&course_id).await.expect("get").expect("exists");
    assert_eq!(stale.enrolled_count, 0);

    flaky.fail_sync.store(false, Ordering::SeqCst);
    controller.enroll(&student("s-2"), &course_id).await.expect("second seat");
    assert_count_matches_roster(&stores, &course_id).await;
}

async fn oversubscribed_course(stores: Stores, controllers: usize) {
    const CAPACITY: u32 = 3;
    const APPLICANTS: usize = 12;

    let course_id = seed(&stores.0, "popular", CAPACITY).await;
    let config = AdmissionConfig { max_commit_attempts: 5 };
    let controllers = (0..controllers)
        .map(|_| Arc::new(AdmissionController::new(stores.0.clone(), stores.1.clone(), &config)))
        .collect::<Vec<_>>();

    let mut handles = Vec::with_capacity(APPLICANTS);
    for index in 0..APPLICANTS {
        let controller = controllers[index % controllers.len()].clone();
        let course_id = course_id.clone();
        handles.push(tokio::spawn(async move {
            controller.enroll(&StudentId(format!("s-{index}")), &course_id).await
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        match handle.await.expect("task joins") {
            Ok(_) => admitted += 1,
            Err(AdmissionError::CourseFull { .. }) => {}
            Err(other) => panic!("unexpected admission outcome: {other}"),
        }
    }

    assert_eq!(admitted, CAPACITY);
    assert_count_matches_roster(&stores, &course_id).await;
    let course = stores.0.get(&course_id).await.expect("get").expect("exists");
    assert_eq!(course.enrolled_count, CAPACITY);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_enrollments_respect_capacity_in_memory() {
    oversubscribed_course(memory_stores(), 1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_enrollments_respect_capacity_in_sqlite() {
    oversubscribed_course(sql_stores().await, 1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_controllers_share_capacity_through_the_store() {
    oversubscribed_course(memory_stores(), 3).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_controllers_share_capacity_in_sqlite() {
    oversubscribed_course(sql_stores().await, 3).await;
}
