use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::{Row, Sqlite, Transaction};

use seatwise_core::domain::course::CourseId;
use seatwise_core::domain::enrollment::{Enrollment, StudentId};
use seatwise_core::store::{EnrollmentStore, StoreError};

use super::course::to_i64;
use super::{decode_error, RepositoryError};
use crate::DbPool;

/// Rosters are split over `enrollment` (version and timestamp) and
/// `enrollment_student` (one row per admitted student). Every write replaces
/// the student rows inside the transaction that advances the version.
pub struct SqlEnrollmentRepository {
    pool: DbPool,
}

enum Write {
    Swap(Option<u64>),
    Overwrite,
}

impl SqlEnrollmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find(&self, course_id: &CourseId) -> Result<Option<Enrollment>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let enrollment = read_roster(&mut tx, course_id).await?;
        tx.commit().await?;
        Ok(enrollment)
    }

    async fn find_by_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<Enrollment>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(
            "SELECT DISTINCT course_id FROM enrollment_student
             WHERE student_id = ? ORDER BY course_id ASC",
        )
        .bind(&student_id.0)
        .fetch_all(&mut *tx)
        .await?;

        let mut enrollments = Vec::with_capacity(rows.len());
        for row in rows {
            let course_id = CourseId(row.try_get("course_id").map_err(decode_error)?);
            if let Some(enrollment) = read_roster(&mut tx, &course_id).await? {
                enrollments.push(enrollment);
            }
        }
        tx.commit().await?;
        Ok(enrollments)
    }

    /// `Ok(None)` means the expected version did not match and nothing was written.
    async fn write(
        &self,
        mut enrollment: Enrollment,
        mode: Write,
    ) -> Result<Option<Enrollment>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let last_modified = enrollment.last_modified.to_rfc3339();

        let next_version = match mode {
            Write::Swap(None) => {
                let inserted = sqlx::query(
                    "INSERT INTO enrollment (course_id, version, last_modified) VALUES (?, 1, ?)
                     ON CONFLICT(course_id) DO NOTHING",
                )
                .bind(&enrollment.course_id.0)
                .bind(&last_modified)
                .execute(&mut *tx)
                .await?;
                if inserted.rows_affected() == 0 {
                    tx.rollback().await?;
                    return Ok(None);
                }
                1
            }
            Write::Swap(Some(expected)) => {
                let next = expected.saturating_add(1);
                let updated = sqlx::query(
                    "UPDATE enrollment SET version = ?, last_modified = ?
                     WHERE course_id = ? AND version = ?",
                )
                .bind(to_i64("version", next)?)
                .bind(&last_modified)
                .bind(&enrollment.course_id.0)
                .bind(to_i64("version", expected)?)
                .execute(&mut *tx)
                .await?;
                if updated.rows_affected() == 0 {
                    tx.rollback().await?;
                    return Ok(None);
                }
                next
            }
            Write::Overwrite => {
                let row = sqlx::query(
                    "INSERT INTO enrollment (course_id, version, last_modified) VALUES (?, 1, ?)
                     ON CONFLICT(course_id) DO UPDATE SET
                         version = enrollment.version + 1,
                         last_modified = excluded.last_modified
                     RETURNING version",
                )
                .bind(&enrollment.course_id.0)
                .bind(&last_modified)
                .fetch_one(&mut *tx)
                .await?;
                let version: i64 = row.try_get("version").map_err(decode_error)?;
                u64::try_from(version).map_err(decode_error)?
            }
        };

        replace_students(&mut tx, &enrollment).await?;
        tx.commit().await?;

        enrollment.version = next_version;
        Ok(Some(enrollment))
    }
}

/// Header and student rows are read inside the caller's transaction so a
/// concurrent commit cannot pair one version with another version's students.
async fn read_roster(
    tx: &mut Transaction<'_, Sqlite>,
    course_id: &CourseId,
) -> Result<Option<Enrollment>, RepositoryError> {
    let header = sqlx::query("SELECT version, last_modified FROM enrollment WHERE course_id = ?")
        .bind(&course_id.0)
        .fetch_optional(&mut **tx)
        .await?;
    let Some(header) = header else {
        return Ok(None);
    };

    let version: i64 = header.try_get("version").map_err(decode_error)?;
    let last_modified: String = header.try_get("last_modified").map_err(decode_error)?;

    let students = sqlx::query(
        "SELECT student_id FROM enrollment_student WHERE course_id = ? ORDER BY student_id ASC",
    )
    .bind(&course_id.0)
    .fetch_all(&mut **tx)
    .await?;

    let roster = students
        .iter()
        .map(|row| row.try_get::<String, _>("student_id").map(StudentId).map_err(decode_error))
        .collect::<Result<BTreeSet<_>, _>>()?;

    Ok(Some(Enrollment {
        course_id: course_id.clone(),
        roster,
        last_modified: parse_timestamp(&last_modified)?,
        version: u64::try_from(version).map_err(decode_error)?,
    }))
}

async fn replace_students(
    tx: &mut Transaction<'_, Sqlite>,
    enrollment: &Enrollment,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM enrollment_student WHERE course_id = ?")
        .bind(&enrollment.course_id.0)
        .execute(&mut **tx)
        .await?;

    for student in &enrollment.roster {
        sqlx::query("INSERT INTO enrollment_student (course_id, student_id) VALUES (?, ?)")
            .bind(&enrollment.course_id.0)
            .bind(&student.0)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw).map(|value| value.with_timezone(&Utc)).map_err(decode_error)
}

#[async_trait::async_trait]
impl EnrollmentStore for SqlEnrollmentRepository {
    async fn get(&self, course_id: &CourseId) -> Result<Option<Enrollment>, StoreError> {
        Ok(self.find(course_id).await?)
    }

    async fn save(&self, enrollment: Enrollment) -> Result<Enrollment, StoreError> {
        let course_id = enrollment.course_id.clone();
        self.write(enrollment, Write::Overwrite)
            .await?
            .ok_or(StoreError::VersionConflict { course_id, expected: None })
    }

    async fn compare_and_swap(
        &self,
        enrollment: Enrollment,
        expected_version: Option<u64>,
    ) -> Result<Enrollment, StoreError> {
        let course_id = enrollment.course_id.clone();
        self.write(enrollment, Write::Swap(expected_version))
            .await?
            .ok_or(StoreError::VersionConflict { course_id, expected: expected_version })
    }

    async fn get_by_student(&self, student_id: &StudentId) -> Result<Vec<Enrollment>, StoreError> {
        Ok(self.find_by_student(student_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::Utc;
    use seatwise_core::domain::course::CourseId;
    use seatwise_core::domain::enrollment::{Enrollment, StudentId};
    use seatwise_core::store::{EnrollmentStore, StoreError};

    use super::SqlEnrollmentRepository;
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlEnrollmentRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlEnrollmentRepository::new(pool)
    }

    fn student(id: &str) -> StudentId {
        StudentId(id.to_string())
    }

    #[tokio::test]
    async fn first_swap_creates_version_one() {
        let repo = repository().await;
        let course_id = CourseId("algo".to_string());

        let roster = Enrollment::empty(course_id.clone()).with_student(student("s-2"));
        let committed = repo.compare_and_swap(roster, None).await.expect("first commit");
        assert_eq!(committed.version, 1);

        let loaded = repo.get(&course_id).await.expect("get").expect("roster exists");
        assert_eq!(loaded.version, 1);
        assert!(loaded.contains(&student("s-2")));
        assert_eq!(loaded.last_modified, committed.last_modified);
    }

    #[tokio::test]
    async fn stale_version_is_rejected_without_writing() {
        let repo = repository().await;
        let course_id = CourseId("algo".to_string());

        let base = Enrollment::empty(course_id.clone());
        repo.compare_and_swap(base.with_student(student("s-1")), None).await.expect("v1");

        let stale = repo.compare_and_swap(base.with_student(student("s-9")), None).await;
        assert_eq!(
            stale,
            Err(StoreError::VersionConflict { course_id: course_id.clone(), expected: None })
        );

        let current = repo.get(&course_id).await.expect("get").expect("roster exists");
        let next = repo
            .compare_and_swap(current.with_student(student("s-2")), Some(1))
            .await
            .expect("v2");
        assert_eq!(next.version, 2);

        let conflict = repo.compare_and_swap(current.with_student(student("s-3")), Some(1)).await;
        assert!(matches!(conflict, Err(StoreError::VersionConflict { expected: Some(1), .. })));

        let loaded = repo.get(&course_id).await.expect("get").expect("roster exists");
        assert_eq!(loaded.size(), 2);
        assert!(!loaded.contains(&student("s-3")));
        assert!(!loaded.contains(&student("s-9")));
    }

    #[tokio::test]
    async fn emptied_roster_is_kept() {
        let repo = repository().await;
        let course_id = CourseId("algo".to_string());

        let one = repo
            .compare_and_swap(Enrollment::empty(course_id.clone()).with_student(student("s-1")), None)
            .await
            .expect("v1");
        repo.compare_and_swap(one.without_student(&student("s-1")), Some(1)).await.expect("v2");

        let loaded = repo.get(&course_id).await.expect("get").expect("roster still exists");
        assert_eq!(loaded.size(), 0);
        assert_eq!(loaded.version, 2);
    }

    #[tokio::test]
    async fn save_advances_the_version() {
        let repo = repository().await;
        let course_id = CourseId("algo".to_string());

        let first = repo.save(Enrollment::empty(course_id.clone())).await.expect("save");
        assert_eq!(first.version, 1);
        let second = repo.save(first.with_student(student("s-1"))).await.expect("save again");
        assert_eq!(second.version, 2);

        let conflict = repo.compare_and_swap(first.with_student(student("s-2")), Some(1)).await;
        assert!(matches!(conflict, Err(StoreError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn lists_rosters_for_a_student_in_course_order() {
        let repo = repository().await;
        for id in ["os", "algo", "db"] {
            let mut roster = Enrollment::empty(CourseId(id.to_string()));
            if id != "db" {
                roster = roster.with_student(student("s-1"));
            }
            repo.compare_and_swap(roster.with_student(student("s-2")), None).await.expect("commit");
        }

        let mine = repo.get_by_student(&student("s-1")).await.expect("by student");
        let ids = mine.iter().map(|e| e.course_id.0.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["algo", "os"]);
        assert!(repo.get_by_student(&student("nobody")).await.expect("by student").is_empty());
    }

    fn versioned_roster(course_id: &CourseId, version: u64) -> Enrollment {
        Enrollment {
            course_id: course_id.clone(),
            roster: BTreeSet::from([student(&format!("v-{version}"))]),
            last_modified: Utc::now(),
            version,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_a_half_written_roster() {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("rosters.db").display());
        let pool = connect_with_settings(&url, 4, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = Arc::new(SqlEnrollmentRepository::new(pool.clone()));
        let course_id = CourseId("algo".to_string());

        // The roster written at version `v` holds exactly student `v-{v}`.
        repo.compare_and_swap(versioned_roster(&course_id, 1), None).await.expect("v1");

        let writer = {
            let repo = repo.clone();
            let course_id = course_id.clone();
            tokio::spawn(async move {
                for version in 1..=60 {
                    repo.compare_and_swap(versioned_roster(&course_id, version + 1), Some(version))
                        .await
                        .expect("writer commit");
                }
            })
        };

        loop {
            let finished = writer.is_finished();
            let loaded = repo.get(&course_id).await.expect("get").expect("roster exists");
            let expected = student(&format!("v-{}", loaded.version));
            assert_eq!(loaded.roster, BTreeSet::from([expected.clone()]));

            for enrollment in repo.get_by_student(&expected).await.expect("by student") {
                let holder = student(&format!("v-{}", enrollment.version));
                assert_eq!(enrollment.roster, BTreeSet::from([holder]));
            }
            if finished {
                break;
            }
        }
        writer.await.expect("writer joins");
        pool.close().await;
    }
}
