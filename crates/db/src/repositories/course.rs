use sqlx::{sqlite::SqliteRow, Row};

use seatwise_core::domain::course::{Course, CourseId};
use seatwise_core::store::{CourseStore, StoreError};

use super::{decode_error, RepositoryError};
use crate::DbPool;

const COURSE_COLUMNS: &str = "id, title, instructor, capacity, enrolled_count,
    schedule_start, schedule_end, description, roster_version";

pub struct SqlCourseRepository {
    pool: DbPool,
}

impl SqlCourseRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {COURSE_COLUMNS} FROM course WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(course_from_row).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Course>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {COURSE_COLUMNS} FROM course ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(course_from_row).collect()
    }

    async fn upsert(&self, mut course: Course) -> Result<Course, RepositoryError> {
        if course.id.is_unassigned() {
            course.id = CourseId::generate();
        }

        // A new course starts with no roster; counts move only through `sync_enrolled_count`.
        sqlx::query(
            "INSERT INTO course (id, title, instructor, capacity, enrolled_count,
                                 schedule_start, schedule_end, description, roster_version)
             VALUES (?, ?, ?, ?, 0, ?, ?, ?, 0)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 instructor = excluded.instructor,
                 capacity = excluded.capacity,
                 schedule_start = excluded.schedule_start,
                 schedule_end = excluded.schedule_end,
                 description = excluded.description",
        )
        .bind(&course.id.0)
        .bind(&course.title)
        .bind(&course.instructor)
        .bind(i64::from(course.capacity))
        .bind(&course.schedule_start)
        .bind(&course.schedule_end)
        .bind(&course.description)
        .execute(&self.pool)
        .await?;

        self.find(&course.id)
            .await?
            .ok_or_else(|| RepositoryError::Decode(format!("course `{}` vanished after save", course.id)))
    }

    async fn remove(&self, id: &CourseId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM course WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn sync_count(
        &self,
        id: &CourseId,
        enrolled_count: u32,
        roster_version: u64,
    ) -> Result<Option<Course>, RepositoryError> {
        let roster_version = to_i64("roster_version", roster_version)?;
        sqlx::query(
            "UPDATE course SET enrolled_count = ?, roster_version = ?
             WHERE id = ? AND roster_version < ?",
        )
        .bind(i64::from(enrolled_count))
        .bind(roster_version)
        .bind(&id.0)
        .bind(roster_version)
        .execute(&self.pool)
        .await?;

        self.find(id).await
    }
}

#[async_trait::async_trait]
impl CourseStore for SqlCourseRepository {
    async fn get(&self, id: &CourseId) -> Result<Option<Course>, StoreError> {
        Ok(self.find(id).await?)
    }

    async fn list(&self) -> Result<Vec<Course>, StoreError> {
        Ok(self.find_all().await?)
    }

    async fn save(&self, course: Course) -> Result<Course, StoreError> {
        Ok(self.upsert(course).await?)
    }

    async fn delete(&self, id: &CourseId) -> Result<bool, StoreError> {
        Ok(self.remove(id).await?)
    }

    async fn sync_enrolled_count(
        &self,
        id: &CourseId,
        enrolled_count: u32,
        roster_version: u64,
    ) -> Result<Option<Course>, StoreError> {
        Ok(self.sync_count(id, enrolled_count, roster_version).await?)
    }
}

fn course_from_row(row: &SqliteRow) -> Result<Course, RepositoryError> {
    let capacity: i64 = row.try_get("capacity").map_err(decode_error)?;
    let enrolled_count: i64 = row.try_get("enrolled_count").map_err(decode_error)?;
    let roster_version: i64 = row.try_get("roster_version").map_err(decode_error)?;

    Ok(Course {
        id: CourseId(row.try_get("id").map_err(decode_error)?),
        title: row.try_get("title").map_err(decode_error)?,
        instructor: row.try_get("instructor").map_err(decode_error)?,
        capacity: u32::try_from(capacity).map_err(decode_error)?,
        enrolled_count: u32::try_from(enrolled_count).map_err(decode_error)?,
        schedule_start: row.try_get("schedule_start").map_err(decode_error)?,
        schedule_end: row.try_get("schedule_end").map_err(decode_error)?,
        description: row.try_get("description").map_err(decode_error)?,
        roster_version: u64::try_from(roster_version).map_err(decode_error)?,
    })
}

pub(crate) fn to_i64(field: &str, value: u64) -> Result<i64, RepositoryError> {
    i64::try_from(value).map_err(|_| RepositoryError::Decode(format!("{field} {value} exceeds i64")))
}
