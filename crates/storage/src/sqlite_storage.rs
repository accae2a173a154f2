//! SQLite storage backend for lessonflow.
//!
//! Relational layout with one table per entity. `lesson_progress` is keyed by
//! `(user_id, lesson_id)` and written with a single `INSERT ... ON CONFLICT`
//! statement, which makes each progress upsert atomic.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use lessonflow_core::{
    CompletionSet, Course, CourseId, Enrollment, Lesson, LessonId, LessonProgress, Module,
    Time, UserId,
};
use std::path::Path;
use std::str::FromStr;

use super::trait_::{Storage, StorageError, Result};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS courses (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        lesson_access_mode TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS modules (
        id TEXT PRIMARY KEY,
        course_id TEXT NOT NULL REFERENCES courses(id),
        title TEXT NOT NULL,
        order_index INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS lessons (
        id TEXT PRIMARY KEY,
        course_id TEXT NOT NULL REFERENCES courses(id),
        module_id TEXT NOT NULL REFERENCES modules(id),
        title TEXT NOT NULL,
        order_index INTEGER NOT NULL,
        type TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS enrollments (
        user_id TEXT NOT NULL,
        course_id TEXT NOT NULL REFERENCES courses(id),
        enrolled_at TEXT NOT NULL,
        PRIMARY KEY (user_id, course_id)
    )",
    "CREATE TABLE IF NOT EXISTS lesson_progress (
        user_id TEXT NOT NULL,
        lesson_id TEXT NOT NULL,
        course_id TEXT NOT NULL,
        completed INTEGER NOT NULL,
        completed_at TEXT,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (user_id, lesson_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_lessons_course ON lessons(course_id, order_index)",
    "CREATE INDEX IF NOT EXISTS idx_progress_user_course ON lesson_progress(user_id, course_id)",
];

/// SQLite storage implementation.
#[derive(Clone)]
pub struct SqliteStorage {
    /// Database connection pool
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Connect to a database URL such as `sqlite://lessonflow.db?mode=rwc`.
    pub async fn new(db_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(db_url).await?;

        let storage = Self { pool };
        storage.init_schema().await?;

        Ok(storage)
    }

    /// Open (or create) a database file.
    pub async fn new_from_path(path: &Path) -> Result<Self> {
        let url = format!("sqlite://{}?mode=rwc", path.display());
        Self::new(&url).await
    }

    /// Create an in-memory SQLite storage for testing.
    ///
    /// A single connection is kept so every query sees the same database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let storage = Self { pool };
        storage.init_schema().await?;

        Ok(storage)
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Check the connection.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

fn parse_id<T: FromStr>(row: &SqliteRow, column: &str) -> Result<T> {
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|_| StorageError::Other(format!("invalid id in column {}: {}", column, raw)))
}

fn parse_enum<T: FromStr>(row: &SqliteRow, column: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: T::Err| StorageError::Other(e.to_string()))
}

fn course_from_row(row: &SqliteRow) -> Result<Course> {
    Ok(Course {
        id: parse_id(row, "id")?,
        title: row.try_get("title")?,
        lesson_access_mode: parse_enum(row, "lesson_access_mode")?,
        created_at: row.try_get("created_at")?,
    })
}

fn module_from_row(row: &SqliteRow) -> Result<Module> {
    Ok(Module {
        id: parse_id(row, "id")?,
        course_id: parse_id(row, "course_id")?,
        title: row.try_get("title")?,
        order_index: row.try_get("order_index")?,
    })
}

fn lesson_from_row(row: &SqliteRow) -> Result<Lesson> {
    Ok(Lesson {
        id: parse_id(row, "id")?,
        course_id: parse_id(row, "course_id")?,
        module_id: parse_id(row, "module_id")?,
        title: row.try_get("title")?,
        order_index: row.try_get("order_index")?,
        kind: parse_enum(row, "type")?,
    })
}

fn progress_from_row(row: &SqliteRow) -> Result<LessonProgress> {
    Ok(LessonProgress {
        user_id: parse_id(row, "user_id")?,
        lesson_id: parse_id(row, "lesson_id")?,
        course_id: parse_id(row, "course_id")?,
        completed: row.try_get("completed")?,
        completed_at: row.try_get("completed_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl Storage for SqliteStorage {
    // === Course operations ===

    async fn save_course(&mut self, course: &Course) -> Result<()> {
        sqlx::query(
            "INSERT INTO courses (id, title, lesson_access_mode, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                title = excluded.title,
                lesson_access_mode = excluded.lesson_access_mode",
        )
        .bind(course.id.to_string())
        .bind(&course.title)
        .bind(course.lesson_access_mode.as_str())
        .bind(course.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_course(&self, id: CourseId) -> Result<Option<Course>> {
        let row = sqlx::query("SELECT * FROM courses WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(course_from_row).transpose()
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let rows = sqlx::query("SELECT * FROM courses ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(course_from_row).collect()
    }

    // === Module operations ===

    async fn save_module(&mut self, module: &Module) -> Result<()> {
        sqlx::query(
            "INSERT INTO modules (id, course_id, title, order_index)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                title = excluded.title,
                order_index = excluded.order_index",
        )
        .bind(module.id.to_string())
        .bind(module.course_id.to_string())
        .bind(&module.title)
        .bind(module.order_index)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<Module>> {
        let rows = sqlx::query("SELECT * FROM modules WHERE course_id = ? ORDER BY order_index, id")
            .bind(course_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(module_from_row).collect()
    }

    // === Lesson operations ===

    async fn save_lesson(&mut self, lesson: &Lesson) -> Result<()> {
        sqlx::query(
            "INSERT INTO lessons (id, course_id, module_id, title, order_index, type)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                module_id = excluded.module_id,
                title = excluded.title,
                order_index = excluded.order_index,
                type = excluded.type",
        )
        .bind(lesson.id.to_string())
        .bind(lesson.course_id.to_string())
        .bind(lesson.module_id.to_string())
        .bind(&lesson.title)
        .bind(lesson.order_index)
        .bind(lesson.kind.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_lesson(&self, id: LessonId) -> Result<Option<Lesson>> {
        let row = sqlx::query("SELECT * FROM lessons WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(lesson_from_row).transpose()
    }

    async fn fetch_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>> {
        let rows = sqlx::query("SELECT * FROM lessons WHERE course_id = ? ORDER BY order_index, id")
            .bind(course_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(lesson_from_row).collect()
    }

    // === Enrollment operations ===

    async fn save_enrollment(&mut self, enrollment: &Enrollment) -> Result<()> {
        sqlx::query(
            "INSERT INTO enrollments (user_id, course_id, enrolled_at) VALUES (?, ?, ?)
            ON CONFLICT (user_id, course_id) DO NOTHING",
        )
        .bind(enrollment.user_id.to_string())
        .bind(enrollment.course_id.to_string())
        .bind(enrollment.enrolled_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_enrollment(&self, user_id: UserId, course_id: CourseId) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM enrollments WHERE user_id = ? AND course_id = ?")
            .bind(user_id.to_string())
            .bind(course_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    // === Progress operations ===

    async fn load_progress(&self, user_id: UserId, lesson_id: LessonId)
        -> Result<Option<LessonProgress>> {
        let row = sqlx::query("SELECT * FROM lesson_progress WHERE user_id = ? AND lesson_id = ?")
            .bind(user_id.to_string())
            .bind(lesson_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(progress_from_row).transpose()
    }

    async fn fetch_completion_set(&self, user_id: UserId, course_id: CourseId)
        -> Result<CompletionSet> {
        let rows = sqlx::query(
            "SELECT lesson_id FROM lesson_progress
            WHERE user_id = ? AND course_id = ? AND completed = 1",
        )
        .bind(user_id.to_string())
        .bind(course_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| parse_id::<LessonId>(row, "lesson_id"))
            .collect()
    }

    async fn upsert_progress(
        &mut self,
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
        completed: bool,
        completed_at: Option<Time>,
    ) -> Result<LessonProgress> {
        let row = sqlx::query(
            "INSERT INTO lesson_progress
                (user_id, lesson_id, course_id, completed, completed_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, lesson_id) DO UPDATE SET
                course_id = excluded.course_id,
                completed = excluded.completed,
                completed_at = excluded.completed_at,
                updated_at = excluded.updated_at
            RETURNING *",
        )
        .bind(user_id.to_string())
        .bind(lesson_id.to_string())
        .bind(course_id.to_string())
        .bind(completed)
        .bind(completed_at)
        .bind(chrono::Utc::now())
        .fetch_one(&self.pool)
        .await?;

        progress_from_row(&row)
    }
}
