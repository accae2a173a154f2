//! Storage trait abstraction.

use async_trait::async_trait;
use lessonflow_core::{
    CompletionSet, Course, CourseId, Enrollment, Lesson, LessonId, LessonProgress, Module,
    Time, UserId,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database error
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Persistence adapter for courses, enrollments and lesson progress.
///
/// Backends own relational integrity. The progress engine only reads the
/// catalog and upserts single progress rows through this trait.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Course operations ===

    /// Save a course (create or update).
    async fn save_course(&mut self, course: &Course) -> Result<()>;

    /// Load a course by ID.
    async fn load_course(&self, id: CourseId) -> Result<Option<Course>>;

    /// List all courses.
    async fn list_courses(&self) -> Result<Vec<Course>>;

    // === Module operations ===

    /// Save a module (create or update).
    async fn save_module(&mut self, module: &Module) -> Result<()>;

    /// List a course's modules ordered by `order_index`.
    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<Module>>;

    // === Lesson operations ===

    /// Save a lesson (create or update).
    async fn save_lesson(&mut self, lesson: &Lesson) -> Result<()>;

    /// Load a lesson by ID.
    async fn load_lesson(&self, id: LessonId) -> Result<Option<Lesson>>;

    /// List a course's lessons in course order (`order_index` ascending).
    async fn fetch_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>>;

    // === Enrollment operations ===

    /// Save an enrollment.
    async fn save_enrollment(&mut self, enrollment: &Enrollment) -> Result<()>;

    /// Whether the user is enrolled in the course.
    async fn fetch_enrollment(&self, user_id: UserId, course_id: CourseId) -> Result<bool>;

    // === Progress operations ===

    /// Load the progress row for a (user, lesson) pair.
    async fn load_progress(&self, user_id: UserId, lesson_id: LessonId)
        -> Result<Option<LessonProgress>>;

    /// Lessons of the course the user has completed.
    async fn fetch_completion_set(&self, user_id: UserId, course_id: CourseId)
        -> Result<CompletionSet>;

    /// Insert or overwrite the progress row keyed by (user, lesson).
    ///
    /// The write is unconditional and atomic for the single row, so
    /// concurrent writes for the same key resolve last-write-wins.
    async fn upsert_progress(
        &mut self,
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
        completed: bool,
        completed_at: Option<Time>,
    ) -> Result<LessonProgress>;
}
