//! Error types for the progress engine.

use lessonflow_core::{CourseId, LessonId, UserId};
use lessonflow_storage::StorageError;

/// Failure of an engine operation that touched storage.
///
/// The evaluator, aggregator and resolver never fail; only reads and the
/// completion mutator's writes can.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// The persistence adapter failed
    #[error("progress storage failed: {0}")]
    Persistence(#[from] StorageError),
}

/// Rejections raised by the caller layer before progress is written.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Course does not exist
    #[error("course not found: {0}")]
    CourseNotFound(CourseId),

    /// Lesson does not exist
    #[error("lesson not found: {0}")]
    LessonNotFound(LessonId),

    /// Lesson belongs to a different course
    #[error("lesson {lesson} does not belong to course {course}")]
    LessonNotInCourse {
        /// Lesson
        lesson: LessonId,
        /// Course named in the request
        course: CourseId,
    },

    /// User is not enrolled in the course
    #[error("user {user} is not enrolled in course {course}")]
    NotEnrolled {
        /// User
        user: UserId,
        /// Course
        course: CourseId,
    },

    /// Lesson is locked and completing locked lessons is disabled
    #[error("lesson {0} is locked")]
    LessonLocked(LessonId),

    /// Engine failure
    #[error(transparent)]
    Progress(#[from] ProgressError),
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        ServiceError::Progress(ProgressError::Persistence(e))
    }
}
