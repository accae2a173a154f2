//! Completion mutator - the only writer of lesson progress.
//!
//! Both operations are unconditional single-row upserts. Enrollment and
//! lesson/course membership are checked by the caller before these run.

use std::sync::Arc;
use lessonflow_core::{CourseId, LessonId, LessonProgress, UserId};
use lessonflow_storage::Storage;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::ProgressError;

/// Marks lessons complete or incomplete.
pub struct CompletionMutator<S: Storage> {
    storage: Arc<Mutex<S>>,
}

impl<S: Storage> Clone for CompletionMutator<S> {
    fn clone(&self) -> Self {
        Self { storage: Arc::clone(&self.storage) }
    }
}

impl<S: Storage> CompletionMutator<S> {
    /// Create a mutator over shared storage.
    pub fn new(storage: Arc<Mutex<S>>) -> Self {
        Self { storage }
    }

    /// Transition the pair to `Complete`, stamping `completed_at` with now.
    ///
    /// Repeating the call leaves the row complete; the timestamp moves to
    /// the latest call.
    pub async fn mark_complete(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
    ) -> Result<LessonProgress, ProgressError> {
        self.write(user_id, lesson_id, course_id, true).await
    }

    /// Transition the pair to `Incomplete`, clearing `completed_at`.
    ///
    /// Creates an incomplete row when none exists.
    pub async fn mark_incomplete(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
    ) -> Result<LessonProgress, ProgressError> {
        self.write(user_id, lesson_id, course_id, false).await
    }

    /// Set completion to `completed`.
    pub async fn set_completed(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
        completed: bool,
    ) -> Result<LessonProgress, ProgressError> {
        self.write(user_id, lesson_id, course_id, completed).await
    }

    async fn write(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
        completed: bool,
    ) -> Result<LessonProgress, ProgressError> {
        let completed_at = completed.then(chrono::Utc::now);

        let result = self
            .storage
            .lock()
            .await
            .upsert_progress(user_id, lesson_id, course_id, completed, completed_at)
            .await;

        match result {
            Ok(record) => {
                info!(
                    user = %user_id,
                    lesson = %lesson_id,
                    course = %course_id,
                    state = ?record.state(),
                    "Lesson progress updated"
                );
                Ok(record)
            }
            Err(e) => {
                error!(user = %user_id, lesson = %lesson_id, error = %e, "Failed to write lesson progress");
                Err(ProgressError::Persistence(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStorage;
    use lessonflow_core::ProgressState;

    fn mutator(storage: MemoryStorage) -> (Arc<Mutex<MemoryStorage>>, CompletionMutator<MemoryStorage>) {
        let shared = Arc::new(Mutex::new(storage));
        (shared.clone(), CompletionMutator::new(shared))
    }

    #[tokio::test]
    async fn test_mark_complete_sets_timestamp() {
        let (storage, mutator) = mutator(MemoryStorage::default());
        let (user, lesson, course) = (UserId::new(), LessonId::new(), CourseId::new());

        let record = mutator.mark_complete(user, lesson, course).await.unwrap();

        assert_eq!(record.state(), ProgressState::Complete);
        assert!(record.completed_at.is_some());
        let stored = storage.lock().await.load_progress(user, lesson).await.unwrap().unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_mark_complete_twice_is_idempotent() {
        let (storage, mutator) = mutator(MemoryStorage::default());
        let (user, lesson, course) = (UserId::new(), LessonId::new(), CourseId::new());

        mutator.mark_complete(user, lesson, course).await.unwrap();
        mutator.mark_complete(user, lesson, course).await.unwrap();

        let guard = storage.lock().await;
        let row = guard.load_progress(user, lesson).await.unwrap().unwrap();
        assert!(row.completed);
        assert_eq!(guard.progress_rows(), 1);
        let set = guard.fetch_completion_set(user, course).await.unwrap();
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_mark_incomplete_twice_is_idempotent() {
        let (storage, mutator) = mutator(MemoryStorage::default());
        let (user, lesson, course) = (UserId::new(), LessonId::new(), CourseId::new());

        mutator.mark_complete(user, lesson, course).await.unwrap();
        mutator.mark_incomplete(user, lesson, course).await.unwrap();
        mutator.mark_incomplete(user, lesson, course).await.unwrap();

        let row = storage.lock().await.load_progress(user, lesson).await.unwrap().unwrap();
        assert!(!row.completed);
        assert!(row.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_mark_incomplete_without_row_creates_one() {
        let (storage, mutator) = mutator(MemoryStorage::default());
        let (user, lesson, course) = (UserId::new(), LessonId::new(), CourseId::new());

        let record = mutator.mark_incomplete(user, lesson, course).await.unwrap();

        assert_eq!(record.state(), ProgressState::Incomplete);
        let guard = storage.lock().await;
        assert_eq!(guard.progress_rows(), 1);
        assert!(guard.fetch_completion_set(user, course).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_freely_reversible() {
        let (_storage, mutator) = mutator(MemoryStorage::default());
        let (user, lesson, course) = (UserId::new(), LessonId::new(), CourseId::new());

        for _ in 0..3 {
            let on = mutator.set_completed(user, lesson, course, true).await.unwrap();
            assert_eq!(on.state(), ProgressState::Complete);
            let off = mutator.set_completed(user, lesson, course, false).await.unwrap();
            assert_eq!(off.state(), ProgressState::Incomplete);
        }
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_and_writes_nothing() {
        let (storage, mutator) = mutator(MemoryStorage::failing());
        let (user, lesson, course) = (UserId::new(), LessonId::new(), CourseId::new());

        let err = mutator.mark_complete(user, lesson, course).await.unwrap_err();

        assert!(matches!(err, ProgressError::Persistence(_)));
        assert_eq!(storage.lock().await.progress_rows(), 0);
    }
}
