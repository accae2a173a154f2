//! Progress tracking service - the read side of the engine.
//!
//! Loads a course's catalog and one user's completion set, then runs the
//! accessibility evaluator, the aggregator and the resume resolver over it.

use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lessonflow_core::{
    CompletionSet, Course, CourseId, Lesson, LessonAccessMode, LessonId, LessonKind, Module,
    ModuleId, UserId, ViewerRole,
};
use lessonflow_storage::Storage;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::access::accessibility_map;
use crate::aggregate::{aggregate_by_module, aggregate_course_progress, CourseProgress, ModuleProgress};
use crate::resume::next_incomplete_lesson;
use crate::ProgressError;

/// Progress tracking service.
#[async_trait]
pub trait ProgressTracker: Send + Sync {
    /// Full view of a course for one viewer. `None` if the course does not exist.
    async fn course_overview(
        &self,
        user_id: UserId,
        course_id: CourseId,
        role: ViewerRole,
    ) -> Result<Option<CourseOverview>, ProgressError>;

    /// Where the viewer should continue. `None` if the course does not exist
    /// or has no lessons.
    async fn resume_point(
        &self,
        user_id: UserId,
        course_id: CourseId,
        role: ViewerRole,
    ) -> Result<Option<ResumePoint>, ProgressError>;
}

/// A course as one viewer sees it at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct CourseOverview {
    /// Course
    pub course_id: CourseId,

    /// Course title
    pub title: String,

    /// Gating policy in effect
    pub access_mode: LessonAccessMode,

    /// Modules in display order with their lessons
    pub modules: Vec<ModuleOverview>,

    /// Course-wide completion
    pub progress: CourseProgress,

    /// Resume point, ignoring accessibility
    pub next_lesson: Option<LessonId>,

    /// When the overview was computed
    pub generated_at: DateTime<Utc>,
}

impl CourseOverview {
    /// Look up a lesson's status.
    pub fn lesson(&self, lesson_id: LessonId) -> Option<&LessonStatus> {
        self.lessons().find(|l| l.lesson_id == lesson_id)
    }

    /// All lessons grouped under modules, in display order.
    pub fn lessons(&self) -> impl Iterator<Item = &LessonStatus> {
        self.modules.iter().flat_map(|m| m.lessons.iter())
    }
}

/// One module of a [`CourseOverview`].
#[derive(Debug, Clone, Serialize)]
pub struct ModuleOverview {
    /// Module
    pub module_id: ModuleId,

    /// Module title
    pub title: String,

    /// Display position
    pub order_index: i32,

    /// Completion counts
    pub progress: ModuleProgress,

    /// Lessons in course order
    pub lessons: Vec<LessonStatus>,
}

/// One lesson of a [`ModuleOverview`].
#[derive(Debug, Clone, Serialize)]
pub struct LessonStatus {
    /// Lesson
    pub lesson_id: LessonId,

    /// Lesson title
    pub title: String,

    /// Course-wide position
    pub order_index: i32,

    /// Content kind
    #[serde(rename = "type")]
    pub kind: LessonKind,

    /// Whether the viewer completed it
    pub completed: bool,

    /// Whether the viewer may open it
    pub accessible: bool,
}

/// Next lesson to open, reconciled with gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResumePoint {
    /// Next incomplete lesson (or the last lesson when all are done)
    pub lesson_id: LessonId,

    /// Whether it is currently open for the viewer
    pub accessible: bool,
}

/// Compute an overview from already-loaded data.
///
/// `lessons` must be in course order. Lessons whose module is missing from
/// `modules` still count towards course progress but are not listed.
pub fn build_overview(
    course: &Course,
    modules: &[Module],
    lessons: &[Lesson],
    completed: &CompletionSet,
    privileged: bool,
) -> CourseOverview {
    let access = accessibility_map(course.lesson_access_mode, lessons, completed, privileged);
    let by_module = aggregate_by_module(modules, lessons, completed);

    let modules = modules
        .iter()
        .zip(by_module)
        .map(|(module, (_, progress))| ModuleOverview {
            module_id: module.id,
            title: module.title.clone(),
            order_index: module.order_index,
            progress,
            lessons: lessons
                .iter()
                .zip(&access)
                .filter(|(lesson, _)| lesson.module_id == module.id)
                .map(|(lesson, (_, accessible))| LessonStatus {
                    lesson_id: lesson.id,
                    title: lesson.title.clone(),
                    order_index: lesson.order_index,
                    kind: lesson.kind,
                    completed: completed.contains(&lesson.id),
                    accessible: *accessible,
                })
                .collect(),
        })
        .collect();

    CourseOverview {
        course_id: course.id,
        title: course.title.clone(),
        access_mode: course.lesson_access_mode,
        modules,
        progress: aggregate_course_progress(lessons, completed),
        next_lesson: next_incomplete_lesson(lessons, completed),
        generated_at: Utc::now(),
    }
}

/// Basic progress tracker implementation.
pub struct BasicProgressTracker<S: Storage> {
    storage: Arc<Mutex<S>>,
}

impl<S: Storage> Clone for BasicProgressTracker<S> {
    fn clone(&self) -> Self {
        Self { storage: Arc::clone(&self.storage) }
    }
}

impl<S: Storage> BasicProgressTracker<S> {
    /// Create a new progress tracker over shared storage.
    pub fn new(storage: Arc<Mutex<S>>) -> Self {
        Self { storage }
    }

    async fn load(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<(Course, Vec<Module>, Vec<Lesson>, CompletionSet)>, ProgressError> {
        let storage = self.storage.lock().await;
        let Some(course) = storage.load_course(course_id).await? else {
            debug!(course = %course_id, "Course not found");
            return Ok(None);
        };
        let modules = storage.list_modules(course_id).await?;
        let lessons = storage.fetch_lessons(course_id).await?;
        let completed = storage.fetch_completion_set(user_id, course_id).await?;
        Ok(Some((course, modules, lessons, completed)))
    }
}

#[async_trait]
impl<S: Storage + 'static> ProgressTracker for BasicProgressTracker<S> {
    async fn course_overview(
        &self,
        user_id: UserId,
        course_id: CourseId,
        role: ViewerRole,
    ) -> Result<Option<CourseOverview>, ProgressError> {
        let Some((course, modules, lessons, completed)) = self.load(user_id, course_id).await? else {
            return Ok(None);
        };
        Ok(Some(build_overview(&course, &modules, &lessons, &completed, role.is_privileged())))
    }

    async fn resume_point(
        &self,
        user_id: UserId,
        course_id: CourseId,
        role: ViewerRole,
    ) -> Result<Option<ResumePoint>, ProgressError> {
        let Some((course, _, lessons, completed)) = self.load(user_id, course_id).await? else {
            return Ok(None);
        };
        let Some(lesson_id) = next_incomplete_lesson(&lessons, &completed) else {
            return Ok(None);
        };
        let accessible = crate::access::is_accessible(
            course.lesson_access_mode,
            &lessons,
            &completed,
            lesson_id,
            role.is_privileged(),
        );
        Ok(Some(ResumePoint { lesson_id, accessible }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStorage;

    async fn tracker(
        mode: LessonAccessMode,
        per_module: &[usize],
    ) -> (Arc<Mutex<MemoryStorage>>, BasicProgressTracker<MemoryStorage>, Course, Vec<Lesson>) {
        let mut storage = MemoryStorage::default();
        let (course, _, lessons) = storage.seed_course(mode, per_module).await;
        let shared = Arc::new(Mutex::new(storage));
        (shared.clone(), BasicProgressTracker::new(shared), course, lessons)
    }

    async fn complete(storage: &Arc<Mutex<MemoryStorage>>, user: UserId, course: CourseId, lesson: LessonId) {
        storage
            .lock()
            .await
            .upsert_progress(user, lesson, course, true, Some(Utc::now()))
            .await
            .unwrap();
    }

    fn accessible(overview: &CourseOverview) -> Vec<bool> {
        overview.lessons().map(|l| l.accessible).collect()
    }

    #[tokio::test]
    async fn test_all_access_nothing_done() {
        let (_, tracker, course, _) = tracker(LessonAccessMode::AllAccess, &[3]).await;

        let overview = tracker
            .course_overview(UserId::new(), course.id, ViewerRole::Student)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(accessible(&overview), vec![true, true, true]);
        assert_eq!(overview.progress, CourseProgress { total: 3, completed: 0, percentage: 0 });
    }

    #[tokio::test]
    async fn test_sequential_first_done() {
        let (storage, tracker, course, lessons) = tracker(LessonAccessMode::Sequential, &[3]).await;
        let user = UserId::new();
        complete(&storage, user, course.id, lessons[0].id).await;

        let overview = tracker.course_overview(user, course.id, ViewerRole::Student).await.unwrap().unwrap();

        assert_eq!(accessible(&overview), vec![true, true, false]);
        assert_eq!(overview.progress, CourseProgress { total: 3, completed: 1, percentage: 33 });
        assert_eq!(overview.next_lesson, Some(lessons[1].id));
    }

    #[tokio::test]
    async fn test_sequential_all_done_resumes_at_last() {
        let (storage, tracker, course, lessons) = tracker(LessonAccessMode::Sequential, &[3]).await;
        let user = UserId::new();
        for lesson in &lessons {
            complete(&storage, user, course.id, lesson.id).await;
        }

        let overview = tracker.course_overview(user, course.id, ViewerRole::Student).await.unwrap().unwrap();
        assert_eq!(accessible(&overview), vec![true, true, true]);
        assert_eq!(overview.next_lesson, Some(lessons[2].id));
        assert!(overview.progress.is_finished());

        let resume = tracker.resume_point(user, course.id, ViewerRole::Student).await.unwrap().unwrap();
        assert_eq!(resume, ResumePoint { lesson_id: lessons[2].id, accessible: true });
    }

    #[tokio::test]
    async fn test_modules_group_course_wide_order() {
        let (storage, tracker, course, lessons) = tracker(LessonAccessMode::Sequential, &[2, 2]).await;
        let user = UserId::new();
        complete(&storage, user, course.id, lessons[0].id).await;
        complete(&storage, user, course.id, lessons[1].id).await;
        complete(&storage, user, course.id, lessons[3].id).await;

        let overview = tracker.course_overview(user, course.id, ViewerRole::Student).await.unwrap().unwrap();

        assert_eq!(overview.modules.len(), 2);
        assert_eq!(overview.modules[0].progress, ModuleProgress { lessons_count: 2, completed_lessons_count: 2 });
        assert_eq!(overview.modules[1].progress, ModuleProgress { lessons_count: 2, completed_lessons_count: 1 });
        assert_eq!(accessible(&overview), vec![true, true, true, false]);
        assert!(overview.lesson(lessons[3].id).unwrap().completed);
    }

    #[tokio::test]
    async fn test_resume_point_with_gaps() {
        let (storage, tracker, course, lessons) = tracker(LessonAccessMode::Sequential, &[3]).await;
        let user = UserId::new();
        // Later lessons done without the first: resume at the first lesson.
        complete(&storage, user, course.id, lessons[1].id).await;
        complete(&storage, user, course.id, lessons[2].id).await;

        let resume = tracker.resume_point(user, course.id, ViewerRole::Student).await.unwrap().unwrap();
        assert_eq!(resume, ResumePoint { lesson_id: lessons[0].id, accessible: true });

        // Completing only the first and third leaves the second as resume
        // point and the third locked.
        let other = UserId::new();
        complete(&storage, other, course.id, lessons[0].id).await;
        complete(&storage, other, course.id, lessons[2].id).await;
        let overview = tracker.course_overview(other, course.id, ViewerRole::Student).await.unwrap().unwrap();
        assert_eq!(overview.next_lesson, Some(lessons[1].id));
        assert!(!overview.lesson(lessons[2].id).unwrap().accessible);
    }

    #[tokio::test]
    async fn test_admin_sees_everything_open() {
        let (_, tracker, course, _) = tracker(LessonAccessMode::Sequential, &[2, 1]).await;

        let overview = tracker.course_overview(UserId::new(), course.id, ViewerRole::Admin).await.unwrap().unwrap();
        assert!(overview.lessons().all(|l| l.accessible));
    }

    #[tokio::test]
    async fn test_missing_and_empty_course() {
        let mut storage = MemoryStorage::default();
        let (empty, _, _) = storage.seed_course(LessonAccessMode::Sequential, &[]).await;
        let tracker = BasicProgressTracker::new(Arc::new(Mutex::new(storage)));
        let user = UserId::new();

        assert!(tracker.course_overview(user, CourseId::new(), ViewerRole::Student).await.unwrap().is_none());
        assert!(tracker.resume_point(user, empty.id, ViewerRole::Student).await.unwrap().is_none());

        let overview = tracker.course_overview(user, empty.id, ViewerRole::Student).await.unwrap().unwrap();
        assert_eq!(overview.progress, CourseProgress::default());
        assert_eq!(overview.next_lesson, None);
    }
}
