//! Caller layer around the completion mutator.
//!
//! Validates requests against the catalog and enrollments, writes through
//! the mutator, and hands back a freshly computed overview. Nothing is
//! cached between calls.

use std::sync::Arc;
use lessonflow_core::{CourseId, LessonId, UserId, ViewerRole};
use lessonflow_storage::Storage;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::access::is_accessible;
use crate::mutator::CompletionMutator;
use crate::tracker::{BasicProgressTracker, CourseOverview, ProgressTracker, ResumePoint};
use crate::ServiceError;

/// Configuration for the progress service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Reject progress writes from users not enrolled in the course.
    /// Privileged roles are never checked.
    pub require_enrollment: bool,
    /// Reject marking a lesson complete while it is locked for the viewer.
    pub require_accessible_to_complete: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            require_enrollment: true,
            require_accessible_to_complete: false,
        }
    }
}

/// Entry point for reading and toggling lesson progress.
pub struct ProgressService<S: Storage> {
    storage: Arc<Mutex<S>>,
    mutator: CompletionMutator<S>,
    tracker: BasicProgressTracker<S>,
    config: ServiceConfig,
}

impl<S: Storage + 'static> ProgressService<S> {
    /// Create a service that owns its storage.
    pub fn new(storage: S) -> Self {
        Self::from_shared(Arc::new(Mutex::new(storage)))
    }

    /// Create a service over storage shared with other components.
    pub fn from_shared(storage: Arc<Mutex<S>>) -> Self {
        Self {
            mutator: CompletionMutator::new(Arc::clone(&storage)),
            tracker: BasicProgressTracker::new(Arc::clone(&storage)),
            storage,
            config: ServiceConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Shared storage handle.
    pub fn storage(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.storage)
    }

    /// The read model.
    pub fn tracker(&self) -> &BasicProgressTracker<S> {
        &self.tracker
    }

    /// Course overview for a viewer.
    pub async fn overview(
        &self,
        user_id: UserId,
        course_id: CourseId,
        role: ViewerRole,
    ) -> Result<CourseOverview, ServiceError> {
        self.tracker
            .course_overview(user_id, course_id, role)
            .await?
            .ok_or(ServiceError::CourseNotFound(course_id))
    }

    /// Where the viewer should continue; `None` for a course without lessons.
    pub async fn resume(
        &self,
        user_id: UserId,
        course_id: CourseId,
        role: ViewerRole,
    ) -> Result<Option<ResumePoint>, ServiceError> {
        let resume = self.tracker.resume_point(user_id, course_id, role).await?;
        if resume.is_none() {
            self.require_course(course_id).await?;
        }
        Ok(resume)
    }

    /// Mark a lesson complete and return the updated overview.
    pub async fn complete_lesson(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
        role: ViewerRole,
    ) -> Result<CourseOverview, ServiceError> {
        self.set_lesson_completion(user_id, lesson_id, course_id, role, true).await
    }

    /// Mark a lesson incomplete and return the updated overview.
    pub async fn uncomplete_lesson(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
        role: ViewerRole,
    ) -> Result<CourseOverview, ServiceError> {
        self.set_lesson_completion(user_id, lesson_id, course_id, role, false).await
    }

    /// Toggle a lesson after checking the request, then recompute the overview.
    pub async fn set_lesson_completion(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
        role: ViewerRole,
        completed: bool,
    ) -> Result<CourseOverview, ServiceError> {
        self.check_request(user_id, lesson_id, course_id, role, completed).await?;

        self.mutator
            .set_completed(user_id, lesson_id, course_id, completed)
            .await?;

        info!(user = %user_id, lesson = %lesson_id, completed, "Lesson completion changed");
        self.overview(user_id, course_id, role).await
    }

    async fn require_course(&self, course_id: CourseId) -> Result<(), ServiceError> {
        let storage = self.storage.lock().await;
        match storage.load_course(course_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::CourseNotFound(course_id)),
        }
    }

    async fn check_request(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
        role: ViewerRole,
        completing: bool,
    ) -> Result<(), ServiceError> {
        let storage = self.storage.lock().await;

        let Some(course) = storage.load_course(course_id).await? else {
            warn!(course = %course_id, "Progress update for unknown course");
            return Err(ServiceError::CourseNotFound(course_id));
        };

        let Some(lesson) = storage.load_lesson(lesson_id).await? else {
            warn!(lesson = %lesson_id, "Progress update for unknown lesson");
            return Err(ServiceError::LessonNotFound(lesson_id));
        };
        if lesson.course_id != course_id {
            warn!(lesson = %lesson_id, course = %course_id, "Lesson belongs to another course");
            return Err(ServiceError::LessonNotInCourse { lesson: lesson_id, course: course_id });
        }

        let privileged = role.is_privileged();
        if self.config.require_enrollment
            && !privileged
            && !storage.fetch_enrollment(user_id, course_id).await?
        {
            warn!(user = %user_id, course = %course_id, "Progress update from non-enrolled user");
            return Err(ServiceError::NotEnrolled { user: user_id, course: course_id });
        }

        if completing && self.config.require_accessible_to_complete {
            let lessons = storage.fetch_lessons(course_id).await?;
            let completed = storage.fetch_completion_set(user_id, course_id).await?;
            if !is_accessible(course.lesson_access_mode, &lessons, &completed, lesson_id, privileged) {
                warn!(user = %user_id, lesson = %lesson_id, "Refusing to complete a locked lesson");
                return Err(ServiceError::LessonLocked(lesson_id));
            }
        }

        Ok(())
    }
}
