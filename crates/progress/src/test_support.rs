//! In-memory storage used by the engine's tests.

use std::collections::HashMap;
use async_trait::async_trait;
use lessonflow_core::{
    sort_lessons, CompletionSet, Course, CourseId, Enrollment, Lesson, LessonAccessMode,
    LessonId, LessonProgress, Module, Time, UserId,
};
use lessonflow_storage::{Result, Storage, StorageError};

#[derive(Default)]
pub struct MemoryStorage {
    courses: HashMap<CourseId, Course>,
    modules: Vec<Module>,
    lessons: Vec<Lesson>,
    enrollments: Vec<Enrollment>,
    progress: HashMap<(UserId, LessonId), LessonProgress>,
    fail_writes: bool,
}

impl MemoryStorage {
    /// Storage whose progress writes always fail.
    pub fn failing() -> Self {
        Self { fail_writes: true, ..Default::default() }
    }

    pub fn progress_rows(&self) -> usize {
        self.progress.len()
    }

    /// Seed a course with `per_module[i]` lessons in module `i`, numbered
    /// course-wide. Returns the course and its lessons in course order.
    pub async fn seed_course(
        &mut self,
        mode: LessonAccessMode,
        per_module: &[usize],
    ) -> (Course, Vec<Module>, Vec<Lesson>) {
        let course = Course::new("Course", mode);
        self.save_course(&course).await.unwrap();

        let mut modules = Vec::new();
        let mut lessons = Vec::new();
        let mut order = 0;
        for (m, count) in per_module.iter().enumerate() {
            let module = Module::new(course.id, format!("M{}", m), m as i32);
            self.save_module(&module).await.unwrap();
            for _ in 0..*count {
                let lesson = Lesson::new(course.id, module.id, format!("L{}", order), order);
                self.save_lesson(&lesson).await.unwrap();
                lessons.push(lesson);
                order += 1;
            }
            modules.push(module);
        }
        (course, modules, lessons)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save_course(&mut self, course: &Course) -> Result<()> {
        self.courses.insert(course.id, course.clone());
        Ok(())
    }

    async fn load_course(&self, id: CourseId) -> Result<Option<Course>> {
        Ok(self.courses.get(&id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        Ok(self.courses.values().cloned().collect())
    }

    async fn save_module(&mut self, module: &Module) -> Result<()> {
        self.modules.retain(|m| m.id != module.id);
        self.modules.push(module.clone());
        Ok(())
    }

    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<Module>> {
        let mut modules: Vec<Module> = self
            .modules
            .iter()
            .filter(|m| m.course_id == course_id)
            .cloned()
            .collect();
        modules.sort_by_key(|m| m.order_index);
        Ok(modules)
    }

    async fn save_lesson(&mut self, lesson: &Lesson) -> Result<()> {
        self.lessons.retain(|l| l.id != lesson.id);
        self.lessons.push(lesson.clone());
        Ok(())
    }

    async fn load_lesson(&self, id: LessonId) -> Result<Option<Lesson>> {
        Ok(self.lessons.iter().find(|l| l.id == id).cloned())
    }

    async fn fetch_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>> {
        let mut lessons: Vec<Lesson> = self
            .lessons
            .iter()
            .filter(|l| l.course_id == course_id)
            .cloned()
            .collect();
        sort_lessons(&mut lessons);
        Ok(lessons)
    }

    async fn save_enrollment(&mut self, enrollment: &Enrollment) -> Result<()> {
        self.enrollments.push(enrollment.clone());
        Ok(())
    }

    async fn fetch_enrollment(&self, user_id: UserId, course_id: CourseId) -> Result<bool> {
        Ok(self
            .enrollments
            .iter()
            .any(|e| e.user_id == user_id && e.course_id == course_id))
    }

    async fn load_progress(&self, user_id: UserId, lesson_id: LessonId)
        -> Result<Option<LessonProgress>> {
        Ok(self.progress.get(&(user_id, lesson_id)).cloned())
    }

    async fn fetch_completion_set(&self, user_id: UserId, course_id: CourseId)
        -> Result<CompletionSet> {
        Ok(self
            .progress
            .values()
            .filter(|p| p.user_id == user_id && p.course_id == course_id)
            .collect())
    }

    async fn upsert_progress(
        &mut self,
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
        completed: bool,
        completed_at: Option<Time>,
    ) -> Result<LessonProgress> {
        if self.fail_writes {
            return Err(StorageError::Other("database unavailable".to_string()));
        }
        let record = LessonProgress {
            user_id,
            lesson_id,
            course_id,
            completed,
            completed_at,
            updated_at: chrono::Utc::now(),
        };
        self.progress.insert((user_id, lesson_id), record.clone());
        Ok(record)
    }
}
