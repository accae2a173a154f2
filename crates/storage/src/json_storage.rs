//! JSON file storage implementation.
//!
//! Stores each entity as a pretty-printed JSON file under a root directory
//! (`.lessonflow` by default). Progress rows live at
//! `progress/<user>/<lesson>.json` and enrollments at
//! `enrollments/<course>/<user>.json`, so a (user, lesson) key maps to exactly
//! one file. Every write goes to a temporary file that is renamed into place.

use std::path::{Path, PathBuf};
use lessonflow_core::{
    sort_lessons, CompletionSet, Course, CourseId, Enrollment, Lesson, LessonId, LessonProgress,
    Module, Time, UserId,
};
use super::{Storage, Result};
use tokio::fs;
use tracing::debug;

/// File-based JSON storage backend.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage, creating the directory layout if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("courses")).await?;
        fs::create_dir_all(root.join("modules")).await?;
        fs::create_dir_all(root.join("lessons")).await?;
        fs::create_dir_all(root.join("enrollments")).await?;
        fs::create_dir_all(root.join("progress")).await?;

        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn course_path(&self, id: CourseId) -> PathBuf {
        self.root.join("courses").join(format!("{}.json", id))
    }
    fn module_path(&self, id: lessonflow_core::ModuleId) -> PathBuf {
        self.root.join("modules").join(format!("{}.json", id))
    }
    fn lesson_path(&self, id: LessonId) -> PathBuf {
        self.root.join("lessons").join(format!("{}.json", id))
    }
    fn enrollment_dir(&self, course_id: CourseId) -> PathBuf {
        self.root.join("enrollments").join(course_id.to_string())
    }
    fn progress_dir(&self, user_id: UserId) -> PathBuf {
        self.root.join("progress").join(user_id.to_string())
    }
    fn progress_path(&self, user_id: UserId, lesson_id: LessonId) -> PathBuf {
        self.progress_dir(user_id).join(format!("{}.json", lesson_id))
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn save_course(&mut self, course: &Course) -> Result<()> {
        write_json(&self.course_path(course.id), course).await
    }

    async fn load_course(&self, id: CourseId) -> Result<Option<Course>> {
        read_json(&self.course_path(id)).await
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let mut courses: Vec<Course> = list_dir(&self.root.join("courses")).await?;
        courses.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(courses)
    }

    async fn save_module(&mut self, module: &Module) -> Result<()> {
        write_json(&self.module_path(module.id), module).await
    }

    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<Module>> {
        let all: Vec<Module> = list_dir(&self.root.join("modules")).await?;
        let mut modules: Vec<Module> = all
            .into_iter()
            .filter(|m| m.course_id == course_id)
            .collect();
        modules.sort_by_key(|m| (m.order_index, m.id));
        Ok(modules)
    }

    async fn save_lesson(&mut self, lesson: &Lesson) -> Result<()> {
        write_json(&self.lesson_path(lesson.id), lesson).await
    }

    async fn load_lesson(&self, id: LessonId) -> Result<Option<Lesson>> {
        read_json(&self.lesson_path(id)).await
    }

    async fn fetch_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>> {
        let all: Vec<Lesson> = list_dir(&self.root.join("lessons")).await?;
        let mut lessons: Vec<Lesson> = all
            .into_iter()
            .filter(|l| l.course_id == course_id)
            .collect();
        // Directory order is arbitrary; pin ties on id before the stable sort.
        lessons.sort_by_key(|l| l.id);
        sort_lessons(&mut lessons);
        Ok(lessons)
    }

    async fn save_enrollment(&mut self, enrollment: &Enrollment) -> Result<()> {
        let dir = self.enrollment_dir(enrollment.course_id);
        fs::create_dir_all(&dir).await?;
        write_json(&dir.join(format!("{}.json", enrollment.user_id)), enrollment).await
    }

    async fn fetch_enrollment(&self, user_id: UserId, course_id: CourseId) -> Result<bool> {
        let path = self.enrollment_dir(course_id).join(format!("{}.json", user_id));
        let enrollment: Option<Enrollment> = read_json(&path).await?;
        Ok(enrollment.is_some())
    }

    async fn load_progress(&self, user_id: UserId, lesson_id: LessonId)
        -> Result<Option<LessonProgress>> {
        read_json(&self.progress_path(user_id, lesson_id)).await
    }

    async fn fetch_completion_set(&self, user_id: UserId, course_id: CourseId)
        -> Result<CompletionSet> {
        let records: Vec<LessonProgress> = list_dir(&self.progress_dir(user_id)).await?;
        Ok(records
            .iter()
            .filter(|p| p.course_id == course_id)
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
        fs::create_dir_all(self.progress_dir(user_id)).await?;

        let record = LessonProgress {
            user_id,
            lesson_id,
            course_id,
            completed,
            completed_at,
            updated_at: chrono::Utc::now(),
        };
        write_json(&self.progress_path(user_id, lesson_id), &record).await?;
        debug!(user = %user_id, lesson = %lesson_id, completed, "Progress row written");
        Ok(record)
    }
}

/// Serialize `value` next to `path` and rename it over the target.
async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let tmp = path.with_extension(format!("json.{}.tmp", nanos));
    fs::write(&tmp, json.as_bytes()).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(items),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Some(item) = read_json(&entry.path()).await? {
            items.push(item);
        }
    }
    Ok(items)
}
