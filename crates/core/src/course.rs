//! Course catalog model - courses, modules and lessons.

use serde::{Deserialize, Serialize};
use crate::id::{CourseId, LessonId, ModuleId};
use crate::{ParseError, Time};

/// A course groups modules and lessons under one gating policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Unique identifier
    pub id: CourseId,

    /// Course title
    pub title: String,

    /// Gating policy applied to every lesson in the course
    pub lesson_access_mode: LessonAccessMode,

    /// Created at
    pub created_at: Time,
}

impl Course {
    /// Create a new course.
    pub fn new(title: impl Into<String>, lesson_access_mode: LessonAccessMode) -> Self {
        Self {
            id: CourseId::new(),
            title: title.into(),
            lesson_access_mode,
            created_at: chrono::Utc::now(),
        }
    }
}

/// How lessons in a course unlock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonAccessMode {
    /// Lessons unlock in course order as earlier ones are completed.
    #[default]
    Sequential,
    /// Every lesson is open regardless of completion.
    AllAccess,
}

impl LessonAccessMode {
    /// Wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonAccessMode::Sequential => "sequential",
            LessonAccessMode::AllAccess => "all_access",
        }
    }
}

impl std::fmt::Display for LessonAccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LessonAccessMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "sequential" => Ok(LessonAccessMode::Sequential),
            "all_access" => Ok(LessonAccessMode::AllAccess),
            _ => Err(ParseError::AccessMode(s.to_string())),
        }
    }
}

/// A display grouping of lessons inside a course.
///
/// Module order never takes part in gating; only lesson order does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// Unique identifier
    pub id: ModuleId,

    /// Owning course
    pub course_id: CourseId,

    /// Module title
    pub title: String,

    /// Position among the course's modules
    pub order_index: i32,
}

impl Module {
    /// Create a new module.
    pub fn new(course_id: CourseId, title: impl Into<String>, order_index: i32) -> Self {
        Self {
            id: ModuleId::new(),
            course_id,
            title: title.into(),
            order_index,
        }
    }
}

/// A single lesson.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    /// Unique identifier
    pub id: LessonId,

    /// Owning course
    pub course_id: CourseId,

    /// Owning module
    pub module_id: ModuleId,

    /// Lesson title
    pub title: String,

    /// Course-wide position (not reset per module)
    pub order_index: i32,

    /// Content kind
    #[serde(rename = "type")]
    pub kind: LessonKind,
}

impl Lesson {
    /// Create a new content lesson.
    pub fn new(
        course_id: CourseId,
        module_id: ModuleId,
        title: impl Into<String>,
        order_index: i32,
    ) -> Self {
        Self {
            id: LessonId::new(),
            course_id,
            module_id,
            title: title.into(),
            order_index,
            kind: LessonKind::Content,
        }
    }

    /// Set the lesson kind.
    pub fn with_kind(mut self, kind: LessonKind) -> Self {
        self.kind = kind;
        self
    }
}

/// What a lesson renders. Has no effect on access rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonKind {
    /// Reading or video material
    #[default]
    Content,
    /// Assessment
    Quiz,
}

impl std::fmt::Display for LessonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LessonKind::Content => f.write_str("content"),
            LessonKind::Quiz => f.write_str("quiz"),
        }
    }
}

impl std::str::FromStr for LessonKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "content" => Ok(LessonKind::Content),
            "quiz" => Ok(LessonKind::Quiz),
            _ => Err(ParseError::LessonKind(s.to_string())),
        }
    }
}

/// Put lessons into course order.
///
/// The sort is stable, so lessons sharing an `order_index` keep their input order.
pub fn sort_lessons(lessons: &mut [Lesson]) {
    lessons.sort_by_key(|l| l.order_index);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_mode_wire_format() {
        let json = serde_json::to_string(&LessonAccessMode::AllAccess).unwrap();
        assert_eq!(json, "\"all_access\"");

        let mode: LessonAccessMode = serde_json::from_str("\"sequential\"").unwrap();
        assert_eq!(mode, LessonAccessMode::Sequential);
    }

    #[test]
    fn test_access_mode_from_str() {
        assert_eq!("all-access".parse::<LessonAccessMode>().unwrap(), LessonAccessMode::AllAccess);
        assert_eq!("Sequential".parse::<LessonAccessMode>().unwrap(), LessonAccessMode::Sequential);
        assert!("open".parse::<LessonAccessMode>().is_err());
    }

    #[test]
    fn test_lesson_kind_serialized_as_type() {
        let course = CourseId::new();
        let lesson = Lesson::new(course, ModuleId::new(), "Intro", 0).with_kind(LessonKind::Quiz);
        let value = serde_json::to_value(&lesson).unwrap();
        assert_eq!(value["type"], "quiz");
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn test_sort_lessons_is_stable() {
        let course = CourseId::new();
        let module = ModuleId::new();
        let a = Lesson::new(course, module, "a", 2);
        let b = Lesson::new(course, module, "b", 1);
        let c = Lesson::new(course, module, "c", 1);
        let mut lessons = vec![a, b, c];

        sort_lessons(&mut lessons);

        let titles: Vec<_> = lessons.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c", "a"]);
    }
}
