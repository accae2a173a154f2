//! Lesson progress records and completion sets.

use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use crate::id::{CourseId, LessonId, UserId};
use crate::Time;

/// Completion record for one (user, lesson) pair.
///
/// A missing record means the lesson is incomplete. Records are never
/// deleted; marking a lesson incomplete keeps the row with `completed = false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonProgress {
    /// Learner
    pub user_id: UserId,

    /// Lesson the record is about
    pub lesson_id: LessonId,

    /// Course the lesson belongs to
    pub course_id: CourseId,

    /// Whether the lesson is complete
    pub completed: bool,

    /// Set when `completed` turns true, cleared when it turns false
    pub completed_at: Option<Time>,

    /// Last write
    pub updated_at: Time,
}

impl LessonProgress {
    /// A fresh, incomplete record.
    pub fn new(user_id: UserId, lesson_id: LessonId, course_id: CourseId) -> Self {
        Self {
            user_id,
            lesson_id,
            course_id,
            completed: false,
            completed_at: None,
            updated_at: chrono::Utc::now(),
        }
    }

    /// Transition to `Complete`.
    pub fn mark_complete(&mut self, at: Time) {
        self.completed = true;
        self.completed_at = Some(at);
        self.updated_at = at;
    }

    /// Transition to `Incomplete`.
    pub fn mark_incomplete(&mut self) {
        self.completed = false;
        self.completed_at = None;
        self.updated_at = chrono::Utc::now();
    }

    /// Current state of the record.
    pub fn state(&self) -> ProgressState {
        if self.completed {
            ProgressState::Complete
        } else {
            ProgressState::Incomplete
        }
    }
}

/// The two states of a (user, lesson) pair. There is no terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    /// Initial state, also used when no record exists
    #[default]
    Incomplete,
    /// Lesson marked complete
    Complete,
}

/// Lesson ids a user has completed within a course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSet(HashSet<LessonId>);

impl CompletionSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the lesson is complete.
    pub fn contains(&self, lesson_id: &LessonId) -> bool {
        self.0.contains(lesson_id)
    }

    /// Record a completed lesson. Returns false if it was already present.
    pub fn insert(&mut self, lesson_id: LessonId) -> bool {
        self.0.insert(lesson_id)
    }

    /// Drop a lesson from the set.
    pub fn remove(&mut self, lesson_id: &LessonId) -> bool {
        self.0.remove(lesson_id)
    }

    /// Number of completed lessons.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing is complete.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over completed lesson ids (unordered).
    pub fn iter(&self) -> impl Iterator<Item = &LessonId> {
        self.0.iter()
    }
}

impl FromIterator<LessonId> for CompletionSet {
    fn from_iter<I: IntoIterator<Item = LessonId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a LessonProgress> for CompletionSet {
    /// Collect the completed lessons out of a batch of progress records.
    fn from_iter<I: IntoIterator<Item = &'a LessonProgress>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .filter(|p| p.completed)
                .map(|p| p.lesson_id)
                .collect(),
        )
    }
}

impl Extend<LessonId> for CompletionSet {
    fn extend<I: IntoIterator<Item = LessonId>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}
