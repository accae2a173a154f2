//! Resume point resolution.

use lessonflow_core::{CompletionSet, Lesson, LessonId};

/// First lesson in course order that is not complete.
///
/// Returns the last lesson when everything is complete and `None` for an
/// empty course. Accessibility is not consulted here.
pub fn next_incomplete_lesson(lessons: &[Lesson], completed: &CompletionSet) -> Option<LessonId> {
    lessons
        .iter()
        .find(|l| !completed.contains(&l.id))
        .or_else(|| lessons.last())
        .map(|l| l.id)
}
