//! Lesson accessibility evaluation.
//!
//! Gating is course-wide: in sequential mode a lesson opens only when every
//! lesson before it in course order is complete. Module boundaries play no
//! part. In sequential mode a lesson missing from the course order is locked.

use lessonflow_core::{CompletionSet, Lesson, LessonAccessMode, LessonId};
use tracing::debug;

/// Whether `target` is open for the viewer.
///
/// `lessons` must be in course order. Privileged viewers and all-access
/// courses short-circuit to open; otherwise a target that is not in the list
/// is reported as locked.
pub fn is_accessible(
    mode: LessonAccessMode,
    lessons: &[Lesson],
    completed: &CompletionSet,
    target: LessonId,
    privileged: bool,
) -> bool {
    if privileged || mode == LessonAccessMode::AllAccess {
        return true;
    }

    let mut prior_complete = true;
    for lesson in lessons {
        if lesson.id == target {
            return prior_complete;
        }
        if !completed.contains(&lesson.id) {
            prior_complete = false;
        }
    }

    debug!(lesson = %target, "Lesson not in course order, treating as locked");
    false
}

/// Accessibility of every lesson in one forward pass, in input order.
///
/// Produces the same answers as calling [`is_accessible`] per lesson.
pub fn accessibility_map(
    mode: LessonAccessMode,
    lessons: &[Lesson],
    completed: &CompletionSet,
    privileged: bool,
) -> Vec<(LessonId, bool)> {
    let gated = !privileged && mode == LessonAccessMode::Sequential;
    let mut prior_complete = true;

    lessons
        .iter()
        .map(|lesson| {
            let open = !gated || prior_complete;
            if !completed.contains(&lesson.id) {
                prior_complete = false;
            }
            (lesson.id, open)
        })
        .collect()
}
