//! Progress aggregation for modules and courses.

use lessonflow_core::{CompletionSet, Lesson, Module, ModuleId};
use serde::{Deserialize, Serialize};

/// Completion counts for one module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgress {
    /// Lessons in the module
    pub lessons_count: usize,

    /// Lessons the user has completed
    pub completed_lessons_count: usize,
}

/// Completion summary for a whole course.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseProgress {
    /// Lessons in the course
    pub total: usize,

    /// Lessons completed
    pub completed: usize,

    /// `completed / total` as a whole percentage, rounded half up
    pub percentage: u32,
}

impl CourseProgress {
    /// True when every lesson is complete and the course is not empty.
    pub fn is_finished(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

/// Count completed lessons of a module.
pub fn aggregate_module_progress(lessons: &[Lesson], completed: &CompletionSet) -> ModuleProgress {
    ModuleProgress {
        lessons_count: lessons.len(),
        completed_lessons_count: count_completed(lessons, completed),
    }
}

/// Summarise a course's completion.
pub fn aggregate_course_progress(lessons: &[Lesson], completed: &CompletionSet) -> CourseProgress {
    let total = lessons.len();
    let done = count_completed(lessons, completed);
    CourseProgress {
        total,
        completed: done,
        percentage: percentage(done, total),
    }
}

/// Per-module progress for every module, in the order given.
///
/// Lessons are matched to modules by `module_id`; lessons whose module is
/// not listed are ignored.
pub fn aggregate_by_module(
    modules: &[Module],
    lessons: &[Lesson],
    completed: &CompletionSet,
) -> Vec<(ModuleId, ModuleProgress)> {
    modules
        .iter()
        .map(|module| {
            let mut progress = ModuleProgress::default();
            for lesson in lessons.iter().filter(|l| l.module_id == module.id) {
                progress.lessons_count += 1;
                if completed.contains(&lesson.id) {
                    progress.completed_lessons_count += 1;
                }
            }
            (module.id, progress)
        })
        .collect()
}

fn count_completed(lessons: &[Lesson], completed: &CompletionSet) -> usize {
    lessons.iter().filter(|l| completed.contains(&l.id)).count()
}

/// Integer percentage rounded half up; zero for an empty course.
pub fn percentage(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    // round(100 * done / total) without floats: (200 * done + total) / (2 * total)
    ((200 * done + total) / (2 * total)) as u32
}
