//! Lesson access and progress tracking.
//!
//! Decides which lessons a viewer may open, summarises completion per module
//! and course, resolves the resume point and owns the only writes to lesson
//! progress.

#![warn(missing_docs)]

pub mod access;
pub mod aggregate;
pub mod resume;
pub mod mutator;
pub mod tracker;
pub mod service;
mod error;

#[cfg(test)]
mod test_support;

pub use access::{is_accessible, accessibility_map};
pub use aggregate::{
    aggregate_module_progress, aggregate_course_progress, aggregate_by_module, percentage,
    ModuleProgress, CourseProgress,
};
pub use resume::next_incomplete_lesson;
pub use mutator::CompletionMutator;
pub use tracker::{
    ProgressTracker, BasicProgressTracker, CourseOverview, ModuleOverview, LessonStatus,
    ResumePoint, build_overview,
};
pub use service::{ProgressService, ServiceConfig};
pub use error::{ProgressError, ServiceError};
