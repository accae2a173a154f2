//! lessonflow core data models.
//!
//! This crate defines the course catalog, enrollment and lesson progress
//! structures shared by the storage adapters and the progress engine.

#![warn(missing_docs)]

// Core identities
mod id;

// Catalog
mod course;
mod enrollment;

// Progress records
mod progress;

// Re-exports
pub use id::*;

pub use course::{Course, LessonAccessMode, Module, Lesson, LessonKind, sort_lessons};
pub use enrollment::{Enrollment, ViewerRole};
pub use progress::{LessonProgress, ProgressState, CompletionSet};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

/// Error parsing one of the model's string enums.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Unknown lesson access mode
    #[error("unknown lesson access mode: {0} (expected sequential or all_access)")]
    AccessMode(String),

    /// Unknown lesson kind
    #[error("unknown lesson type: {0} (expected content or quiz)")]
    LessonKind(String),

    /// Unknown viewer role
    #[error("unknown role: {0} (expected student, instructor or admin)")]
    Role(String),
}
