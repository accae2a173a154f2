//! Enrollment and viewer roles.

use serde::{Deserialize, Serialize};
use crate::id::{CourseId, UserId};
use crate::{ParseError, Time};

/// A user's enrollment in a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Enrolled user
    pub user_id: UserId,

    /// Course
    pub course_id: CourseId,

    /// When the user enrolled
    pub enrolled_at: Time,
}

impl Enrollment {
    /// Enroll a user now.
    pub fn new(user_id: UserId, course_id: CourseId) -> Self {
        Self {
            user_id,
            course_id,
            enrolled_at: chrono::Utc::now(),
        }
    }
}

/// Role of whoever is looking at a course.
///
/// Resolving a role from a session belongs to the host application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerRole {
    /// Learner, subject to gating
    #[default]
    Student,
    /// Course staff
    Instructor,
    /// Platform administrator
    Admin,
}

impl ViewerRole {
    /// Privileged roles bypass lesson gating and enrollment checks.
    pub fn is_privileged(&self) -> bool {
        matches!(self, ViewerRole::Instructor | ViewerRole::Admin)
    }
}

impl std::str::FromStr for ViewerRole {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(ViewerRole::Student),
            "instructor" => Ok(ViewerRole::Instructor),
            "admin" => Ok(ViewerRole::Admin),
            _ => Err(ParseError::Role(s.to_string())),
        }
    }
}
