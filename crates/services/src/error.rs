//! Shared error types for the services crate.

use thiserror::Error;

use course_core::PayloadError;
use course_core::model::{CourseId, MaterialId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted while fetching a course for a learner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("course {0} not found")]
    NotFound(CourseId),
    #[error("requested course {requested} but received {received}")]
    CourseMismatch {
        requested: CourseId,
        received: CourseId,
    },
    #[error("course request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `EnrollmentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error("learner is not enrolled in this course")]
    NotEnrolled,
    #[error("material {0} is not part of this course")]
    UnknownMaterial(MaterialId),
    #[error("material {0} is not a quiz group")]
    NotAQuizGroup(MaterialId),
    #[error("quiz score must be a finite, non-negative number")]
    InvalidScore,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
