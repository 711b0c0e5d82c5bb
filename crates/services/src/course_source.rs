use std::sync::Arc;

use async_trait::async_trait;
use course_core::model::{Course, CourseId, LearnerId};
use storage::repository::{CourseRepository, EnrollmentRepository};

use crate::error::FetchError;

/// Where course trees (with the learner's cursor attached) come from.
#[async_trait]
pub trait CourseSource: Send + Sync {
    /// Fetch a course as seen by the given learner.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the course is missing or cannot be retrieved.
    async fn fetch_course(
        &self,
        course_id: CourseId,
        learner_id: LearnerId,
    ) -> Result<Course, FetchError>;
}

/// Reads courses and enrollments from local repositories.
#[derive(Clone)]
pub struct StorageCourseSource {
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl StorageCourseSource {
    #[must_use]
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            courses,
            enrollments,
        }
    }
}

#[async_trait]
impl CourseSource for StorageCourseSource {
    async fn fetch_course(
        &self,
        course_id: CourseId,
        learner_id: LearnerId,
    ) -> Result<Course, FetchError> {
        let course = self
            .courses
            .get_course(course_id)
            .await?
            .ok_or(FetchError::NotFound(course_id))?;

        // A learner without an enrollment simply has no cursor yet.
        let course = match self.enrollments.get_enrollment(course_id, learner_id).await? {
            Some(record) => course.with_enrollment(record.current_material, record.quizzes),
            None => course,
        };
        Ok(course)
    }
}
