use std::sync::Arc;

use course_core::model::{Course, CourseId, LearnerId, MaterialId};
use course_core::progress::{linearize, position_of};
use course_core::{Clock, MaterialOrdering};
use storage::repository::{
    CourseRepository, EnrollmentRecord, EnrollmentRepository, StorageError,
};

use crate::error::EnrollmentError;

/// Result of trying to move a learner's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Moved {
        from: Option<MaterialId>,
        to: MaterialId,
    },
    /// The target is at or behind the cursor; nothing changed.
    AlreadyPast,
    /// The cursor is on the last material.
    AtEnd,
}

/// Orchestrates enrollment state: the cursor and quiz results.
///
/// The cursor only ever moves forward in the course sequence.
#[derive(Clone)]
pub struct EnrollmentService {
    clock: Clock,
    ordering: MaterialOrdering,
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            clock,
            ordering: MaterialOrdering::default(),
            courses,
            enrollments,
        }
    }

    #[must_use]
    pub fn with_ordering(mut self, ordering: MaterialOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    async fn course(&self, course_id: CourseId) -> Result<Course, EnrollmentError> {
        self.courses
            .get_course(course_id)
            .await?
            .ok_or(EnrollmentError::CourseNotFound(course_id))
    }

    async fn enrollment(
        &self,
        course_id: CourseId,
        learner_id: LearnerId,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        self.enrollments
            .get_enrollment(course_id, learner_id)
            .await?
            .ok_or(EnrollmentError::NotEnrolled)
    }

    /// Enroll a learner, returning the existing enrollment if there is one.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::CourseNotFound` for unknown courses and
    /// `EnrollmentError::Storage` on repository failures.
    pub async fn enroll(
        &self,
        course_id: CourseId,
        learner_id: LearnerId,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        self.course(course_id).await?;
        if let Some(existing) = self
            .enrollments
            .get_enrollment(course_id, learner_id)
            .await?
        {
            return Ok(existing);
        }

        let record = EnrollmentRecord::started(course_id, learner_id, self.clock.now());
        self.enrollments.upsert_enrollment(&record).await?;
        tracing::info!(%course_id, %learner_id, "learner enrolled");
        Ok(record)
    }

    /// Move the cursor to `material_id` if it lies ahead of the current one.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::UnknownMaterial` if the material is not in the
    /// course, `EnrollmentError::NotEnrolled` without an enrollment, and
    /// `EnrollmentError::Storage` on repository failures.
    pub async fn advance_to(
        &self,
        course_id: CourseId,
        learner_id: LearnerId,
        material_id: MaterialId,
    ) -> Result<AdvanceOutcome, EnrollmentError> {
        let course = self.course(course_id).await?;
        let record = self.enrollment(course_id, learner_id).await?;
        let sequence = linearize(&course, self.ordering);

        let target = position_of(&sequence, material_id)
            .ok_or(EnrollmentError::UnknownMaterial(material_id))?;
        let current = record
            .current_material
            .and_then(|id| position_of(&sequence, id));

        if current.is_some_and(|current| current >= target) {
            return Ok(AdvanceOutcome::AlreadyPast);
        }
        self.move_cursor(record, material_id).await
    }

    /// Mark the current material as done by moving to the one after it.
    ///
    /// A learner who has not started yet moves onto the first material.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::NotEnrolled` without an enrollment and
    /// `EnrollmentError::Storage` on repository failures.
    pub async fn complete_current(
        &self,
        course_id: CourseId,
        learner_id: LearnerId,
    ) -> Result<AdvanceOutcome, EnrollmentError> {
        let course = self.course(course_id).await?;
        let record = self.enrollment(course_id, learner_id).await?;
        let sequence = linearize(&course, self.ordering);

        let next = match record
            .current_material
            .and_then(|id| position_of(&sequence, id))
        {
            Some(current) => current + 1,
            None => 0,
        };
        let Some(target) = sequence.get(next) else {
            return Ok(AdvanceOutcome::AtEnd);
        };
        let target = target.id();
        self.move_cursor(record, target).await
    }

    async fn move_cursor(
        &self,
        mut record: EnrollmentRecord,
        to: MaterialId,
    ) -> Result<AdvanceOutcome, EnrollmentError> {
        let from = record.current_material.replace(to);
        record.updated_at = self.clock.now();
        self.enrollments.upsert_enrollment(&record).await?;
        tracing::debug!(
            course_id = %record.course_id,
            learner_id = %record.learner_id,
            ?from,
            %to,
            "cursor moved"
        );
        Ok(AdvanceOutcome::Moved { from, to })
    }

    /// Store the learner's score for a quiz group.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::InvalidScore` for NaN, infinite or negative
    /// scores, `EnrollmentError::UnknownMaterial`/`NotAQuizGroup` when the
    /// material does not qualify, and `EnrollmentError::NotEnrolled` without an
    /// enrollment.
    pub async fn record_quiz_result(
        &self,
        course_id: CourseId,
        learner_id: LearnerId,
        material_id: MaterialId,
        score: f64,
    ) -> Result<(), EnrollmentError> {
        if !score.is_finite() || score < 0.0 {
            return Err(EnrollmentError::InvalidScore);
        }
        let course = self.course(course_id).await?;
        let material = course
            .find_material(material_id)
            .ok_or(EnrollmentError::UnknownMaterial(material_id))?;
        if !material.kind.is_quiz_group() {
            return Err(EnrollmentError::NotAQuizGroup(material_id));
        }

        self.enrollments
            .record_quiz_result(course_id, learner_id, material_id, score, self.clock.now())
            .await
            .map_err(|e| match e {
                StorageError::NotFound => EnrollmentError::NotEnrolled,
                other => EnrollmentError::Storage(other),
            })
    }
}
