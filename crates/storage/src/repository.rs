use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{Course, CourseId, EnrollmentInfo, LearnerId, MaterialId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Lightweight listing entry for a stored course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    pub id: CourseId,
    pub title: String,
    pub description: Option<String>,
}

/// A learner's position in a course plus their recorded quiz scores.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentRecord {
    pub course_id: CourseId,
    pub learner_id: LearnerId,
    pub current_material: Option<MaterialId>,
    pub quizzes: EnrollmentInfo,
    pub updated_at: DateTime<Utc>,
}

impl EnrollmentRecord {
    /// A fresh enrollment with no cursor and no quiz results.
    #[must_use]
    pub fn started(course_id: CourseId, learner_id: LearnerId, at: DateTime<Utc>) -> Self {
        Self {
            course_id,
            learner_id,
            current_material: None,
            quizzes: EnrollmentInfo::default(),
            updated_at: at,
        }
    }
}

/// Repository contract for course trees.
///
/// Stored trees carry no learner state; `get_course` always returns a course
/// with no cursor and an empty result map.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist a course, replacing any previously stored tree.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course tree in stored array order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// List stored courses ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_courses(&self, limit: u32) -> Result<Vec<CourseSummary>, StorageError>;
}

/// Repository contract for learner enrollments.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_enrollment(
        &self,
        course_id: CourseId,
        learner_id: LearnerId,
    ) -> Result<Option<EnrollmentRecord>, StorageError>;

    /// Persist the cursor and timestamp of an enrollment. Quiz results are
    /// written through [`EnrollmentRepository::record_quiz_result`] only.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the course is not stored, or
    /// another `StorageError` if the record cannot be written.
    async fn upsert_enrollment(&self, record: &EnrollmentRecord) -> Result<(), StorageError>;

    /// Store the latest score of a quiz group, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the enrollment does not exist.
    async fn record_quiz_result(
        &self,
        course_id: CourseId,
        learner_id: LearnerId,
        material_id: MaterialId,
        score: f64,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    enrollments: Arc<Mutex<HashMap<(CourseId, LearnerId), EnrollmentRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let tree = course
            .clone()
            .with_enrollment(None, EnrollmentInfo::default());
        guard.insert(course.id, tree);
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_courses(&self, limit: u32) -> Result<Vec<CourseSummary>, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut summaries: Vec<CourseSummary> = guard
            .values()
            .map(|course| CourseSummary {
                id: course.id,
                title: course.title.clone(),
                description: course.description.clone(),
            })
            .collect();
        summaries.sort_by_key(|summary| summary.id);
        summaries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(summaries)
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn get_enrollment(
        &self,
        course_id: CourseId,
        learner_id: LearnerId,
    ) -> Result<Option<EnrollmentRecord>, StorageError> {
        let guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(course_id, learner_id)).cloned())
    }

    async fn upsert_enrollment(&self, record: &EnrollmentRecord) -> Result<(), StorageError> {
        let course_known = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .contains_key(&record.course_id);
        if !course_known {
            return Err(StorageError::Conflict);
        }

        let mut guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let key = (record.course_id, record.learner_id);
        let quizzes = guard
            .get(&key)
            .map(|existing| existing.quizzes.clone())
            .unwrap_or_default();
        guard.insert(
            key,
            EnrollmentRecord {
                quizzes,
                ..record.clone()
            },
        );
        Ok(())
    }

    async fn record_quiz_result(
        &self,
        course_id: CourseId,
        learner_id: LearnerId,
        material_id: MaterialId,
        score: f64,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let record = guard
            .get_mut(&(course_id, learner_id))
            .ok_or(StorageError::NotFound)?;
        record.quizzes.quizzes_result.insert(material_id, score);
        record.updated_at = at;
        Ok(())
    }
}

/// Aggregates course and enrollment repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(repo);
        Self {
            courses,
            enrollments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{Lesson, LessonId, Material, MaterialKind, Module, ModuleId};
    use course_core::time::fixed_now;

    fn build_course(id: u64) -> Course {
        Course::new(
            CourseId::new(id),
            format!("Course {id}"),
            None,
            vec![Module {
                id: ModuleId::new(1),
                title: "Intro".into(),
                lessons: vec![Lesson {
                    id: LessonId::new(1),
                    name: "Welcome".into(),
                    description: None,
                    materials: vec![Material::new(
                        MaterialId::new(1),
                        "Hello",
                        0,
                        12.0,
                        MaterialKind::Video { youtube_id: None },
                    )],
                }],
            }],
        )
    }

    #[tokio::test]
    async fn stored_course_drops_learner_state() {
        let repo = InMemoryRepository::new();
        let course = build_course(1).with_enrollment(
            Some(MaterialId::new(1)),
            EnrollmentInfo::default(),
        );
        repo.upsert_course(&course).await.unwrap();

        let fetched = repo.get_course(CourseId::new(1)).await.unwrap().unwrap();
        assert_eq!(fetched.current_material, None);
        assert_eq!(fetched.modules, course.modules);
    }

    #[tokio::test]
    async fn lists_courses_by_id_with_limit() {
        let repo = InMemoryRepository::new();
        for id in [3, 1, 2] {
            repo.upsert_course(&build_course(id)).await.unwrap();
        }
        let listed = repo.list_courses(2).await.unwrap();
        let ids: Vec<u64> = listed.iter().map(|c| c.id.value()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn upsert_enrollment_keeps_quiz_results() {
        let repo = InMemoryRepository::new();
        let (course, learner) = (CourseId::new(1), LearnerId::new(7));
        repo.upsert_course(&build_course(1)).await.unwrap();
        let mut record = EnrollmentRecord::started(course, learner, fixed_now());
        repo.upsert_enrollment(&record).await.unwrap();
        repo.record_quiz_result(course, learner, MaterialId::new(4), 50.0, fixed_now())
            .await
            .unwrap();

        record.current_material = Some(MaterialId::new(2));
        repo.upsert_enrollment(&record).await.unwrap();

        let fetched = repo.get_enrollment(course, learner).await.unwrap().unwrap();
        assert_eq!(fetched.current_material, Some(MaterialId::new(2)));
        assert!((fetched.quizzes.quiz_result(MaterialId::new(4)) - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn enrollment_requires_stored_course() {
        let repo = InMemoryRepository::new();
        let record = EnrollmentRecord::started(CourseId::new(5), LearnerId::new(1), fixed_now());
        let err = repo.upsert_enrollment(&record).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn quiz_result_requires_enrollment() {
        let repo = InMemoryRepository::new();
        let err = repo
            .record_quiz_result(
                CourseId::new(1),
                LearnerId::new(1),
                MaterialId::new(1),
                10.0,
                fixed_now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
