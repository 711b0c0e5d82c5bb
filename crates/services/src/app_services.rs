use std::sync::Arc;

use course_core::{Clock, MaterialOrdering};
use storage::repository::Storage;

use crate::course_progress_service::CourseProgressService;
use crate::course_source::{CourseSource, StorageCourseSource};
use crate::enrollment_service::EnrollmentService;
use crate::error::AppServicesError;
use crate::http_source::{HttpCourseSource, HttpSourceConfig};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    course_progress: Arc<CourseProgressService>,
    enrollments: Arc<EnrollmentService>,
}

impl AppServices {
    /// Build services over an existing storage, reading courses locally.
    #[must_use]
    pub fn new(storage: Storage, clock: Clock, ordering: MaterialOrdering) -> Self {
        let source: Arc<dyn CourseSource> = Arc::new(StorageCourseSource::new(
            Arc::clone(&storage.courses),
            Arc::clone(&storage.enrollments),
        ));
        Self::with_source(storage, clock, ordering, source)
    }

    /// Build services whose progress loader uses the given source.
    #[must_use]
    pub fn with_source(
        storage: Storage,
        clock: Clock,
        ordering: MaterialOrdering,
        source: Arc<dyn CourseSource>,
    ) -> Self {
        let course_progress =
            Arc::new(CourseProgressService::new(clock, source).with_ordering(ordering));
        let enrollments = Arc::new(
            EnrollmentService::new(
                clock,
                Arc::clone(&storage.courses),
                Arc::clone(&storage.enrollments),
            )
            .with_ordering(ordering),
        );
        Self {
            storage,
            course_progress,
            enrollments,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        ordering: MaterialOrdering,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(storage, clock, ordering))
    }

    /// Build services whose loader reads from the remote course API.
    #[must_use]
    pub fn new_remote(
        storage: Storage,
        clock: Clock,
        ordering: MaterialOrdering,
        config: HttpSourceConfig,
    ) -> Self {
        let source: Arc<dyn CourseSource> = Arc::new(HttpCourseSource::new(config));
        Self::with_source(storage, clock, ordering, source)
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn course_progress(&self) -> Arc<CourseProgressService> {
        Arc::clone(&self.course_progress)
    }

    #[must_use]
    pub fn enrollments(&self) -> Arc<EnrollmentService> {
        Arc::clone(&self.enrollments)
    }
}
