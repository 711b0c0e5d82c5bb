use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use course_core::model::{CourseId, LearnerId};
use course_core::{Clock, CourseProgress, MaterialOrdering};

use crate::course_source::CourseSource;
use crate::error::FetchError;

/// A successfully fetched and materialized course.
#[derive(Debug, Clone)]
pub struct LoadedCourse {
    pub learner_id: LearnerId,
    pub fetched_at: DateTime<Utc>,
    pub progress: CourseProgress,
}

/// What the lesson player currently has to show.
#[derive(Debug, Clone)]
pub enum LoadState {
    Idle,
    Loading {
        course_id: CourseId,
    },
    Loaded(Arc<LoadedCourse>),
    Failed {
        course_id: CourseId,
        error: Arc<FetchError>,
    },
}

/// Result of a single `load` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The response became the current state.
    Applied,
    /// The fetch failed and the failure became the current state.
    Failed,
    /// A newer load was started meanwhile; the response was discarded.
    Stale,
}

/// Fetches a course and keeps the latest materialized snapshot.
///
/// Each `load` takes a new request generation. When a response arrives after
/// a newer load has begun, it is dropped instead of overwriting the newer
/// state.
#[derive(Clone)]
pub struct CourseProgressService {
    clock: Clock,
    ordering: MaterialOrdering,
    source: Arc<dyn CourseSource>,
    generation: Arc<AtomicU64>,
    state: Arc<Mutex<LoadState>>,
}

impl CourseProgressService {
    #[must_use]
    pub fn new(clock: Clock, source: Arc<dyn CourseSource>) -> Self {
        Self {
            clock,
            ordering: MaterialOrdering::default(),
            source,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(Mutex::new(LoadState::Idle)),
        }
    }

    #[must_use]
    pub fn with_ordering(mut self, ordering: MaterialOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    fn lock_state(&self) -> MutexGuard<'_, LoadState> {
        // State is replaced wholesale, so a poisoned guard still holds a valid value.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the course for a learner and rebuild the snapshot.
    ///
    /// Failures are recorded in [`LoadState::Failed`] rather than returned.
    pub async fn load(&self, course_id: CourseId, learner_id: LearnerId) -> LoadOutcome {
        let generation = {
            let mut state = self.lock_state();
            *state = LoadState::Loading { course_id };
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        tracing::debug!(%course_id, %learner_id, generation, "loading course");

        let fetched = self.source.fetch_course(course_id, learner_id).await;

        let mut state = self.lock_state();
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(%course_id, generation, "discarding stale course response");
            return LoadOutcome::Stale;
        }

        match fetched {
            Ok(course) => {
                let progress = CourseProgress::build(course, self.ordering);
                tracing::debug!(
                    %course_id,
                    materials = progress.materials_count(),
                    progress = progress.progress(),
                    "course loaded"
                );
                *state = LoadState::Loaded(Arc::new(LoadedCourse {
                    learner_id,
                    fetched_at: self.clock.now(),
                    progress,
                }));
                LoadOutcome::Applied
            }
            Err(error) => {
                tracing::warn!(%course_id, %error, "course fetch failed");
                *state = LoadState::Failed {
                    course_id,
                    error: Arc::new(error),
                };
                LoadOutcome::Failed
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> LoadState {
        self.lock_state().clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<LoadedCourse>> {
        match &*self.lock_state() {
            LoadState::Loaded(loaded) => Some(Arc::clone(loaded)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(*self.lock_state(), LoadState::Loading { .. })
    }

    #[must_use]
    pub fn error(&self) -> Option<Arc<FetchError>> {
        match &*self.lock_state() {
            LoadState::Failed { error, .. } => Some(Arc::clone(error)),
            _ => None,
        }
    }
}
