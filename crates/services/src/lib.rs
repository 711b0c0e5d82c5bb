#![forbid(unsafe_code)]

pub mod app_services;
pub mod course_progress_service;
pub mod course_source;
pub mod enrollment_service;
pub mod error;
pub mod http_source;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use course_progress_service::{CourseProgressService, LoadOutcome, LoadState, LoadedCourse};
pub use course_source::{CourseSource, StorageCourseSource};
pub use enrollment_service::{AdvanceOutcome, EnrollmentService};
pub use error::{AppServicesError, EnrollmentError, FetchError};
pub use http_source::{HttpCourseSource, HttpSourceConfig};
