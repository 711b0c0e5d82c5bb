mod course;
mod ids;
mod material;

pub use course::{Course, EnrollmentInfo, Lesson, Module};
pub use ids::{CourseId, LearnerId, LessonId, MaterialId, ModuleId, ParseIdError};
pub use material::{Material, MaterialKind, Quiz, sanitize_duration};
