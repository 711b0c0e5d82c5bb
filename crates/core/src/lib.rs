#![forbid(unsafe_code)]

pub mod model;
pub mod payload;
pub mod progress;
pub mod time;

pub use payload::{PayloadError, decode_course};
pub use progress::{CourseProgress, MaterialOrdering};
pub use time::Clock;
