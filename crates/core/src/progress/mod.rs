//! Course linearization and cursor-relative progress.

mod cursor;
mod materializer;
mod ordering;
mod snapshot;

pub use cursor::{AnnotatedMaterial, CursorView, MaterialState};
pub use materializer::{
    LessonProgress, MaterializedCourse, Materializer, MaterialProgress, ModuleProgress,
};
pub use ordering::{FlattenedMaterial, MaterialOrdering, linearize, position_of};
pub use snapshot::CourseProgress;

/// `floor(done / total * 100)`, 0 when `total` is 0.
#[must_use]
pub fn floor_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (done as u128 * 100) / total as u128;
    u8::try_from(pct.min(100)).unwrap_or(100)
}

/// `round(done / total * 100)` with halves rounded up, 0 when `total` is 0.
#[must_use]
pub fn round_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let total = total as u128;
    let pct = (done as u128 * 200 + total) / (2 * total);
    u8::try_from(pct.min(100)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_percent_truncates() {
        assert_eq!(floor_percent(1, 3), 33);
        assert_eq!(floor_percent(2, 3), 66);
        assert_eq!(floor_percent(3, 3), 100);
        assert_eq!(floor_percent(0, 0), 0);
    }

    #[test]
    fn round_percent_rounds_half_up() {
        assert_eq!(round_percent(1, 3), 33);
        assert_eq!(round_percent(2, 3), 67);
        assert_eq!(round_percent(1, 8), 13);
        assert_eq!(round_percent(0, 5), 0);
        assert_eq!(round_percent(7, 0), 0);
    }

    #[test]
    fn percents_stay_in_bounds() {
        for total in 1..=50 {
            for done in 0..=total {
                assert!(floor_percent(done, total) <= 100);
                assert!(round_percent(done, total) <= 100);
            }
        }
    }
}
