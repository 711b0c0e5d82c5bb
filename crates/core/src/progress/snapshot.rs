use crate::model::Course;
use crate::progress::cursor::{AnnotatedMaterial, CursorView};
use crate::progress::materializer::{MaterializedCourse, Materializer, ModuleProgress};
use crate::progress::ordering::{FlattenedMaterial, MaterialOrdering};

/// Everything the lesson player needs for one fetched course.
///
/// Rebuilt from scratch on each fetch; nothing is updated incrementally.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseProgress {
    course: Course,
    materialized: MaterializedCourse,
    cursor: CursorView,
}

impl CourseProgress {
    /// Returns the snapshot of `course` linearized with `ordering`.
    #[must_use]
    pub fn build(course: Course, ordering: MaterialOrdering) -> Self {
        let materialized = Materializer::new(ordering).materialize(&course);
        let cursor = CursorView::new(&materialized.sorted_materials, course.current_material);
        Self {
            course,
            materialized,
            cursor,
        }
    }

    /// Returns the course tree with the learner's state attached.
    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    /// Returns per-module aggregates in course order.
    #[must_use]
    pub fn modules(&self) -> &[ModuleProgress] {
        &self.materialized.modules
    }

    /// Returns the linearized materials without cursor state.
    #[must_use]
    pub fn sorted_materials(&self) -> &[FlattenedMaterial] {
        &self.materialized.sorted_materials
    }

    /// Returns the linearized materials annotated against the cursor.
    #[must_use]
    pub fn materials(&self) -> &[AnnotatedMaterial] {
        self.cursor.materials()
    }

    /// Returns the material the learner is on.
    #[must_use]
    pub fn current_material(&self) -> Option<&FlattenedMaterial> {
        self.cursor.current_material()
    }

    /// Returns the index of [`CourseProgress::current_material`].
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.cursor.current_index()
    }

    /// Returns the material after the current one.
    #[must_use]
    pub fn next_material(&self) -> Option<&FlattenedMaterial> {
        self.cursor.next_material()
    }

    /// Returns the material before the current one.
    #[must_use]
    pub fn prev_material(&self) -> Option<&FlattenedMaterial> {
        self.cursor.prev_material()
    }

    /// Returns the number of materials in the course.
    #[must_use]
    pub fn materials_count(&self) -> usize {
        self.cursor.materials_count()
    }

    /// Returns the number of materials before the cursor.
    #[must_use]
    pub fn completed_materials(&self) -> usize {
        self.cursor.completed_materials()
    }

    /// Returns course completion as a rounded percentage.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.cursor.progress()
    }

    /// Returns the summed duration of the linearized materials.
    #[must_use]
    pub fn materials_duration(&self) -> f64 {
        self.cursor.materials_duration()
    }

    /// Returns the summed duration of the raw course tree.
    #[must_use]
    pub fn total_duration(&self) -> f64 {
        self.course.total_duration()
    }

    /// Returns the number of lessons containing the cursor material.
    #[must_use]
    pub fn completed_lessons_count(&self) -> usize {
        self.course.completed_lessons_count()
    }

    /// Returns the number of lessons across all modules.
    #[must_use]
    pub fn total_lessons(&self) -> usize {
        self.course.total_lessons()
    }

    /// Returns the underlying cursor view.
    #[must_use]
    pub fn cursor(&self) -> &CursorView {
        &self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CourseId, EnrollmentInfo, Lesson, LessonId, Material, MaterialId, MaterialKind, Module,
        ModuleId,
    };

    fn course() -> Course {
        let lesson = |id: u64, materials: Vec<Material>| Lesson {
            id: LessonId::new(id),
            name: format!("L{id}"),
            description: None,
            materials,
        };
        let video = |id: u64, order: i64, duration: f64| {
            Material::new(
                MaterialId::new(id),
                format!("V{id}"),
                order,
                duration,
                MaterialKind::Video { youtube_id: None },
            )
        };
        Course::new(
            CourseId::new(1),
            "C",
            None,
            vec![
                Module {
                    id: ModuleId::new(1),
                    title: "A".into(),
                    lessons: vec![
                        lesson(1, vec![video(1, 1, 30.0), video(2, 0, 45.0)]),
                        lesson(2, vec![video(3, 0, 15.0)]),
                    ],
                },
                Module {
                    id: ModuleId::new(2),
                    title: "Empty".into(),
                    lessons: vec![],
                },
            ],
        )
        .with_enrollment(Some(MaterialId::new(3)), EnrollmentInfo::default())
    }

    #[test]
    fn exposes_player_fields() {
        let progress = CourseProgress::build(course(), MaterialOrdering::default());

        assert_eq!(progress.materials_count(), 3);
        assert_eq!(progress.completed_materials(), 2);
        assert_eq!(progress.progress(), 67);
        assert_eq!(progress.current_index(), Some(2));
        assert_eq!(
            progress.current_material().map(FlattenedMaterial::id),
            Some(MaterialId::new(3))
        );
        assert_eq!(
            progress.prev_material().map(FlattenedMaterial::id),
            Some(MaterialId::new(1))
        );
        assert!(progress.next_material().is_none());
        assert_eq!(progress.total_lessons(), 2);
        assert_eq!(progress.completed_lessons_count(), 1);
        assert_eq!(progress.modules()[1].progress, 0);
    }

    #[test]
    fn tree_and_list_durations_agree() {
        let progress = CourseProgress::build(course(), MaterialOrdering::default());
        assert!((progress.total_duration() - progress.materials_duration()).abs() < 1e-9);
        assert!((progress.total_duration() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn build_is_deterministic() {
        let a = CourseProgress::build(course(), MaterialOrdering::default());
        let b = CourseProgress::build(course(), MaterialOrdering::default());
        assert_eq!(a, b);
    }
}
