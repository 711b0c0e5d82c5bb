use std::collections::HashMap;

use crate::model::{Course, LessonId, Material, MaterialId, ModuleId};
use crate::progress::floor_percent;
use crate::progress::ordering::{FlattenedMaterial, MaterialOrdering, linearize, position_of};

/// A material inside the per-module view, flagged against the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialProgress {
    pub material: Material,
    pub is_finished: bool,
    /// Previously recorded score for quiz groups, 0 when none; `None` for other kinds.
    pub old_result: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LessonProgress {
    pub id: LessonId,
    pub name: String,
    pub description: Option<String>,
    pub materials: Vec<MaterialProgress>,
}

/// A module with its aggregate completion counters.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleProgress {
    pub id: ModuleId,
    pub title: String,
    pub module_number: usize,
    pub lessons: Vec<LessonProgress>,
    pub total_materials: usize,
    pub completed_materials: usize,
    /// `floor(completed / total * 100)`, 0 for an empty module.
    pub progress: u8,
}

/// Output of [`Materializer::materialize`].
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedCourse {
    pub modules: Vec<ModuleProgress>,
    /// Materials strictly before the cursor.
    pub completed_materials: usize,
    pub total_materials: usize,
    pub sorted_materials: Vec<FlattenedMaterial>,
}

/// Turns a nested course into per-module aggregates and a flat material list.
///
/// Pure: the same course always yields the same output, and the input is
/// never modified.
#[derive(Debug, Clone, Copy, Default)]
pub struct Materializer {
    ordering: MaterialOrdering,
}

impl Materializer {
    #[must_use]
    pub fn new(ordering: MaterialOrdering) -> Self {
        Self { ordering }
    }

    #[must_use]
    pub fn ordering(&self) -> MaterialOrdering {
        self.ordering
    }

    #[must_use]
    pub fn materialize(&self, course: &Course) -> MaterializedCourse {
        let sorted_materials = linearize(course, self.ordering);
        let cursor = course
            .current_material
            .and_then(|id| position_of(&sorted_materials, id));

        // First occurrence wins when ids repeat.
        let mut first_index: HashMap<MaterialId, usize> =
            HashMap::with_capacity(sorted_materials.len());
        for (index, material) in sorted_materials.iter().enumerate() {
            first_index.entry(material.id()).or_insert(index);
        }
        let is_finished = |id: MaterialId| match (cursor, first_index.get(&id)) {
            (Some(cursor), Some(&index)) => index < cursor,
            _ => false,
        };

        let modules = course
            .modules
            .iter()
            .enumerate()
            .map(|(module_index, module)| {
                let mut total = 0_usize;
                let mut completed = 0_usize;
                let lessons = module
                    .lessons
                    .iter()
                    .map(|lesson| {
                        let materials = self
                            .ordering
                            .lesson_sequence(lesson)
                            .into_iter()
                            .map(|material| {
                                let finished = is_finished(material.id);
                                total += 1;
                                if finished {
                                    completed += 1;
                                }
                                MaterialProgress {
                                    material: material.clone(),
                                    is_finished: finished,
                                    old_result: material
                                        .kind
                                        .is_quiz_group()
                                        .then(|| course.enrollment.quiz_result(material.id)),
                                }
                            })
                            .collect();
                        LessonProgress {
                            id: lesson.id,
                            name: lesson.name.clone(),
                            description: lesson.description.clone(),
                            materials,
                        }
                    })
                    .collect();

                ModuleProgress {
                    id: module.id,
                    title: module.title.clone(),
                    module_number: module_index + 1,
                    lessons,
                    total_materials: total,
                    completed_materials: completed,
                    progress: floor_percent(completed, total),
                }
            })
            .collect();

        MaterializedCourse {
            modules,
            completed_materials: cursor.unwrap_or(0),
            total_materials: sorted_materials.len(),
            sorted_materials,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseId, EnrollmentInfo, Lesson, MaterialKind, Module};

    fn material(id: u64, order: i64) -> Material {
        Material::new(
            MaterialId::new(id),
            format!("M{id}"),
            order,
            60.0,
            MaterialKind::Video { youtube_id: None },
        )
    }

    fn module(id: u64, materials: Vec<Material>) -> Module {
        Module {
            id: ModuleId::new(id),
            title: format!("Module {id}"),
            lessons: vec![Lesson {
                id: LessonId::new(id),
                name: format!("Lesson {id}"),
                description: None,
                materials,
            }],
        }
    }

    fn course(modules: Vec<Module>, cursor: Option<u64>) -> Course {
        Course::new(CourseId::new(1), "Course", None, modules)
            .with_enrollment(cursor.map(MaterialId::new), EnrollmentInfo::default())
    }

    #[test]
    fn module_aggregates_follow_cursor() {
        let c = course(
            vec![
                module(1, vec![material(1, 0), material(2, 1), material(3, 2)]),
                module(2, vec![material(4, 0), material(5, 1)]),
            ],
            Some(4),
        );

        let out = Materializer::default().materialize(&c);
        assert_eq!(out.total_materials, 5);
        assert_eq!(out.completed_materials, 3);

        assert_eq!(out.modules[0].completed_materials, 3);
        assert_eq!(out.modules[0].progress, 100);
        assert_eq!(out.modules[1].completed_materials, 0);
        assert_eq!(out.modules[1].progress, 0);
    }

    #[test]
    fn module_progress_floors() {
        let c = course(
            vec![module(1, vec![material(1, 0), material(2, 1), material(3, 2)])],
            Some(2),
        );
        let out = Materializer::default().materialize(&c);
        // 1/3 → 33.33 → 33
        assert_eq!(out.modules[0].progress, 33);
    }

    #[test]
    fn empty_module_has_zero_progress() {
        let c = course(vec![module(1, vec![])], None);
        let out = Materializer::default().materialize(&c);
        assert_eq!(out.modules[0].total_materials, 0);
        assert_eq!(out.modules[0].progress, 0);
        assert_eq!(out.total_materials, 0);
    }

    #[test]
    fn aggregate_and_cursor_share_ordering() {
        // Array order [2, 0, 1] by `order`; cursor on the order=1 material.
        let c = course(
            vec![module(1, vec![material(10, 2), material(11, 0), material(12, 1)])],
            Some(12),
        );
        let out = Materializer::default().materialize(&c);

        let finished: Vec<(u64, bool)> = out.modules[0].lessons[0]
            .materials
            .iter()
            .map(|m| (m.material.id.value(), m.is_finished))
            .collect();
        assert_eq!(finished, vec![(11, true), (12, false), (10, false)]);
        assert_eq!(out.modules[0].completed_materials, out.completed_materials);
    }

    #[test]
    fn as_received_ordering_uses_array_order() {
        let c = course(
            vec![module(1, vec![material(10, 2), material(11, 0), material(12, 1)])],
            Some(12),
        );
        let out = Materializer::new(MaterialOrdering::AsReceived).materialize(&c);
        assert_eq!(out.completed_materials, 2);
        assert_eq!(out.modules[0].completed_materials, 2);
    }

    #[test]
    fn unknown_cursor_completes_nothing() {
        let c = course(vec![module(1, vec![material(1, 0)])], Some(99));
        let out = Materializer::default().materialize(&c);
        assert_eq!(out.completed_materials, 0);
        assert!(!out.modules[0].lessons[0].materials[0].is_finished);
    }

    #[test]
    fn missing_quiz_result_defaults_to_zero() {
        let quiz = Material::new(
            MaterialId::new(3),
            "Quiz",
            0,
            0.0,
            MaterialKind::QuizGroup { quizzes: vec![] },
        );
        let c = course(vec![module(1, vec![quiz])], None);
        let out = Materializer::default().materialize(&c);
        assert_eq!(out.modules[0].lessons[0].materials[0].old_result, Some(0.0));
        assert_eq!(out.sorted_materials[0].old_result, Some(0.0));
    }

    #[test]
    fn materialize_is_idempotent() {
        let c = course(
            vec![module(1, vec![material(1, 3), material(2, 1)])],
            Some(1),
        );
        let before = c.clone();
        let m = Materializer::default();
        assert_eq!(m.materialize(&c), m.materialize(&c));
        assert_eq!(c, before);
    }
}
