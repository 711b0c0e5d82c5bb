use crate::model::{Course, Lesson, LessonId, Material, MaterialId, ModuleId};

/// Policy deciding the sequence in which a lesson's materials are walked.
///
/// Both per-module aggregates and cursor navigation linearize the course with
/// the same policy, so they always agree on which materials are behind the
/// cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MaterialOrdering {
    /// Stored array order.
    AsReceived,
    /// Stable sort by the material `order` field within each lesson.
    #[default]
    ByOrderField,
}

impl MaterialOrdering {
    /// Materials of one lesson in policy order.
    #[must_use]
    pub fn lesson_sequence(self, lesson: &Lesson) -> Vec<&Material> {
        let mut materials: Vec<&Material> = lesson.materials.iter().collect();
        if self == MaterialOrdering::ByOrderField {
            // `sort_by_key` is stable: equal `order` values keep array order.
            materials.sort_by_key(|material| material.order);
        }
        materials
    }
}

/// A material positioned in the course-wide sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedMaterial {
    pub material: Material,
    pub module_id: ModuleId,
    pub lesson_id: LessonId,
    /// 1-based index of the owning module.
    pub module_number: usize,
    /// 1-based position within the owning module's stream.
    pub material_number: usize,
    /// Prior score for quiz groups (0 when none recorded); `None` otherwise.
    pub old_result: Option<f64>,
}

impl FlattenedMaterial {
    #[must_use]
    pub fn id(&self) -> MaterialId {
        self.material.id
    }

    #[must_use]
    pub fn duration(&self) -> f64 {
        self.material.duration
    }
}

/// Flatten modules → lessons → materials into one totally ordered list.
#[must_use]
pub fn linearize(course: &Course, ordering: MaterialOrdering) -> Vec<FlattenedMaterial> {
    let mut flat = Vec::new();
    for (module_index, module) in course.modules.iter().enumerate() {
        let mut material_number = 0;
        for lesson in &module.lessons {
            for material in ordering.lesson_sequence(lesson) {
                material_number += 1;
                let old_result = material
                    .kind
                    .is_quiz_group()
                    .then(|| course.enrollment.quiz_result(material.id));
                flat.push(FlattenedMaterial {
                    material: material.clone(),
                    module_id: module.id,
                    lesson_id: lesson.id,
                    module_number: module_index + 1,
                    material_number,
                    old_result,
                });
            }
        }
    }
    flat
}

/// Position of the first material with the given id.
#[must_use]
pub fn position_of(materials: &[FlattenedMaterial], id: MaterialId) -> Option<usize> {
    materials.iter().position(|material| material.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseId, MaterialKind, Module};

    fn material(id: u64, order: i64) -> Material {
        Material::new(
            MaterialId::new(id),
            format!("M{id}"),
            order,
            10.0,
            MaterialKind::Article { body: None },
        )
    }

    fn lesson(id: u64, materials: Vec<Material>) -> Lesson {
        Lesson {
            id: LessonId::new(id),
            name: format!("L{id}"),
            description: None,
            materials,
        }
    }

    fn two_module_course() -> Course {
        Course::new(
            CourseId::new(1),
            "C",
            None,
            vec![
                Module {
                    id: ModuleId::new(1),
                    title: "A".into(),
                    lessons: vec![
                        lesson(1, vec![material(1, 2), material(2, 0)]),
                        lesson(2, vec![material(3, 0)]),
                    ],
                },
                Module {
                    id: ModuleId::new(2),
                    title: "B".into(),
                    lessons: vec![lesson(3, vec![material(4, 5), material(5, 1)])],
                },
            ],
        )
    }

    fn ids(flat: &[FlattenedMaterial]) -> Vec<u64> {
        flat.iter().map(|m| m.id().value()).collect()
    }

    #[test]
    fn sorts_within_lessons_only() {
        let flat = linearize(&two_module_course(), MaterialOrdering::ByOrderField);
        assert_eq!(ids(&flat), vec![2, 1, 3, 5, 4]);
    }

    #[test]
    fn as_received_keeps_array_order() {
        let flat = linearize(&two_module_course(), MaterialOrdering::AsReceived);
        assert_eq!(ids(&flat), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn numbers_restart_per_module() {
        let flat = linearize(&two_module_course(), MaterialOrdering::ByOrderField);
        let numbers: Vec<(usize, usize)> = flat
            .iter()
            .map(|m| (m.module_number, m.material_number))
            .collect();
        assert_eq!(numbers, vec![(1, 1), (1, 2), (1, 3), (2, 1), (2, 2)]);
    }

    #[test]
    fn equal_orders_are_stable() {
        let course = Course::new(
            CourseId::new(1),
            "C",
            None,
            vec![Module {
                id: ModuleId::new(1),
                title: "A".into(),
                lessons: vec![lesson(1, vec![material(7, 0), material(8, 0), material(9, 0)])],
            }],
        );
        let flat = linearize(&course, MaterialOrdering::ByOrderField);
        assert_eq!(ids(&flat), vec![7, 8, 9]);
    }

    #[test]
    fn only_quiz_groups_carry_results() {
        let mut course = Course::new(
            CourseId::new(1),
            "C",
            None,
            vec![Module {
                id: ModuleId::new(1),
                title: "A".into(),
                lessons: vec![lesson(
                    1,
                    vec![
                        material(1, 0),
                        Material::new(
                            MaterialId::new(2),
                            "Quiz",
                            1,
                            0.0,
                            MaterialKind::QuizGroup { quizzes: vec![] },
                        ),
                    ],
                )],
            }],
        );
        course
            .enrollment
            .quizzes_result
            .insert(MaterialId::new(2), 90.0);

        let flat = linearize(&course, MaterialOrdering::ByOrderField);
        assert_eq!(flat[0].old_result, None);
        assert_eq!(flat[1].old_result, Some(90.0));
    }
}
