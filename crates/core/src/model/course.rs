use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, LessonId, MaterialId, ModuleId};
use crate::model::material::Material;

/// Ordered group of materials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub name: String,
    pub description: Option<String>,
    pub materials: Vec<Material>,
}

/// Ordered group of lessons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    pub lessons: Vec<Lesson>,
}

impl Module {
    /// Materials of this module in stored array order.
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.lessons.iter().flat_map(|lesson| lesson.materials.iter())
    }
}

/// Per-learner enrollment details attached to a fetched course.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentInfo {
    /// Quiz-group id → last recorded score.
    pub quizzes_result: HashMap<MaterialId, f64>,
}

impl EnrollmentInfo {
    /// Previously recorded score for a quiz group, 0 when none was recorded.
    #[must_use]
    pub fn quiz_result(&self, material_id: MaterialId) -> f64 {
        self.quizzes_result.get(&material_id).copied().unwrap_or(0.0)
    }
}

/// A course as seen by one learner: the nested tree plus their cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub modules: Vec<Module>,
    /// Furthest-reached material; `None` when the learner has not started.
    pub current_material: Option<MaterialId>,
    pub enrollment: EnrollmentInfo,
}

impl Course {
    /// A course tree without any learner state.
    #[must_use]
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        description: Option<String>,
        modules: Vec<Module>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description,
            modules,
            current_material: None,
            enrollment: EnrollmentInfo::default(),
        }
    }

    /// Attach a learner's cursor and quiz results to this tree.
    #[must_use]
    pub fn with_enrollment(
        mut self,
        current_material: Option<MaterialId>,
        enrollment: EnrollmentInfo,
    ) -> Self {
        self.current_material = current_material;
        self.enrollment = enrollment;
        self
    }

    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.modules.iter().flat_map(|module| module.lessons.iter())
    }

    /// All materials in stored array order (modules → lessons → materials).
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.lessons().flat_map(|lesson| lesson.materials.iter())
    }

    #[must_use]
    pub fn find_material(&self, id: MaterialId) -> Option<&Material> {
        self.materials().find(|material| material.id == id)
    }

    /// Sum of material durations, walking the nested tree directly.
    #[must_use]
    pub fn total_duration(&self) -> f64 {
        self.modules
            .iter()
            .flat_map(|module| &module.lessons)
            .flat_map(|lesson| &lesson.materials)
            .map(|material| material.duration)
            .sum()
    }

    /// Number of lessons holding a material whose id equals the cursor.
    ///
    /// This is 0 or 1 unless the same material id appears in several lessons.
    /// It does not count lessons whose materials all lie before the cursor.
    #[must_use]
    pub fn completed_lessons_count(&self) -> usize {
        let Some(cursor) = self.current_material else {
            return 0;
        };
        self.lessons()
            .filter(|lesson| lesson.materials.iter().any(|m| m.id == cursor))
            .count()
    }

    #[must_use]
    pub fn total_lessons(&self) -> usize {
        self.lessons().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::material::MaterialKind;

    fn video(id: u64, duration: f64) -> Material {
        Material::new(
            MaterialId::new(id),
            format!("Video {id}"),
            0,
            duration,
            MaterialKind::Video { youtube_id: None },
        )
    }

    fn course() -> Course {
        Course::new(
            CourseId::new(1),
            "Rust",
            None,
            vec![Module {
                id: ModuleId::new(1),
                title: "Basics".into(),
                lessons: vec![
                    Lesson {
                        id: LessonId::new(1),
                        name: "Ownership".into(),
                        description: None,
                        materials: vec![video(1, 60.0), video(2, 30.0)],
                    },
                    Lesson {
                        id: LessonId::new(2),
                        name: "Borrowing".into(),
                        description: None,
                        materials: vec![video(3, 15.5)],
                    },
                ],
            }],
        )
    }

    #[test]
    fn total_duration_walks_tree() {
        assert!((course().total_duration() - 105.5).abs() < 1e-9);
    }

    #[test]
    fn completed_lessons_counts_lesson_holding_cursor() {
        let c = course();
        assert_eq!(c.completed_lessons_count(), 0);

        let c = c.with_enrollment(Some(MaterialId::new(3)), EnrollmentInfo::default());
        // Lesson 1 is fully behind the cursor but only the cursor's lesson counts.
        assert_eq!(c.completed_lessons_count(), 1);
        assert_eq!(c.total_lessons(), 2);
    }

    #[test]
    fn quiz_result_defaults_to_zero() {
        let mut info = EnrollmentInfo::default();
        info.quizzes_result.insert(MaterialId::new(5), 80.0);
        assert!((info.quiz_result(MaterialId::new(5)) - 80.0).abs() < f64::EPSILON);
        assert!(info.quiz_result(MaterialId::new(6)).abs() < f64::EPSILON);
    }
}
