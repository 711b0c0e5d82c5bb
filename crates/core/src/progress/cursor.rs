use crate::model::MaterialId;
use crate::progress::ordering::{FlattenedMaterial, position_of};
use crate::progress::round_percent;

/// Where a material sits relative to the learner's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialState {
    Completed,
    Current,
    Locked,
}

impl MaterialState {
    /// State of the material at `index` given the cursor position.
    ///
    /// Without a cursor every material is locked.
    #[must_use]
    pub fn relative_to(index: usize, cursor: Option<usize>) -> Self {
        match cursor {
            Some(cursor) if index < cursor => MaterialState::Completed,
            Some(cursor) if index == cursor => MaterialState::Current,
            _ => MaterialState::Locked,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedMaterial {
    pub material: FlattenedMaterial,
    pub state: MaterialState,
}

impl AnnotatedMaterial {
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.state == MaterialState::Current
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.state == MaterialState::Completed
    }

    #[must_use]
    pub fn locked(&self) -> bool {
        self.state == MaterialState::Locked
    }
}

/// Navigation and progress derived from the sorted materials and the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorView {
    materials: Vec<AnnotatedMaterial>,
    cursor_index: Option<usize>,
    current_index: Option<usize>,
    materials_duration: f64,
}

impl CursorView {
    #[must_use]
    pub fn new(
        sorted_materials: &[FlattenedMaterial],
        current_material: Option<MaterialId>,
    ) -> Self {
        let cursor_index = current_material.and_then(|id| position_of(sorted_materials, id));

        let materials = sorted_materials
            .iter()
            .enumerate()
            .map(|(index, material)| AnnotatedMaterial {
                material: material.clone(),
                state: MaterialState::relative_to(index, cursor_index),
            })
            .collect();

        // Exact match first, otherwise fall back to the first material.
        let resolved = current_material
            .and_then(|id| sorted_materials.iter().find(|m| m.id() == id))
            .or_else(|| sorted_materials.first());
        let current_index = resolved.and_then(|m| position_of(sorted_materials, m.id()));

        let materials_duration = sorted_materials.iter().map(FlattenedMaterial::duration).sum();

        Self {
            materials,
            cursor_index,
            current_index,
            materials_duration,
        }
    }

    /// Returns every material in sequence, annotated against the cursor.
    #[must_use]
    pub fn materials(&self) -> &[AnnotatedMaterial] {
        &self.materials
    }

    /// Index of the cursor in the sorted list; `None` when not found.
    #[must_use]
    pub fn cursor_index(&self) -> Option<usize> {
        self.cursor_index
    }

    /// Index of [`CursorView::current_material`], used for next/prev.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Returns the number of materials in the sequence.
    #[must_use]
    pub fn materials_count(&self) -> usize {
        self.materials.len()
    }

    /// Returns the number of materials before the cursor, 0 without one.
    #[must_use]
    pub fn completed_materials(&self) -> usize {
        self.cursor_index.unwrap_or(0)
    }

    /// Course completion, `round(completed / count * 100)`.
    #[must_use]
    pub fn progress(&self) -> u8 {
        round_percent(self.completed_materials(), self.materials_count())
    }

    /// Returns the summed duration of the sequence in seconds.
    #[must_use]
    pub fn materials_duration(&self) -> f64 {
        self.materials_duration
    }

    /// Returns the cursor material, falling back to the first one.
    #[must_use]
    pub fn current_material(&self) -> Option<&FlattenedMaterial> {
        self.current_index.map(|i| &self.materials[i].material)
    }

    /// Returns the material after [`CursorView::current_material`].
    #[must_use]
    pub fn next_material(&self) -> Option<&FlattenedMaterial> {
        let next = self.current_index? + 1;
        self.materials.get(next).map(|m| &m.material)
    }

    /// Returns the material before [`CursorView::current_material`].
    #[must_use]
    pub fn prev_material(&self) -> Option<&FlattenedMaterial> {
        let prev = self.current_index?.checked_sub(1)?;
        self.materials.get(prev).map(|m| &m.material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Course, CourseId, EnrollmentInfo, Lesson, LessonId, Material, MaterialKind, Module,
        ModuleId,
    };
    use crate::progress::ordering::{MaterialOrdering, linearize};

    fn material(id: u64, order: i64, duration: f64) -> Material {
        Material::new(
            MaterialId::new(id),
            format!("M{id}"),
            order,
            duration,
            MaterialKind::Link { url: None },
        )
    }

    fn sorted(materials: Vec<Material>) -> Vec<FlattenedMaterial> {
        let course = Course::new(
            CourseId::new(1),
            "C",
            None,
            vec![Module {
                id: ModuleId::new(1),
                title: "M".into(),
                lessons: vec![Lesson {
                    id: LessonId::new(1),
                    name: "L".into(),
                    description: None,
                    materials,
                }],
            }],
        )
        .with_enrollment(None, EnrollmentInfo::default());
        linearize(&course, MaterialOrdering::ByOrderField)
    }

    fn five() -> Vec<FlattenedMaterial> {
        sorted((1..=5).map(|i| material(i, i as i64, 10.0)).collect())
    }

    #[test]
    fn scenario_reordered_lesson() {
        // order = [2, 0, 1], cursor on the order=1 material.
        let list = sorted(vec![
            material(100, 2, 1.0),
            material(101, 0, 1.0),
            material(102, 1, 1.0),
        ]);
        let view = CursorView::new(&list, Some(MaterialId::new(102)));

        let ids: Vec<u64> = list.iter().map(|m| m.id().value()).collect();
        assert_eq!(ids, vec![101, 102, 100]);
        assert_eq!(view.cursor_index(), Some(1));
        assert_eq!(view.completed_materials(), 1);
        assert_eq!(view.progress(), 33);
        assert_eq!(view.next_material().map(FlattenedMaterial::id), Some(MaterialId::new(100)));
        assert_eq!(view.prev_material().map(FlattenedMaterial::id), Some(MaterialId::new(101)));
    }

    #[test]
    fn scenario_absent_cursor_locks_everything() {
        let view = CursorView::new(&five(), None);
        assert_eq!(view.cursor_index(), None);
        assert!(view.materials().iter().all(|m| m.locked() && !m.completed() && !m.is_current()));
        assert_eq!(view.progress(), 0);
        // Falls back to the first material for playback.
        assert_eq!(view.current_material().map(FlattenedMaterial::id), Some(MaterialId::new(1)));
        assert_eq!(view.current_index(), Some(0));
        assert!(view.prev_material().is_none());
    }

    #[test]
    fn completion_is_a_prefix_for_every_cursor() {
        let list = five();
        for cursor in 1..=5 {
            let view = CursorView::new(&list, Some(MaterialId::new(cursor)));
            let flags: Vec<bool> = view
                .materials()
                .iter()
                .map(AnnotatedMaterial::completed)
                .collect();
            for j in 0..flags.len() {
                if flags[j] {
                    assert!(flags[..j].iter().all(|&done| done));
                }
            }
        }
    }

    #[test]
    fn states_partition_the_list() {
        let list = five();
        for cursor in 1..=5 {
            let view = CursorView::new(&list, Some(MaterialId::new(cursor)));
            let current: Vec<&AnnotatedMaterial> =
                view.materials().iter().filter(|m| m.is_current()).collect();
            assert_eq!(current.len(), 1);
            assert!(!current[0].completed() && !current[0].locked());

            for (index, m) in view.materials().iter().enumerate() {
                let flags = [m.is_current(), m.completed(), m.locked()];
                assert_eq!(flags.iter().filter(|&&f| f).count(), 1);
                let cursor_index = view.cursor_index().unwrap();
                assert_eq!(m.completed(), index < cursor_index);
                assert_eq!(m.locked(), index > cursor_index);
            }
        }
    }

    #[test]
    fn progress_stays_within_bounds() {
        let list = five();
        for cursor in 1..=5 {
            let view = CursorView::new(&list, Some(MaterialId::new(cursor)));
            assert!(view.progress() <= 100);
        }
        let last = CursorView::new(&list, Some(MaterialId::new(5)));
        assert_eq!(last.progress(), 80);
        assert!(last.next_material().is_none());
    }

    #[test]
    fn empty_list_has_no_current() {
        let view = CursorView::new(&[], Some(MaterialId::new(1)));
        assert_eq!(view.materials_count(), 0);
        assert_eq!(view.progress(), 0);
        assert!(view.current_material().is_none());
        assert!(view.next_material().is_none());
        assert!(view.prev_material().is_none());
        assert!(view.materials_duration().abs() < f64::EPSILON);
    }

    #[test]
    fn duration_sums_all_materials() {
        let view = CursorView::new(&five(), Some(MaterialId::new(2)));
        assert!((view.materials_duration() - 50.0).abs() < 1e-9);
    }
}
