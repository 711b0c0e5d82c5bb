use course_core::model::{
    CourseId, LearnerId, LessonId, Material, MaterialId, MaterialKind, ModuleId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Like [`conn`], but constraint violations on writes become `Conflict`.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db)
            if db.is_unique_violation()
                || db.is_foreign_key_violation()
                || db.is_check_violation() =>
        {
            StorageError::Conflict
        }
        _ => conn(e),
    }
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn module_id_from_i64(v: i64) -> Result<ModuleId, StorageError> {
    Ok(ModuleId::new(i64_to_u64("module_id", v)?))
}

/// Module and lesson position of a material row.
pub(crate) type LessonSlot = (i64, i64);

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn material_id_from_i64(v: i64) -> Result<MaterialId, StorageError> {
    Ok(MaterialId::new(i64_to_u64("material_id", v)?))
}

pub(crate) fn learner_id_to_i64(id: LearnerId) -> Result<i64, StorageError> {
    u64_to_i64("learner_id", id.value())
}

pub(crate) fn course_id_to_i64(id: CourseId) -> Result<i64, StorageError> {
    u64_to_i64("course_id", id.value())
}

/// Type-specific fields are kept as JSON in the `details` column.
pub(crate) fn kind_to_details(kind: &MaterialKind) -> Result<String, StorageError> {
    serde_json::to_string(kind).map_err(ser)
}

pub(crate) fn map_material_row(row: &SqliteRow) -> Result<(LessonSlot, Material), StorageError> {
    let slot = (
        row.try_get::<i64, _>("module_position").map_err(ser)?,
        row.try_get::<i64, _>("lesson_position").map_err(ser)?,
    );
    let kind_name: String = row.try_get("kind").map_err(ser)?;
    let details: String = row.try_get("details").map_err(ser)?;
    let kind: MaterialKind = serde_json::from_str(&details).map_err(ser)?;
    if kind.type_name() != kind_name {
        return Err(StorageError::Serialization(format!(
            "material kind mismatch: column {kind_name}, details {}",
            kind.type_name()
        )));
    }

    let material = Material::new(
        material_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<i64, _>("order_index").map_err(ser)?,
        row.try_get::<f64, _>("duration").map_err(ser)?,
        kind,
    );
    Ok((slot, material))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_ids_are_rejected() {
        assert!(course_id_from_i64(-1).is_err());
        assert_eq!(material_id_from_i64(5).unwrap(), MaterialId::new(5));
    }

    #[test]
    fn large_ids_do_not_fit_sqlite() {
        assert!(u64_to_i64("id", u64::MAX).is_err());
    }

    #[test]
    fn details_round_trip_through_json() {
        let kind = MaterialKind::QuizGroup { quizzes: vec![] };
        let details = kind_to_details(&kind).unwrap();
        let back: MaterialKind = serde_json::from_str(&details).unwrap();
        assert_eq!(back, kind);
    }
}
