//! Decoding of the course payload served by the course API.
//!
//! The payload is lenient about optional numerics: `duration` and `order` may
//! be numbers, numeric strings, `null` or absent, and anything unusable turns
//! into 0. The cursor (`current_material`) may likewise be missing, empty, a
//! number or a numeric string. Only structural problems (bad JSON, unknown
//! material `type`) are errors.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::{
    Course, CourseId, EnrollmentInfo, Lesson, LessonId, Material, MaterialId, MaterialKind,
    Module, ModuleId, Quiz,
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PayloadError {
    #[error("malformed course payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("material {material_id} has unknown type {kind:?}")]
    UnknownMaterialType { material_id: MaterialId, kind: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoursePayload {
    pub id: CourseId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub modules: Vec<ModulePayload>,
    #[serde(default)]
    pub current_material: Option<Value>,
    #[serde(default)]
    pub enrollment_info: Option<EnrollmentInfoPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModulePayload {
    pub id: ModuleId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<LessonPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LessonPayload {
    pub id: LessonId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub materials: Vec<MaterialPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialPayload {
    pub id: MaterialId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub order: Option<Value>,
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default, alias = "youtubeId")]
    pub youtube_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
    #[serde(default, alias = "initialCode")]
    pub initial_code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, alias = "content")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrollmentInfoPayload {
    #[serde(default)]
    pub quizzes_result: HashMap<String, Value>,
}

/// Decode a raw JSON course payload into a [`Course`].
///
/// # Errors
///
/// Returns `PayloadError::Json` for malformed JSON or missing ids, and
/// `PayloadError::UnknownMaterialType` for an unrecognised material `type`.
pub fn decode_course(bytes: &[u8]) -> Result<Course, PayloadError> {
    let payload: CoursePayload = serde_json::from_slice(bytes)?;
    payload.into_course()
}

impl CoursePayload {
    /// Convert the wire shape into the domain tree.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::UnknownMaterialType` if any material carries an
    /// unrecognised `type`.
    pub fn into_course(self) -> Result<Course, PayloadError> {
        let modules = self
            .modules
            .into_iter()
            .map(ModulePayload::into_module)
            .collect::<Result<Vec<_>, _>>()?;

        let current_material = self.current_material.as_ref().and_then(material_id_from_value);
        let enrollment = self
            .enrollment_info
            .map(EnrollmentInfoPayload::into_info)
            .unwrap_or_default();

        Ok(Course::new(self.id, self.title, self.description, modules)
            .with_enrollment(current_material, enrollment))
    }
}

impl ModulePayload {
    fn into_module(self) -> Result<Module, PayloadError> {
        let lessons = self
            .lessons
            .into_iter()
            .map(LessonPayload::into_lesson)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Module {
            id: self.id,
            title: self.title,
            lessons,
        })
    }
}

impl LessonPayload {
    fn into_lesson(self) -> Result<Lesson, PayloadError> {
        let materials = self
            .materials
            .into_iter()
            .map(MaterialPayload::into_material)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Lesson {
            id: self.id,
            name: self.name,
            description: self.description,
            materials,
        })
    }
}

impl MaterialPayload {
    fn into_material(self) -> Result<Material, PayloadError> {
        let kind = match self.kind.as_str() {
            "video" => MaterialKind::Video {
                youtube_id: self.youtube_id,
            },
            "resource" => MaterialKind::Resource { url: self.url },
            "quiz_group" => MaterialKind::QuizGroup {
                quizzes: self.quizzes,
            },
            "code" => MaterialKind::Code {
                initial_code: self.initial_code,
                language: self.language,
            },
            "article" => MaterialKind::Article { body: self.body },
            "link" => MaterialKind::Link { url: self.url },
            _ => {
                return Err(PayloadError::UnknownMaterialType {
                    material_id: self.id,
                    kind: self.kind,
                });
            }
        };

        #[allow(clippy::cast_possible_truncation)]
        let order = coerce_number(self.order.as_ref()).trunc() as i64;
        let duration = coerce_number(self.duration.as_ref());

        Ok(Material::new(self.id, self.title, order, duration, kind))
    }
}

impl EnrollmentInfoPayload {
    fn into_info(self) -> EnrollmentInfo {
        let quizzes_result = self
            .quizzes_result
            .into_iter()
            .filter_map(|(key, score)| {
                let id = key.parse::<MaterialId>().ok()?;
                Some((id, coerce_number(Some(&score))))
            })
            .collect();
        EnrollmentInfo { quizzes_result }
    }
}

/// Numeric coercion used for optional fields: numbers pass through, numeric
/// strings are parsed, everything else (and NaN/inf) becomes 0.
#[must_use]
pub fn coerce_number(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if raw.is_finite() { raw } else { 0.0 }
}

fn material_id_from_value(value: &Value) -> Option<MaterialId> {
    match value {
        Value::Number(n) => n.as_u64().map(MaterialId::new),
        Value::String(s) if !s.trim().is_empty() => s.parse().ok(),
        _ => None,
    }
}
