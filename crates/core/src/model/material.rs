use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::model::ids::MaterialId;

/// A single question inside a quiz group.
///
/// Decoded leniently: a malformed id, question or option list degrades to
/// an empty value instead of failing the whole course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(default, deserialize_with = "lenient_quiz_id")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub question: String,
    #[serde(default, deserialize_with = "lenient_options")]
    pub options: Vec<String>,
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_quiz_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<Value>::deserialize(d)?
        .and_then(scalar_text)
        .unwrap_or_default())
}

fn lenient_options<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => items.into_iter().filter_map(scalar_text).collect(),
        _ => Vec::new(),
    })
}

/// Type-specific payload of a material.
///
/// Every consumer that needs `youtube_id`, `quizzes` or `initial_code` has to
/// match on the variant, so adding a new material type is checked by the
/// compiler at each of those sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialKind {
    Video {
        #[serde(default)]
        youtube_id: Option<String>,
    },
    Resource {
        #[serde(default)]
        url: Option<String>,
    },
    QuizGroup {
        #[serde(default)]
        quizzes: Vec<Quiz>,
    },
    Code {
        #[serde(default)]
        initial_code: Option<String>,
        #[serde(default)]
        language: Option<String>,
    },
    Article {
        #[serde(default)]
        body: Option<String>,
    },
    Link {
        #[serde(default)]
        url: Option<String>,
    },
}

impl MaterialKind {
    /// Wire name of the variant, as used in the `type` field of course payloads.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            MaterialKind::Video { .. } => "video",
            MaterialKind::Resource { .. } => "resource",
            MaterialKind::QuizGroup { .. } => "quiz_group",
            MaterialKind::Code { .. } => "code",
            MaterialKind::Article { .. } => "article",
            MaterialKind::Link { .. } => "link",
        }
    }

    #[must_use]
    pub fn is_quiz_group(&self) -> bool {
        matches!(self, MaterialKind::QuizGroup { .. })
    }
}

/// An atomic learning unit inside a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub title: String,
    /// Intra-lesson sort key. Not unique, not contiguous.
    pub order: i64,
    /// Length in seconds; always finite and non-negative.
    pub duration: f64,
    pub kind: MaterialKind,
}

impl Material {
    #[must_use]
    pub fn new(
        id: MaterialId,
        title: impl Into<String>,
        order: i64,
        duration: f64,
        kind: MaterialKind,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            order,
            duration: sanitize_duration(duration),
            kind,
        }
    }
}

/// Clamp a duration to a usable value: non-finite or negative becomes 0.
#[must_use]
pub fn sanitize_duration(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_with_type_tag() {
        let kind = MaterialKind::Code {
            initial_code: Some("fn main() {}".into()),
            language: Some("rust".into()),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "code");
        assert_eq!(json["initial_code"], "fn main() {}");
        assert_eq!(kind.type_name(), "code");
    }

    #[test]
    fn malformed_quiz_fields_degrade_to_defaults() {
        let quizzes: Vec<Quiz> = serde_json::from_value(serde_json::json!([
            { "id": "12", "question": "Pick one", "options": ["a", 2, null, { "x": 1 }] },
            { "id": { "nested": true }, "question": null, "options": "a,b" },
            { "id": -3 }
        ]))
        .unwrap();

        assert_eq!(quizzes[0].id, Some(12));
        assert_eq!(quizzes[0].options, vec!["a".to_string(), "2".to_string()]);
        assert_eq!(quizzes[1].id, None);
        assert_eq!(quizzes[1].question, "");
        assert!(quizzes[1].options.is_empty());
        assert_eq!(quizzes[2].id, None);
    }

    #[test]
    fn quiz_survives_storage_round_trip() {
        let quiz = Quiz {
            id: Some(4),
            question: "Who owns it?".into(),
            options: vec!["me".into(), "you".into()],
        };
        let back: Quiz = serde_json::from_str(&serde_json::to_string(&quiz).unwrap()).unwrap();
        assert_eq!(back, quiz);
    }

    #[test]
    fn new_material_sanitizes_duration() {
        let m = Material::new(
            MaterialId::new(1),
            "Intro",
            0,
            f64::NAN,
            MaterialKind::Video { youtube_id: None },
        );
        assert!(m.duration.abs() < f64::EPSILON);

        let m = Material::new(
            MaterialId::new(2),
            "Intro",
            0,
            -5.0,
            MaterialKind::Link { url: None },
        );
        assert!(m.duration.abs() < f64::EPSILON);
    }
}
