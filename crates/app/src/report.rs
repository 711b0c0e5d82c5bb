//! Plain-text rendering of a course snapshot for the terminal.

use std::fmt::Write;

use course_core::CourseProgress;
use course_core::progress::{AnnotatedMaterial, FlattenedMaterial, MaterialState};

fn marker(material: &AnnotatedMaterial) -> &'static str {
    match material.state {
        MaterialState::Completed => "[x]",
        MaterialState::Current => "[>]",
        MaterialState::Locked => "[ ]",
    }
}

/// Whole seconds as `h:mm:ss`, or `m:ss` under an hour.
pub fn format_duration(seconds: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

pub fn render(progress: &CourseProgress) -> String {
    let course = progress.course();
    let mut out = String::new();
    let _ = writeln!(out, "{} (course {})", course.title, course.id);
    let _ = writeln!(
        out,
        "progress {}% ({}/{} materials), lessons {}/{}, duration {}",
        progress.progress(),
        progress.completed_materials(),
        progress.materials_count(),
        progress.completed_lessons_count(),
        progress.total_lessons(),
        format_duration(progress.materials_duration()),
    );

    for module in progress.modules() {
        let _ = writeln!(
            out,
            "\nmodule {} {} {}% ({}/{})",
            module.module_number,
            module.title,
            module.progress,
            module.completed_materials,
            module.total_materials,
        );
    }

    out.push('\n');
    for entry in progress.materials() {
        let material = &entry.material;
        let _ = write!(
            out,
            "{} {}.{} {} [{}] {}",
            marker(entry),
            material.module_number,
            material.material_number,
            material.material.title,
            material.material.kind.type_name(),
            format_duration(material.duration()),
        );
        if let Some(score) = material.old_result {
            let _ = write!(out, " score {score}");
        }
        out.push('\n');
    }

    match (progress.prev_material(), progress.next_material()) {
        (None, None) => {}
        (prev, next) => {
            let label = |m: Option<&FlattenedMaterial>| {
                m.map_or_else(|| "-".to_string(), |m| m.id().to_string())
            };
            let _ = writeln!(out, "\nprev {} / next {}", label(prev), label(next));
        }
    }
    out
}
