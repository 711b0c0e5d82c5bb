use std::collections::HashMap;

use course_core::model::{Course, CourseId, Lesson, Material, Module};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    LessonSlot, conn, course_id_from_i64, course_id_to_i64, kind_to_details, lesson_id_from_i64,
    map_material_row, module_id_from_i64, ser, u64_to_i64, write_err,
};
use crate::repository::{CourseRepository, CourseSummary, StorageError};

fn position(index: usize) -> Result<i64, StorageError> {
    i64::try_from(index).map_err(|_| StorageError::Serialization("position overflow".into()))
}

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let course_id = course_id_to_i64(course.id)?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO courses (id, title, description)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description
            ",
        )
        .bind(course_id)
        .bind(&course.title)
        .bind(&course.description)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        // Replace the whole tree; lessons and materials go with their modules.
        sqlx::query("DELETE FROM course_modules WHERE course_id = ?1")
            .bind(course_id)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

        for (module_pos, module) in course.modules.iter().enumerate() {
            let module_pos = position(module_pos)?;
            sqlx::query(
                r"
                INSERT INTO course_modules (course_id, position, id, title)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(course_id)
            .bind(module_pos)
            .bind(u64_to_i64("module_id", module.id.value())?)
            .bind(&module.title)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

            for (lesson_pos, lesson) in module.lessons.iter().enumerate() {
                let lesson_pos = position(lesson_pos)?;
                sqlx::query(
                    r"
                    INSERT INTO lessons
                        (course_id, module_position, position, id, name, description)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ",
                )
                .bind(course_id)
                .bind(module_pos)
                .bind(lesson_pos)
                .bind(u64_to_i64("lesson_id", lesson.id.value())?)
                .bind(&lesson.name)
                .bind(&lesson.description)
                .execute(&mut *tx)
                .await
                .map_err(write_err)?;

                for (material_pos, material) in lesson.materials.iter().enumerate() {
                    sqlx::query(
                        r"
                        INSERT INTO materials (
                            course_id, module_position, lesson_position, position,
                            id, kind, title, order_index, duration, details
                        )
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                        ",
                    )
                    .bind(course_id)
                    .bind(module_pos)
                    .bind(lesson_pos)
                    .bind(position(material_pos)?)
                    .bind(u64_to_i64("material_id", material.id.value())?)
                    .bind(material.kind.type_name())
                    .bind(&material.title)
                    .bind(material.order)
                    .bind(material.duration)
                    .bind(kind_to_details(&material.kind)?)
                    .execute(&mut *tx)
                    .await
                    .map_err(write_err)?;
                }
            }
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(
            course_id = %course.id,
            modules = course.modules.len(),
            "stored course tree"
        );
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let course_id = course_id_to_i64(id)?;
        let Some(course_row) =
            sqlx::query("SELECT id, title, description FROM courses WHERE id = ?1")
                .bind(course_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(conn)?
        else {
            return Ok(None);
        };

        let material_rows = sqlx::query(
            r"
            SELECT module_position, lesson_position, id, kind, title, order_index, duration, details
            FROM materials
            WHERE course_id = ?1
            ORDER BY module_position ASC, lesson_position ASC, position ASC
            ",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut materials_by_lesson: HashMap<LessonSlot, Vec<Material>> = HashMap::new();
        for row in &material_rows {
            let (slot, material) = map_material_row(row)?;
            materials_by_lesson.entry(slot).or_default().push(material);
        }

        let lesson_rows = sqlx::query(
            r"
            SELECT module_position, position, id, name, description
            FROM lessons
            WHERE course_id = ?1
            ORDER BY module_position ASC, position ASC
            ",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut lessons_by_module: HashMap<i64, Vec<Lesson>> = HashMap::new();
        for row in &lesson_rows {
            let module_pos: i64 = row.try_get("module_position").map_err(ser)?;
            let lesson_pos: i64 = row.try_get("position").map_err(ser)?;
            lessons_by_module.entry(module_pos).or_default().push(Lesson {
                id: lesson_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
                name: row.try_get("name").map_err(ser)?,
                description: row.try_get("description").map_err(ser)?,
                materials: materials_by_lesson
                    .remove(&(module_pos, lesson_pos))
                    .unwrap_or_default(),
            });
        }

        let module_rows = sqlx::query(
            r"
            SELECT position, id, title
            FROM course_modules
            WHERE course_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut modules = Vec::with_capacity(module_rows.len());
        for row in &module_rows {
            let module_pos: i64 = row.try_get("position").map_err(ser)?;
            modules.push(Module {
                id: module_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
                title: row.try_get("title").map_err(ser)?,
                lessons: lessons_by_module.remove(&module_pos).unwrap_or_default(),
            });
        }

        Ok(Some(Course::new(
            course_id_from_i64(course_row.try_get::<i64, _>("id").map_err(ser)?)?,
            course_row.try_get::<String, _>("title").map_err(ser)?,
            course_row
                .try_get::<Option<String>, _>("description")
                .map_err(ser)?,
            modules,
        )))
    }

    async fn list_courses(&self, limit: u32) -> Result<Vec<CourseSummary>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description
            FROM courses
            ORDER BY id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            summaries.push(CourseSummary {
                id: course_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
                title: row.try_get("title").map_err(ser)?,
                description: row.try_get("description").map_err(ser)?,
            });
        }
        Ok(summaries)
    }
}
