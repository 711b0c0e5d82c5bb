use chrono::{DateTime, Utc};
use course_core::model::{CourseId, EnrollmentInfo, LearnerId, MaterialId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, course_id_to_i64, learner_id_to_i64, material_id_from_i64, ser, u64_to_i64, write_err,
};
use crate::repository::{EnrollmentRecord, EnrollmentRepository, StorageError};

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn get_enrollment(
        &self,
        course_id: CourseId,
        learner_id: LearnerId,
    ) -> Result<Option<EnrollmentRecord>, StorageError> {
        let course = course_id_to_i64(course_id)?;
        let learner = learner_id_to_i64(learner_id)?;

        let Some(row) = sqlx::query(
            r"
            SELECT current_material, updated_at
            FROM enrollments
            WHERE course_id = ?1 AND learner_id = ?2
            ",
        )
        .bind(course)
        .bind(learner)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        else {
            return Ok(None);
        };

        let result_rows = sqlx::query(
            r"
            SELECT material_id, score
            FROM quiz_results
            WHERE course_id = ?1 AND learner_id = ?2
            ",
        )
        .bind(course)
        .bind(learner)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut quizzes = EnrollmentInfo::default();
        for result in &result_rows {
            let material_id =
                material_id_from_i64(result.try_get::<i64, _>("material_id").map_err(ser)?)?;
            let score: f64 = result.try_get("score").map_err(ser)?;
            quizzes.quizzes_result.insert(material_id, score);
        }

        Ok(Some(EnrollmentRecord {
            course_id,
            learner_id,
            current_material: row
                .try_get::<Option<i64>, _>("current_material")
                .map_err(ser)?
                .map(material_id_from_i64)
                .transpose()?,
            quizzes,
            updated_at: row.try_get("updated_at").map_err(ser)?,
        }))
    }

    async fn upsert_enrollment(&self, record: &EnrollmentRecord) -> Result<(), StorageError> {
        let current = record
            .current_material
            .map(|id| u64_to_i64("current_material", id.value()))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO enrollments (course_id, learner_id, current_material, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(course_id, learner_id) DO UPDATE SET
                current_material = excluded.current_material,
                updated_at = excluded.updated_at
            ",
        )
        .bind(course_id_to_i64(record.course_id)?)
        .bind(learner_id_to_i64(record.learner_id)?)
        .bind(current)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn record_quiz_result(
        &self,
        course_id: CourseId,
        learner_id: LearnerId,
        material_id: MaterialId,
        score: f64,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let course = course_id_to_i64(course_id)?;
        let learner = learner_id_to_i64(learner_id)?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let touched = sqlx::query(
            r"
            UPDATE enrollments SET updated_at = ?3
            WHERE course_id = ?1 AND learner_id = ?2
            ",
        )
        .bind(course)
        .bind(learner)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;
        if touched.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        sqlx::query(
            r"
            INSERT INTO quiz_results (course_id, learner_id, material_id, score, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(course_id, learner_id, material_id) DO UPDATE SET
                score = excluded.score,
                recorded_at = excluded.recorded_at
            ",
        )
        .bind(course)
        .bind(learner)
        .bind(u64_to_i64("material_id", material_id.value())?)
        .bind(score)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
