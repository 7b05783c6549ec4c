use lms_core::model::{CourseId, FinalTest, FinalTestQuery, Program, ProgramId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, from_json, id_to_i64, map_final_test_row, ser, to_json};
use crate::repository::{FinalTestRepository, ProgramRepository, StorageError};

#[async_trait::async_trait]
impl ProgramRepository for SqliteRepository {
    async fn list_programs(&self) -> Result<Vec<Program>, StorageError> {
        let rows = sqlx::query("SELECT id, title, course_ids FROM programs ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut programs = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            let course_ids: String = row.try_get("course_ids").map_err(ser)?;
            programs.push(Program {
                id: ProgramId::new(
                    u64::try_from(id)
                        .map_err(|_| StorageError::Serialization("program_id sign overflow".into()))?,
                ),
                title: row.try_get("title").map_err(ser)?,
                course_ids: from_json::<Vec<CourseId>>(&course_ids)?,
            });
        }
        Ok(programs)
    }

    async fn upsert_program(&self, program: &Program) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO programs (id, title, course_ids)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                course_ids = excluded.course_ids
            ",
        )
        .bind(id_to_i64("program_id", program.id.value())?)
        .bind(program.title.as_str())
        .bind(to_json(&program.course_ids)?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl FinalTestRepository for SqliteRepository {
    async fn list_final_tests(
        &self,
        query: &FinalTestQuery,
    ) -> Result<Vec<FinalTest>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, program_id, title, published
            FROM final_tests
            WHERE program_id = ?1 AND (?2 = 0 OR published = 1)
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("program_id", query.program_id.value())?)
        .bind(i64::from(query.published_only))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut tests = Vec::with_capacity(rows.len());
        for row in rows {
            tests.push(map_final_test_row(&row)?);
        }
        Ok(tests)
    }

    async fn upsert_final_test(&self, test: &FinalTest) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO final_tests (id, program_id, title, published)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                program_id = excluded.program_id,
                title = excluded.title,
                published = excluded.published
            ",
        )
        .bind(id_to_i64("final_test_id", test.id.value())?)
        .bind(id_to_i64("program_id", test.program_id.value())?)
        .bind(test.title.as_str())
        .bind(i64::from(test.published))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
