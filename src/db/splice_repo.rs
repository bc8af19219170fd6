// src/db/splice_repo.rs

use std::collections::HashMap;

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_foreign_key_violation, error::AppError},
    models::splice::{CreateSplicePayload, Splice, SpliceFilter},
};

#[derive(Clone)]
pub struct SpliceRepository {
    pool: PgPool,
}

impl SpliceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_splice<'e, E>(
        &self,
        executor: E,
        payload: &CreateSplicePayload,
        created_by: Uuid,
    ) -> Result<Splice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Splice>(
            r#"
            INSERT INTO splices (id, enclosure_id, tray_id, origin_fiber_id, destination_fiber_id, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payload.enclosure_id)
        .bind(payload.tray_id)
        .bind(payload.origin_fiber_id)
        .bind(payload.destination_fiber_id)
        .bind(payload.notes.as_deref())
        .bind(created_by)
        .fetch_one(executor)
        .await
        .map_err(|e| map_foreign_key_violation(e, "Fibra de origem ou destino não encontrada."))
    }

    pub async fn count_for_tray<'e, E>(&self, executor: E, tray_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM splices WHERE tray_id = $1")
            .bind(tray_id)
            .fetch_one(executor)
            .await?;
        Ok(total)
    }

    /// Fusões já gravadas por bandeja. Bandejas vazias não aparecem.
    pub async fn counts_for_trays<'e, E>(&self, executor: E, tray_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT tray_id, COUNT(*) FROM splices WHERE tray_id = ANY($1) GROUP BY tray_id",
        )
        .bind(tray_ids)
        .fetch_all(executor)
        .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn delete_splice<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM splices WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn list_splices(&self, filter: &SpliceFilter) -> Result<(Vec<Splice>, i64), AppError> {
        let page = filter.page();

        let where_clause = r#"
            WHERE enclosure_id = $1
              AND ($2::uuid IS NULL OR tray_id = $2)
        "#;

        let splices = sqlx::query_as::<_, Splice>(&format!(
            "SELECT * FROM splices {} ORDER BY created_at, id LIMIT $3 OFFSET $4",
            where_clause
        ))
        .bind(filter.enclosure_id)
        .bind(filter.tray_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM splices {}", where_clause))
            .bind(filter.enclosure_id)
            .bind(filter.tray_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((splices, total))
    }
}
