// src/db/tray_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::enclosure::{Tray, TrayWithUsage},
};

const TRAY_WITH_USAGE: &str = r#"
    SELECT t.id, t.enclosure_id, t.number, t.capacity, t.updated_at,
           (SELECT COUNT(*) FROM splices s WHERE s.tray_id = t.id) AS splices
    FROM trays t
"#;

#[derive(Clone)]
pub struct TrayRepository {
    pool: PgPool,
}

impl TrayRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_with_usage<'e, E>(&self, executor: E, enclosure_id: Uuid) -> Result<Vec<TrayWithUsage>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let trays = sqlx::query_as::<_, TrayWithUsage>(&format!(
            "{} WHERE t.enclosure_id = $1 ORDER BY t.number",
            TRAY_WITH_USAGE
        ))
        .bind(enclosure_id)
        .fetch_all(executor)
        .await?;
        Ok(trays)
    }

    pub async fn list_for_enclosure(&self, enclosure_id: Uuid) -> Result<Vec<TrayWithUsage>, AppError> {
        self.list_with_usage(&self.pool, enclosure_id).await
    }

    pub async fn find_with_usage<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<TrayWithUsage>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tray = sqlx::query_as::<_, TrayWithUsage>(&format!("{} WHERE t.id = $1", TRAY_WITH_USAGE))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(tray)
    }

    /// Lê e trava várias bandejas, sempre na mesma ordem.
    pub async fn lock_many<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<Tray>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let trays = sqlx::query_as::<_, Tray>(
            "SELECT * FROM trays WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;
        Ok(trays)
    }

    /// Cria bandejas. `trays` = (número, capacidade).
    pub async fn insert_many<'e, E>(&self, executor: E, enclosure_id: Uuid, trays: &[(i32, i32)]) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if trays.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = trays.iter().map(|_| Uuid::new_v4()).collect();
        let numbers: Vec<i32> = trays.iter().map(|t| t.0).collect();
        let capacities: Vec<i32> = trays.iter().map(|t| t.1).collect();

        sqlx::query(
            r#"
            INSERT INTO trays (id, enclosure_id, number, capacity)
            SELECT t.id, $1, t.number, t.capacity
            FROM UNNEST($2::uuid[], $3::int[], $4::int[]) AS t(id, number, capacity)
            "#,
        )
        .bind(enclosure_id)
        .bind(ids)
        .bind(numbers)
        .bind(capacities)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn set_capacity<'e, E>(&self, executor: E, id: Uuid, capacity: i32) -> Result<Tray, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tray = sqlx::query_as::<_, Tray>(
            "UPDATE trays SET capacity = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(capacity)
        .fetch_one(executor)
        .await?;
        Ok(tray)
    }

    pub async fn delete_many<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("DELETE FROM trays WHERE id = ANY($1)")
            .bind(ids)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete_all<'e, E>(&self, executor: E, enclosure_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM trays WHERE enclosure_id = $1")
            .bind(enclosure_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
