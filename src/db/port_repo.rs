// src/db/port_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::enclosure::{Port, PortStatus, PortWithCustomer},
};

#[derive(Clone)]
pub struct PortRepository {
    pool: PgPool,
}

impl PortRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_with_customers(&self, enclosure_id: Uuid) -> Result<Vec<PortWithCustomer>, AppError> {
        let ports = sqlx::query_as::<_, PortWithCustomer>(
            r#"
            SELECT p.id, p.enclosure_id, p.number, p.status, p.updated_at,
                   c.id AS customer_id, c.name AS customer_name
            FROM ports p
            LEFT JOIN customers c ON c.port_id = p.id
            WHERE p.enclosure_id = $1
            ORDER BY p.number
            "#,
        )
        .bind(enclosure_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ports)
    }

    /// Todas as portas da caixa, travadas.
    pub async fn list_for_update<'e, E>(&self, executor: E, enclosure_id: Uuid) -> Result<Vec<Port>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ports = sqlx::query_as::<_, Port>(
            "SELECT * FROM ports WHERE enclosure_id = $1 ORDER BY number FOR UPDATE",
        )
        .bind(enclosure_id)
        .fetch_all(executor)
        .await?;
        Ok(ports)
    }

    /// Trava as portas informadas sempre na mesma ordem (por id).
    pub async fn lock_many<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<Port>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ports = sqlx::query_as::<_, Port>(
            "SELECT * FROM ports WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;
        Ok(ports)
    }

    pub async fn find_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Port>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let port = sqlx::query_as::<_, Port>("SELECT * FROM ports WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(port)
    }

    /// Cria portas livres com os números informados.
    pub async fn insert_many<'e, E>(&self, executor: E, enclosure_id: Uuid, numbers: &[i32]) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if numbers.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = numbers.iter().map(|_| Uuid::new_v4()).collect();

        sqlx::query(
            r#"
            INSERT INTO ports (id, enclosure_id, number, status)
            SELECT p.id, $1, p.number, 'LIVRE'
            FROM UNNEST($2::uuid[], $3::int[]) AS p(id, number)
            "#,
        )
        .bind(enclosure_id)
        .bind(ids)
        .bind(numbers)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete_many<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("DELETE FROM ports WHERE id = ANY($1)")
            .bind(ids)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete_all<'e, E>(&self, executor: E, enclosure_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM ports WHERE enclosure_id = $1")
            .bind(enclosure_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_status<'e, E>(&self, executor: E, id: Uuid, status: PortStatus) -> Result<Port, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let port = sqlx::query_as::<_, Port>(
            "UPDATE ports SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(port)
    }
}
