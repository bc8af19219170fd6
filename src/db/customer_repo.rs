// src/db/customer_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::customer::{Customer, CustomerFilter},
};

const PORT_TAKEN: &str = "A porta já está atribuída a outro cliente.";

/// Campos gravados de um cliente (já resolvidos pelo serviço).
#[derive(Debug)]
pub struct CustomerRow<'a> {
    pub name: &'a str,
    pub document: Option<&'a str>,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
    pub port_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_customer<'e, E>(
        &self,
        executor: E,
        city_id: Uuid,
        row: &CustomerRow<'_>,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (id, city_id, name, document, email, phone, address, port_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(city_id)
        .bind(row.name)
        .bind(row.document)
        .bind(row.email)
        .bind(row.phone)
        .bind(row.address)
        .bind(row.port_id)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, PORT_TAKEN))
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(customer)
    }

    pub async fn find_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(customer)
    }

    pub async fn find_by_port<'e, E>(&self, executor: E, port_id: Uuid) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE port_id = $1")
            .bind(port_id)
            .fetch_optional(executor)
            .await?;
        Ok(customer)
    }

    pub async fn update_customer<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        row: &CustomerRow<'_>,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                name = $2,
                document = $3,
                email = $4,
                phone = $5,
                address = $6,
                port_id = $7,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(row.name)
        .bind(row.document)
        .bind(row.email)
        .bind(row.phone)
        .bind(row.address)
        .bind(row.port_id)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, PORT_TAKEN))
    }

    /// Desvincula o cliente da porta (porta com defeito).
    pub async fn clear_port<'e, E>(&self, executor: E, port_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE customers SET port_id = NULL, updated_at = now() WHERE port_id = $1")
            .bind(port_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_customer<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn list_customers(
        &self,
        filter: &CustomerFilter,
        allowed: Option<Vec<Uuid>>,
    ) -> Result<(Vec<Customer>, i64), AppError> {
        let page = filter.page();
        let search = filter.busca.as_deref().map(|s| format!("%{}%", s));

        let where_clause = r#"
            WHERE ($1::uuid[] IS NULL OR c.city_id = ANY($1))
              AND ($2::uuid IS NULL OR c.city_id = $2)
              AND ($3::text IS NULL OR c.name ILIKE $3 OR c.document ILIKE $3)
              AND ($4::uuid IS NULL OR p.enclosure_id = $4)
        "#;

        let customers = sqlx::query_as::<_, Customer>(&format!(
            r#"
            SELECT c.* FROM customers c
            LEFT JOIN ports p ON p.id = c.port_id
            {} ORDER BY c.name LIMIT $5 OFFSET $6
            "#,
            where_clause
        ))
        .bind(allowed.as_deref())
        .bind(filter.cidade_id)
        .bind(search.as_deref())
        .bind(filter.enclosure_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM customers c LEFT JOIN ports p ON p.id = c.port_id {}",
            where_clause
        ))
        .bind(allowed.as_deref())
        .bind(filter.cidade_id)
        .bind(search.as_deref())
        .bind(filter.enclosure_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((customers, total))
    }
}
