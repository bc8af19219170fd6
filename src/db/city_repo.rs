// src/db/city_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::city::{City, CityFilter},
};

#[derive(Clone)]
pub struct CityRepository {
    pool: PgPool,
}

impl CityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_city<'e, E>(
        &self,
        executor: E,
        name: &str,
        state: &str,
        latitude: Option<Decimal>,
        longitude: Option<Decimal>,
    ) -> Result<City, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, City>(
            r#"
            INSERT INTO cities (id, name, state, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(state)
        .bind(latitude)
        .bind(longitude)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, "Já existe uma cidade com esse nome nesta UF."))
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<City>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let city = sqlx::query_as::<_, City>("SELECT * FROM cities WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(city)
    }

    pub async fn find_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<City>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let city = sqlx::query_as::<_, City>("SELECT * FROM cities WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(city)
    }

    pub async fn update_city<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: Option<&str>,
        state: Option<&str>,
        latitude: Option<Option<Decimal>>,
        longitude: Option<Option<Decimal>>,
    ) -> Result<Option<City>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Coordenadas: `$6`/`$7` dizem se o campo veio no patch (inclusive null)
        sqlx::query_as::<_, City>(
            r#"
            UPDATE cities SET
                name = COALESCE($2, name),
                state = COALESCE($3, state),
                latitude = CASE WHEN $6 THEN $4 ELSE latitude END,
                longitude = CASE WHEN $7 THEN $5 ELSE longitude END,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(state)
        .bind(latitude.flatten())
        .bind(longitude.flatten())
        .bind(latitude.is_some())
        .bind(longitude.is_some())
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, "Já existe uma cidade com esse nome nesta UF."))
    }

    /// (rotas, caixas) que ainda pertencem à cidade.
    pub async fn count_dependents<'e, E>(&self, executor: E, id: Uuid) -> Result<(i64, i64), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let counts = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM routes WHERE city_id = $1),
                (SELECT COUNT(*) FROM enclosures WHERE city_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await?;
        Ok(counts)
    }

    pub async fn delete_city<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM cities WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| {
                // Clientes ainda apontando para a cidade
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_foreign_key_violation() {
                        return AppError::invariant(
                            "A cidade ainda possui registros vinculados.",
                            serde_json::json!({ "cidadeId": id }),
                        );
                    }
                }
                e.into()
            })?;
        Ok(())
    }

    /// Lista paginada. `allowed = None` significa sem restrição de território.
    pub async fn list_cities(
        &self,
        filter: &CityFilter,
        allowed: Option<Vec<Uuid>>,
    ) -> Result<(Vec<City>, i64), AppError> {
        let page = filter.page();
        let search = filter.busca.as_deref().map(|s| format!("%{}%", s));

        let where_clause = r#"
            WHERE ($1::uuid[] IS NULL OR id = ANY($1))
              AND ($2::text IS NULL OR name ILIKE $2)
              AND ($3::text IS NULL OR state = $3)
        "#;

        let cities = sqlx::query_as::<_, City>(&format!(
            "SELECT * FROM cities {} ORDER BY state, name LIMIT $4 OFFSET $5",
            where_clause
        ))
        .bind(allowed.as_deref())
        .bind(search.as_deref())
        .bind(filter.state.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM cities {}", where_clause))
            .bind(allowed.as_deref())
            .bind(search.as_deref())
            .bind(filter.state.as_deref())
            .fetch_one(&self.pool)
            .await?;

        Ok((cities, total))
    }
}
