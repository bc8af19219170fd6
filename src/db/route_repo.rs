// src/db/route_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::route::{Fiber, Route, RouteFilter, Tube},
};

#[derive(Clone)]
pub struct RouteRepository {
    pool: PgPool,
}

impl RouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_route<'e, E>(
        &self,
        executor: E,
        city_id: Uuid,
        name: &str,
        cable_type: &str,
        fiber_count: i32,
        length_meters: Option<Decimal>,
    ) -> Result<Route, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let route = sqlx::query_as::<_, Route>(
            r#"
            INSERT INTO routes (id, city_id, name, cable_type, fiber_count, length_meters)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(city_id)
        .bind(name)
        .bind(cable_type)
        .bind(fiber_count)
        .bind(length_meters)
        .fetch_one(executor)
        .await?;
        Ok(route)
    }

    /// Cria os tubos de uma rota. `tubes` = (id, número, cor).
    pub async fn insert_tubes<'e, E>(
        &self,
        executor: E,
        route_id: Uuid,
        tubes: &[(Uuid, i32, String)],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids: Vec<Uuid> = tubes.iter().map(|t| t.0).collect();
        let numbers: Vec<i32> = tubes.iter().map(|t| t.1).collect();
        let colors: Vec<String> = tubes.iter().map(|t| t.2.clone()).collect();

        sqlx::query(
            r#"
            INSERT INTO tubes (id, route_id, number, color)
            SELECT t.id, $1, t.number, t.color
            FROM UNNEST($2::uuid[], $3::int[], $4::text[]) AS t(id, number, color)
            "#,
        )
        .bind(route_id)
        .bind(ids)
        .bind(numbers)
        .bind(colors)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Cria os capilares. `fibers` = (tubo, número, cor).
    pub async fn insert_fibers<'e, E>(&self, executor: E, fibers: &[(Uuid, i32, String)]) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids: Vec<Uuid> = fibers.iter().map(|_| Uuid::new_v4()).collect();
        let tube_ids: Vec<Uuid> = fibers.iter().map(|f| f.0).collect();
        let numbers: Vec<i32> = fibers.iter().map(|f| f.1).collect();
        let colors: Vec<String> = fibers.iter().map(|f| f.2.clone()).collect();

        sqlx::query(
            r#"
            INSERT INTO fibers (id, tube_id, number, color)
            SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::int[], $4::text[])
            "#,
        )
        .bind(ids)
        .bind(tube_ids)
        .bind(numbers)
        .bind(colors)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Route>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let route = sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(route)
    }

    pub async fn update_route<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: Option<&str>,
        cable_type: Option<&str>,
        length_meters: Option<Option<Decimal>>,
    ) -> Result<Option<Route>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let route = sqlx::query_as::<_, Route>(
            r#"
            UPDATE routes SET
                name = COALESCE($2, name),
                cable_type = COALESCE($3, cable_type),
                length_meters = CASE WHEN $5 THEN $4 ELSE length_meters END,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(cable_type)
        .bind(length_meters.flatten())
        .bind(length_meters.is_some())
        .fetch_optional(executor)
        .await?;
        Ok(route)
    }

    /// Quantas fusões usam algum capilar desta rota.
    pub async fn count_splices_on_route<'e, E>(&self, executor: E, route_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM splices s
            JOIN fibers f ON f.id = s.origin_fiber_id OR f.id = s.destination_fiber_id
            JOIN tubes t ON t.id = f.tube_id
            WHERE t.route_id = $1
            "#,
        )
        .bind(route_id)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    pub async fn delete_route_comments<'e, E>(&self, executor: E, route_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM comments WHERE route_id = $1")
            .bind(route_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // Tubos, capilares e vínculos com caixas vão junto (ON DELETE CASCADE)
    pub async fn delete_route<'e, E>(&self, executor: E, route_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(route_id)
            .execute(executor)
            .await
            .map_err(|e| {
                // Uma fusão gravada depois da contagem ainda segura os capilares
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_foreign_key_violation() {
                        return AppError::invariant(
                            "A rota possui fibras com fusões registradas.",
                            serde_json::json!({ "rotaId": route_id }),
                        );
                    }
                }
                e.into()
            })?;
        Ok(())
    }

    /// Das rotas informadas, quais existem na cidade.
    pub async fn ids_in_city<'e, E>(&self, executor: E, ids: &[Uuid], city_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let found = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM routes WHERE id = ANY($1) AND city_id = $2",
        )
        .bind(ids)
        .bind(city_id)
        .fetch_all(executor)
        .await?;
        Ok(found)
    }

    pub async fn list_tubes(&self, route_id: Uuid) -> Result<Vec<Tube>, AppError> {
        let tubes = sqlx::query_as::<_, Tube>("SELECT * FROM tubes WHERE route_id = $1 ORDER BY number")
            .bind(route_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(tubes)
    }

    pub async fn list_fibers(&self, route_id: Uuid) -> Result<Vec<Fiber>, AppError> {
        let fibers = sqlx::query_as::<_, Fiber>(
            r#"
            SELECT f.*
            FROM fibers f
            JOIN tubes t ON t.id = f.tube_id
            WHERE t.route_id = $1
            ORDER BY t.number, f.number
            "#,
        )
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(fibers)
    }

    pub async fn list_routes(
        &self,
        filter: &RouteFilter,
        allowed: Option<Vec<Uuid>>,
    ) -> Result<(Vec<Route>, i64), AppError> {
        let page = filter.page();
        let search = filter.busca.as_deref().map(|s| format!("%{}%", s));

        let where_clause = r#"
            WHERE ($1::uuid[] IS NULL OR city_id = ANY($1))
              AND ($2::uuid IS NULL OR city_id = $2)
              AND ($3::text IS NULL OR name ILIKE $3)
        "#;

        let routes = sqlx::query_as::<_, Route>(&format!(
            "SELECT * FROM routes {} ORDER BY name LIMIT $4 OFFSET $5",
            where_clause
        ))
        .bind(allowed.as_deref())
        .bind(filter.cidade_id)
        .bind(search.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM routes {}", where_clause))
            .bind(allowed.as_deref())
            .bind(filter.cidade_id)
            .bind(search.as_deref())
            .fetch_one(&self.pool)
            .await?;

        Ok((routes, total))
    }
}
