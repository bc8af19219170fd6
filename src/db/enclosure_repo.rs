// src/db/enclosure_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::enclosure::{Enclosure, EnclosureFilter, EnclosureKind, EnclosureUsage, Maintenance},
};

#[derive(Clone)]
pub struct EnclosureRepository {
    pool: PgPool,
}

/// Campos gravados numa atualização de caixa (já resolvidos pelo serviço).
#[derive(Debug)]
pub struct EnclosureRow<'a> {
    pub name: &'a str,
    pub kind: EnclosureKind,
    pub capacity: i32,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub notes: Option<&'a str>,
}

impl EnclosureRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_enclosure<'e, E>(
        &self,
        executor: E,
        city_id: Uuid,
        row: &EnclosureRow<'_>,
    ) -> Result<Enclosure, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let enclosure = sqlx::query_as::<_, Enclosure>(
            r#"
            INSERT INTO enclosures (id, city_id, name, kind, capacity, latitude, longitude, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(city_id)
        .bind(row.name)
        .bind(row.kind)
        .bind(row.capacity)
        .bind(row.latitude)
        .bind(row.longitude)
        .bind(row.notes)
        .fetch_one(executor)
        .await?;
        Ok(enclosure)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Enclosure>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let enclosure = sqlx::query_as::<_, Enclosure>("SELECT * FROM enclosures WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(enclosure)
    }

    /// Trava a linha da caixa: serializa as mudanças de ciclo de vida dos
    /// recursos desta caixa.
    pub async fn find_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Enclosure>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let enclosure = sqlx::query_as::<_, Enclosure>("SELECT * FROM enclosures WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(enclosure)
    }

    /// Trava a caixa dona da porta. Quem mexe numa porta trava a caixa antes.
    pub async fn lock_owner_of_port<'e, E>(&self, executor: E, port_id: Uuid) -> Result<Option<Enclosure>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let enclosure = sqlx::query_as::<_, Enclosure>(
            r#"
            SELECT e.* FROM enclosures e
            JOIN ports p ON p.enclosure_id = e.id
            WHERE p.id = $1
            FOR UPDATE OF e
            "#,
        )
        .bind(port_id)
        .fetch_optional(executor)
        .await?;
        Ok(enclosure)
    }

    /// Caixas donas de um conjunto de portas, travadas na ordem dos ids.
    pub async fn lock_owners_of_ports<'e, E>(&self, executor: E, port_ids: &[Uuid]) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM enclosures
            WHERE id IN (SELECT enclosure_id FROM ports WHERE id = ANY($1))
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(port_ids)
        .fetch_all(executor)
        .await?;
        Ok(ids)
    }

    pub async fn lock_owner_of_tray<'e, E>(&self, executor: E, tray_id: Uuid) -> Result<Option<Enclosure>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let enclosure = sqlx::query_as::<_, Enclosure>(
            r#"
            SELECT e.* FROM enclosures e
            JOIN trays t ON t.enclosure_id = e.id
            WHERE t.id = $1
            FOR UPDATE OF e
            "#,
        )
        .bind(tray_id)
        .fetch_optional(executor)
        .await?;
        Ok(enclosure)
    }

    pub async fn update_enclosure<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        row: &EnclosureRow<'_>,
    ) -> Result<Enclosure, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let enclosure = sqlx::query_as::<_, Enclosure>(
            r#"
            UPDATE enclosures SET
                name = $2,
                kind = $3,
                capacity = $4,
                latitude = $5,
                longitude = $6,
                notes = $7,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(row.name)
        .bind(row.kind)
        .bind(row.capacity)
        .bind(row.latitude)
        .bind(row.longitude)
        .bind(row.notes)
        .fetch_one(executor)
        .await?;
        Ok(enclosure)
    }

    /// Contagens de portas, portas não-livres, bandejas e fusões.
    pub async fn usage<'e, E>(&self, executor: E, id: Uuid) -> Result<EnclosureUsage, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let usage = sqlx::query_as::<_, EnclosureUsage>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM ports WHERE enclosure_id = $1) AS ports,
                (SELECT COUNT(*) FROM ports WHERE enclosure_id = $1 AND status <> 'LIVRE') AS busy_ports,
                (SELECT COUNT(*) FROM trays WHERE enclosure_id = $1) AS trays,
                (SELECT COUNT(*) FROM splices WHERE enclosure_id = $1) AS splices
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await?;
        Ok(usage)
    }

    // ---
    // Vínculo com rotas
    // ---

    pub async fn route_ids<'e, E>(&self, executor: E, id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT route_id FROM enclosure_routes WHERE enclosure_id = $1 ORDER BY route_id",
        )
        .bind(id)
        .fetch_all(executor)
        .await?;
        Ok(ids)
    }

    pub async fn replace_routes(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        route_ids: &[Uuid],
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM enclosure_routes WHERE enclosure_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if route_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO enclosure_routes (enclosure_id, route_id)
            SELECT $1, unnest($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(route_ids)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Remove os registros satélites e a própria caixa.
    /// Portas e bandejas devem ter sido removidas antes pelo chamador.
    pub async fn delete_with_dependents(&self, conn: &mut PgConnection, id: Uuid) -> Result<(), AppError> {
        for sql in [
            "DELETE FROM maintenances WHERE enclosure_id = $1",
            "DELETE FROM comments WHERE enclosure_id = $1",
            "DELETE FROM files WHERE enclosure_id = $1",
            "DELETE FROM enclosure_routes WHERE enclosure_id = $1",
            "DELETE FROM enclosures WHERE id = $1",
        ] {
            sqlx::query(sql).bind(id).execute(&mut *conn).await?;
        }
        Ok(())
    }

    pub async fn list_enclosures(
        &self,
        filter: &EnclosureFilter,
        allowed: Option<Vec<Uuid>>,
    ) -> Result<(Vec<Enclosure>, i64), AppError> {
        let page = filter.page();
        let search = filter.busca.as_deref().map(|s| format!("%{}%", s));

        let where_clause = r#"
            WHERE ($1::uuid[] IS NULL OR city_id = ANY($1))
              AND ($2::uuid IS NULL OR city_id = $2)
              AND ($3::enclosure_kind IS NULL OR kind = $3)
              AND ($4::text IS NULL OR name ILIKE $4)
        "#;

        let enclosures = sqlx::query_as::<_, Enclosure>(&format!(
            "SELECT * FROM enclosures {} ORDER BY name LIMIT $5 OFFSET $6",
            where_clause
        ))
        .bind(allowed.as_deref())
        .bind(filter.cidade_id)
        .bind(filter.tipo)
        .bind(search.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM enclosures {}", where_clause))
            .bind(allowed.as_deref())
            .bind(filter.cidade_id)
            .bind(filter.tipo)
            .bind(search.as_deref())
            .fetch_one(&self.pool)
            .await?;

        Ok((enclosures, total))
    }

    // ---
    // Manutenções
    // ---

    pub async fn create_maintenance<'e, E>(
        &self,
        executor: E,
        enclosure_id: Uuid,
        author_id: Uuid,
        description: &str,
        performed_at: NaiveDate,
    ) -> Result<Maintenance, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let maintenance = sqlx::query_as::<_, Maintenance>(
            r#"
            INSERT INTO maintenances (id, enclosure_id, author_id, description, performed_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(enclosure_id)
        .bind(author_id)
        .bind(description)
        .bind(performed_at)
        .fetch_one(executor)
        .await?;
        Ok(maintenance)
    }

    pub async fn list_maintenances(&self, enclosure_id: Uuid) -> Result<Vec<Maintenance>, AppError> {
        let rows = sqlx::query_as::<_, Maintenance>(
            "SELECT * FROM maintenances WHERE enclosure_id = $1 ORDER BY performed_at DESC, created_at DESC",
        )
        .bind(enclosure_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
