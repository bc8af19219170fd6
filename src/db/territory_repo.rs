// src/db/territory_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, services::territory::Target};

// Consultas de "dono" (cadeia entidade -> cidade) e de pertencimento
#[derive(Clone, Default)]
pub struct TerritoryRepository;

impl TerritoryRepository {
    pub fn new() -> Self {
        Self
    }

    /// Percorre a cadeia de posse até a cidade. `None` quando algum elo não existe.
    pub async fn owning_city<'e, E>(&self, executor: E, target: Target) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = match target {
            Target::City(_) => "SELECT id FROM cities WHERE id = $1",
            Target::Route(_) => "SELECT city_id FROM routes WHERE id = $1",
            Target::Fiber(_) => {
                r#"
                SELECT r.city_id
                FROM fibers f
                JOIN tubes t ON t.id = f.tube_id
                JOIN routes r ON r.id = t.route_id
                WHERE f.id = $1
                "#
            }
            Target::Enclosure(_) => "SELECT city_id FROM enclosures WHERE id = $1",
            Target::Port(_) => {
                "SELECT e.city_id FROM ports p JOIN enclosures e ON e.id = p.enclosure_id WHERE p.id = $1"
            }
            Target::Tray(_) => {
                "SELECT e.city_id FROM trays t JOIN enclosures e ON e.id = t.enclosure_id WHERE t.id = $1"
            }
            Target::Splice(_) => {
                "SELECT e.city_id FROM splices s JOIN enclosures e ON e.id = s.enclosure_id WHERE s.id = $1"
            }
            Target::Customer(_) => "SELECT city_id FROM customers WHERE id = $1",
            Target::Comment(_) => {
                r#"
                SELECT COALESCE(e.city_id, r.city_id)
                FROM comments c
                LEFT JOIN enclosures e ON e.id = c.enclosure_id
                LEFT JOIN routes r ON r.id = c.route_id
                WHERE c.id = $1
                "#
            }
        };

        let city_id = sqlx::query_scalar::<_, Option<Uuid>>(sql)
            .bind(target.id())
            .fetch_optional(executor)
            .await?;

        Ok(city_id.flatten())
    }

    pub async fn is_member<'e, E>(&self, executor: E, user_id: Uuid, city_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM user_cities WHERE user_id = $1 AND city_id = $2)",
        )
        .bind(user_id)
        .bind(city_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    pub async fn member_cities<'e, E>(&self, executor: E, user_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT city_id FROM user_cities WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(executor)
            .await?;
        Ok(ids)
    }
}
