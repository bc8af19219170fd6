use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_foreign_key_violation, error::AppError, pagination::PageParams},
    models::auth::{Role, User},
};

// O repositório de usuários, responsável pelas tabelas 'users' e 'user_cities'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu e-mail
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    pub async fn count_users(&self) -> Result<i64, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn list_users(&self, page: PageParams) -> Result<(Vec<User>, i64), AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY name ASC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = self.count_users().await?;
        Ok((users, total))
    }

    // Cria um novo usuário no banco de dados
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        name: &str,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(hashed_password)
        .bind(role)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // Converte erro de violação de chave única em um erro mais amigável
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::EmailAlreadyExists;
                }
            }
            e.into()
        })
    }

    pub async fn update_user<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
        hashed_password: Option<&str>,
        role: Option<Role>,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                role = COALESCE($5, role),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(hashed_password)
        .bind(role)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::EmailAlreadyExists;
                }
            }
            e.into()
        })
    }

    // ---
    // Territórios do usuário
    // ---

    pub async fn city_ids_for_user<'e, E>(&self, executor: E, user_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT city_id FROM user_cities WHERE user_id = $1 ORDER BY city_id",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        Ok(ids)
    }

    /// Substitui o conjunto de cidades do usuário (roda dentro da transação do chamador).
    pub async fn replace_cities(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        city_ids: &[Uuid],
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_cities WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        if city_ids.is_empty() {
            return Ok(());
        }

        // Inserção em massa usando UNNEST
        sqlx::query(
            r#"
            INSERT INTO user_cities (user_id, city_id)
            SELECT $1, unnest($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(city_ids)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_foreign_key_violation(e, "Uma ou mais cidades informadas não existem."))?;

        Ok(())
    }
}
