// src/db/comment_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::comment::{Comment, CommentFilter, CommentOwner},
};

#[derive(Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_comment<'e, E>(
        &self,
        executor: E,
        author_id: Uuid,
        owner: CommentOwner,
        content: &str,
    ) -> Result<Comment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (enclosure_id, route_id) = match owner {
            CommentOwner::Enclosure(id) => (Some(id), None),
            CommentOwner::Route(id) => (None, Some(id)),
        };

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, author_id, enclosure_id, route_id, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(author_id)
        .bind(enclosure_id)
        .bind(route_id)
        .bind(content)
        .fetch_one(executor)
        .await?;
        Ok(comment)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Comment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(comment)
    }

    pub async fn delete_comment<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Comentários de uma caixa ou de uma rota, mais recentes primeiro.
    pub async fn list_comments(
        &self,
        filter: &CommentFilter,
        owner: CommentOwner,
    ) -> Result<(Vec<Comment>, i64), AppError> {
        let page = filter.page();
        let (column, owner_id) = match owner {
            CommentOwner::Enclosure(id) => ("enclosure_id", id),
            CommentOwner::Route(id) => ("route_id", id),
        };

        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT * FROM comments WHERE {} = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            column
        ))
        .bind(owner_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM comments WHERE {} = $1", column))
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((comments, total))
    }
}
