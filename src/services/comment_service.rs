// src/services/comment_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CommentRepository,
    models::{
        auth::Principal,
        comment::{Comment, CommentFilter, CommentOwner, CreateCommentPayload},
    },
    services::territory::{Target, TerritoryAuthorizer},
};

fn owner_target(owner: CommentOwner) -> Target {
    match owner {
        CommentOwner::Enclosure(id) => Target::Enclosure(id),
        CommentOwner::Route(id) => Target::Route(id),
    }
}

#[derive(Clone)]
pub struct CommentService {
    repo: CommentRepository,
    territory: TerritoryAuthorizer,
    pool: PgPool,
}

impl CommentService {
    pub fn new(repo: CommentRepository, territory: TerritoryAuthorizer, pool: PgPool) -> Self {
        Self { repo, territory, pool }
    }

    pub async fn list_comments(
        &self,
        principal: &Principal,
        filter: &CommentFilter,
    ) -> Result<(Vec<Comment>, i64), AppError> {
        let owner = CommentOwner::from_parts(filter.enclosure_id, filter.route_id).ok_or_else(|| {
            AppError::InvalidInput("Informe exatamente um entre 'caixaId' e 'rotaId'.".into())
        })?;

        let mut conn = self.pool.acquire().await?;
        self.territory.authorize(&mut *conn, principal, owner_target(owner)).await?;
        drop(conn);

        self.repo.list_comments(filter, owner).await
    }

    pub async fn create_comment(
        &self,
        principal: &Principal,
        payload: &CreateCommentPayload,
    ) -> Result<Comment, AppError> {
        let owner = CommentOwner::from_parts(payload.enclosure_id, payload.route_id).ok_or_else(|| {
            AppError::InvalidInput("Informe exatamente um entre 'caixaId' e 'rotaId'.".into())
        })?;

        let mut tx = self.pool.begin().await?;
        self.territory.authorize(&mut *tx, principal, owner_target(owner)).await?;

        let comment = self.repo
            .create_comment(&mut *tx, principal.user_id, owner, &payload.content)
            .await?;

        tx.commit().await?;
        Ok(comment)
    }

    /// Só o autor ou um Gerente removem um comentário.
    pub async fn delete_comment(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize(&mut *tx, principal, Target::Comment(id)).await?;

        let comment = self.repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Comentário"))?;
        if comment.author_id != principal.user_id && !principal.role.is_manager() {
            return Err(AppError::ForbiddenRole("remover comentário de outro autor".into()));
        }

        self.repo.delete_comment(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(())
    }
}
