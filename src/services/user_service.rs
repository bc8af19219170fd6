// src/services/user_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageParams},
    db::UserRepository,
    models::auth::{CreateUserPayload, UpdateUserPayload, User, UserWithCities},
    services::auth::hash_password,
};

// Gestão de usuários e de seus vínculos com cidades (somente Gerente)
#[derive(Clone)]
pub struct UserService {
    repo: UserRepository,
    pool: PgPool,
}

impl UserService {
    pub fn new(repo: UserRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    pub async fn list_users(&self, page: PageParams) -> Result<(Vec<User>, i64), AppError> {
        self.repo.list_users(page).await
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserWithCities, AppError> {
        let mut conn = self.pool.acquire().await?;
        let user = self.repo
            .find_by_id(&mut *conn, id)
            .await?
            .ok_or(AppError::NotFound("Usuário"))?;
        let city_ids = self.repo.city_ids_for_user(&mut *conn, id).await?;
        Ok(UserWithCities { user, city_ids })
    }

    pub async fn create_user(&self, payload: &CreateUserPayload) -> Result<UserWithCities, AppError> {
        let hashed = hash_password(&payload.password).await?;

        let mut tx = self.pool.begin().await?;

        let user = self.repo
            .create_user(&mut *tx, &payload.name, &payload.email, &hashed, payload.role)
            .await?;
        self.repo.replace_cities(&mut *tx, user.id, &payload.city_ids).await?;
        let city_ids = self.repo.city_ids_for_user(&mut *tx, user.id).await?;

        tx.commit().await?;

        tracing::info!("Usuário {} criado com cargo {:?}", user.id, user.role);
        Ok(UserWithCities { user, city_ids })
    }

    pub async fn update_user(&self, id: Uuid, payload: &UpdateUserPayload) -> Result<UserWithCities, AppError> {
        let hashed = match payload.password.as_deref() {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let user = self.repo
            .update_user(
                &mut *tx,
                id,
                payload.name.as_deref(),
                payload.email.as_deref(),
                hashed.as_deref(),
                payload.role,
            )
            .await?
            .ok_or(AppError::NotFound("Usuário"))?;
        let city_ids = self.repo.city_ids_for_user(&mut *tx, id).await?;

        tx.commit().await?;
        Ok(UserWithCities { user, city_ids })
    }

    /// Substitui o território do usuário.
    pub async fn assign_cities(&self, id: Uuid, city_ids: &[Uuid]) -> Result<UserWithCities, AppError> {
        let mut tx = self.pool.begin().await?;

        let user = self.repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Usuário"))?;
        self.repo.replace_cities(&mut *tx, id, city_ids).await?;
        let city_ids = self.repo.city_ids_for_user(&mut *tx, id).await?;

        tx.commit().await?;

        tracing::info!("Território do usuário {} atualizado: {} cidade(s)", id, city_ids.len());
        Ok(UserWithCities { user, city_ids })
    }
}
