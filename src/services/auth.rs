// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, Principal, Role, User},
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    expiration_hours: i64,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, expiration_hours: i64, pool: PgPool) -> Self {
        Self { user_repo, jwt_secret, expiration_hours, pool }
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self.user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!("Login de {} ({:?})", user.id, user.role);
        self.create_token(&user)
    }

    /// Valida o token e carrega o cargo atual do usuário.
    /// Um usuário removido ou com cargo alterado depois da emissão não
    /// herda o cargo antigo do token.
    pub async fn validate_token(&self, token: &str) -> Result<Principal, AppError> {
        let claims = decode_token(&self.jwt_secret, token)?;

        let user = self.user_repo
            .find_by_id(&self.pool, claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        Ok(Principal { user_id: user.id, role: user.role })
    }

    pub async fn current_user(&self, principal: &Principal) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(&self.pool, principal.user_id)
            .await?
            .ok_or(AppError::NotFound("Usuário"))
    }

    /// Cria o primeiro Gerente quando a base ainda não tem usuários.
    pub async fn bootstrap_manager(&self, email: &str, password: &str) -> Result<(), AppError> {
        if self.user_repo.count_users().await? > 0 {
            return Ok(());
        }

        let hashed = hash_password(password).await?;
        let user = self.user_repo
            .create_user(&self.pool, "Gerente", email, &hashed, Role::Manager)
            .await?;

        tracing::info!("👤 Gerente inicial criado: {}", user.email);
        Ok(())
    }

    fn create_token(&self, user: &User) -> Result<String, AppError> {
        encode_token(&self.jwt_secret, user.id, user.role, self.expiration_hours)
    }
}

/// Hash bcrypt fora do runtime assíncrono.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password_clone = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

pub fn encode_token(secret: &str, user_id: Uuid, role: Role, expiration_hours: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::hours(expiration_hours);

    let claims = Claims {
        sub: user_id,
        role,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_subject_and_role() {
        let user_id = Uuid::new_v4();
        let token = encode_token("segredo", user_id, Role::Engineer, 1).unwrap();
        let claims = decode_token("segredo", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Engineer);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_invalid_token() {
        let token = encode_token("segredo", Uuid::new_v4(), Role::Technician, 1).unwrap();
        let err = decode_token("outro", &token).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = encode_token("segredo", Uuid::new_v4(), Role::Manager, -2).unwrap();
        assert!(matches!(decode_token("segredo", &token), Err(AppError::InvalidToken)));
    }
}
