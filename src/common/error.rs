// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

// Nosso tipo de erro único. Toda falha de guarda vira uma destas variantes;
// só erros inesperados do banco chegam como 500.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    // Violação de invariante de capacidade / estado, com detalhe estruturado
    #[error("{message}")]
    InvariantViolation { message: String, details: Value },

    #[error("Não autorizado")]
    Unauthorized,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Cargo sem permissão: {0}")]
    ForbiddenRole(String),

    #[error("Acesso negado a este território")]
    ForbiddenTerritory,

    #[error("{0} não encontrado(a)")]
    NotFound(&'static str),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Conflito: {0}")]
    Conflict(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Atalho para montar uma violação de invariante com o payload de detalhe.
    pub fn invariant(message: impl Into<String>, details: Value) -> Self {
        AppError::InvariantViolation {
            message: message.into(),
            details,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidInput(_)
            | AppError::InvariantViolation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized | AppError::InvalidToken | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::ForbiddenRole(_) | AppError::ForbiddenTerritory => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmailAlreadyExists | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(e) if is_conflict(e) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Violação de unicidade ou falha de serialização no commit: outra requisição
// chegou primeiro. O chamador pode reenviar.
fn is_conflict(e: &sqlx::Error) -> bool {
    match e.as_database_error() {
        Some(db_err) => {
            db_err.is_unique_violation()
                || matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
        }
        None => false,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::BTreeMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "erro": "Um ou mais campos são inválidos.",
                    "detalhes": details,
                })
            }
            AppError::InvariantViolation { message, details } => json!({
                "erro": message,
                "detalhes": details,
            }),
            AppError::InvalidInput(message) => json!({ "erro": message }),
            AppError::Unauthorized => json!({ "erro": "Não autorizado" }),
            AppError::InvalidToken => {
                json!({ "erro": "Token de autenticação inválido ou expirado." })
            }
            AppError::InvalidCredentials => json!({ "erro": "E-mail ou senha inválidos." }),
            AppError::ForbiddenRole(operation) => json!({
                "erro": format!("Seu cargo não permite esta operação ({}).", operation)
            }),
            AppError::ForbiddenTerritory => {
                json!({ "erro": "Você não tem acesso a esta cidade." })
            }
            AppError::NotFound(entity) => json!({ "erro": format!("{} não encontrado(a).", entity) }),
            AppError::EmailAlreadyExists => json!({ "erro": "Este e-mail já está em uso." }),
            AppError::Conflict(message) => json!({ "erro": message }),
            AppError::DatabaseError(ref e) if status == StatusCode::CONFLICT => {
                tracing::warn!("Conflito detectado no commit: {}", e);
                json!({ "erro": "Conflito com uma alteração concorrente. Tente novamente." })
            }

            // Todos os outros erros viram 500. O `tracing` loga a mensagem detalhada.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                json!({ "erro": "Ocorreu um erro inesperado." })
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unauthorized_uses_canonical_body() {
        let (status, body) = body_json(AppError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "erro": "Não autorizado" }));
    }

    #[tokio::test]
    async fn invariant_violation_carries_details() {
        let err = AppError::invariant(
            "Capacidade menor que as portas em uso.",
            json!({ "capacidade": 2, "portasEmUso": 3 }),
        );
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detalhes"]["portasEmUso"], 3);
        assert_eq!(body["erro"], "Capacidade menor que as portas em uso.");
    }

    #[tokio::test]
    async fn role_and_territory_denials_are_forbidden() {
        assert_eq!(
            AppError::ForbiddenRole("Administracao".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::ForbiddenTerritory.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn validation_errors_list_fields() {
        let mut errors = validator::ValidationErrors::new();
        let mut e = validator::ValidationError::new("range");
        e.message = Some("A capacidade deve ser no mínimo 1.".into());
        errors.add("capacidade", e);

        let (status, body) = body_json(AppError::ValidationError(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detalhes"]["capacidade"][0], "A capacidade deve ser no mínimo 1.");
    }

    #[tokio::test]
    async fn unexpected_database_errors_do_not_leak() {
        let (status, body) = body_json(AppError::DatabaseError(sqlx::Error::PoolTimedOut)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["erro"], "Ocorreu um erro inesperado.");
    }
}
