// src/common/db_utils.rs

use crate::common::error::AppError;

// ---
// Helpers de mapeamento de erros do Postgres
// ---

/// Converte violação de unicidade em `Conflict` com uma mensagem amigável.
/// Qualquer outro erro segue como `DatabaseError`.
pub(crate) fn map_unique_violation(e: sqlx::Error, message: &str) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return AppError::Conflict(message.to_string());
        }
    }
    e.into()
}

/// Converte violação de chave estrangeira em entrada inválida
/// (referência a uma linha que não existe).
pub(crate) fn map_foreign_key_violation(e: sqlx::Error, message: &str) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_foreign_key_violation() {
            return AppError::InvalidInput(message.to_string());
        }
    }
    e.into()
}
