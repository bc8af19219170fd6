// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Cargo do usuário. Define quais classes de operação ele pode executar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[serde(rename = "Tecnico")]
    #[sqlx(rename = "TECNICO")]
    Technician,
    #[serde(rename = "Engenheiro")]
    #[sqlx(rename = "ENGENHEIRO")]
    Engineer,
    #[serde(rename = "Gerente")]
    #[sqlx(rename = "GERENTE")]
    Manager,
}

impl Role {
    pub fn is_manager(self) -> bool {
        matches!(self, Role::Manager)
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "cargo")]
    pub role: Role,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    #[serde(rename = "criadoEm")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "atualizadoEm")]
    pub updated_at: DateTime<Utc>,
}

/// O "principal" de uma requisição: quem é e qual cargo tem. Nada mais.
/// As cidades são consultadas no banco a cada decisão de território.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

// Usuário com a lista de cidades atribuídas (resposta de /me e /users/{id})
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserWithCities {
    #[serde(flatten)]
    pub user: User,
    #[serde(rename = "cidadeIds")]
    pub city_ids: Vec<Uuid>,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "tecnico@provedor.com.br")]
    pub email: String,
    #[serde(rename = "senha")]
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub role: Role, // Cargo no momento da emissão
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

// Criação de usuário (somente Gerente)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[serde(rename = "senha")]
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    #[serde(rename = "cargo")]
    pub role: Role,
    #[serde(rename = "cidadeIds")]
    #[serde(default)]
    pub city_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    #[serde(rename = "senha")]
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: Option<String>,
    #[serde(rename = "cargo")]
    pub role: Option<Role>,
}

// Substitui o conjunto de cidades de um usuário
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignCitiesPayload {
    #[serde(rename = "cidadeIds")]
    pub city_ids: Vec<Uuid>,
}
