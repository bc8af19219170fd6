// src/models/customer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError};

use crate::common::{pagination::PageParams, serde_utils::double_option};

// Cliente terminado (ou a terminar) numa porta de CTO
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    #[serde(rename = "cidadeId")]
    pub city_id: Uuid,
    #[serde(rename = "nome")]
    #[schema(example = "Maria da Silva")]
    pub name: String,
    #[serde(rename = "documento")]
    pub document: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "telefone")]
    pub phone: Option<String>,
    #[serde(rename = "endereco")]
    pub address: Option<String>,
    #[serde(rename = "portaId")]
    pub port_id: Option<Uuid>,
    #[serde(rename = "criadoEm")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "atualizadoEm")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerPayload {
    #[serde(rename = "cidadeId")]
    pub city_id: Uuid,
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[serde(rename = "documento")]
    pub document: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    #[serde(rename = "telefone")]
    pub phone: Option<String>,
    #[serde(rename = "endereco")]
    pub address: Option<String>,
    #[serde(rename = "portaId")]
    pub port_id: Option<Uuid>,
}

fn validate_customer_patch(payload: &UpdateCustomerPayload) -> Result<(), ValidationError> {
    if let Some(Some(email)) = &payload.email {
        if !email.validate_email() {
            let mut err = ValidationError::new("email");
            err.message = Some("O e-mail fornecido é inválido.".into());
            return Err(err);
        }
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_customer_patch"))]
pub struct UpdateCustomerPayload {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,
    // Contatos: ausente mantém, `null` apaga
    #[serde(rename = "documento")]
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub document: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    #[serde(rename = "telefone")]
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(rename = "endereco")]
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
    // Ausente: mantém a porta. `null`: libera a porta. Valor: troca de porta.
    #[serde(rename = "portaId")]
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub port_id: Option<Option<Uuid>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFilter {
    pub pagina: Option<i64>,
    pub limite: Option<i64>,
    pub cidade_id: Option<Uuid>,
    pub busca: Option<String>,
    #[serde(rename = "caixaId")]
    pub enclosure_id: Option<Uuid>,
}

impl CustomerFilter {
    pub fn page(&self) -> PageParams {
        PageParams { pagina: self.pagina, limite: self.limite }
    }
}
