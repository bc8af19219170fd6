// src/models/route.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::{pagination::PageParams, serde_utils::double_option};

/// Fibras por tubo loose.
pub const FIBERS_PER_TUBE: i32 = 12;

/// Maior cabo aceito (24 tubos de 12).
pub const MAX_FIBER_COUNT: i32 = 288;

/// Sequência de cores padrão (ABNT) para tubos e capilares.
pub const FIBER_COLORS: [&str; 12] = [
    "Verde", "Amarelo", "Branco", "Azul", "Vermelho", "Violeta",
    "Marrom", "Rosa", "Preto", "Cinza", "Laranja", "Aqua",
];

/// Cor da posição `number` (1-based), repetindo a sequência a cada 12.
pub fn color_for(number: i32) -> &'static str {
    FIBER_COLORS[((number - 1).rem_euclid(12)) as usize]
}

// ---
// Route (o "Cabo")
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    #[serde(rename = "cidadeId")]
    pub city_id: Uuid,
    #[serde(rename = "nome")]
    #[schema(example = "Backbone Centro")]
    pub name: String,
    #[serde(rename = "tipoCabo")]
    #[schema(example = "AS-80")]
    pub cable_type: String,
    #[serde(rename = "quantidadeFibras")]
    #[schema(example = 36)]
    pub fiber_count: i32,
    #[serde(rename = "comprimentoMetros")]
    #[schema(value_type = Option<f64>)]
    pub length_meters: Option<Decimal>,
    #[serde(rename = "criadoEm")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "atualizadoEm")]
    pub updated_at: DateTime<Utc>,
}

// Tubo loose dentro do cabo
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tube {
    pub id: Uuid,
    #[serde(rename = "rotaId")]
    pub route_id: Uuid,
    #[serde(rename = "numero")]
    pub number: i32,
    #[serde(rename = "cor")]
    pub color: String,
}

// Capilar (fibra individual)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Fiber {
    pub id: Uuid,
    #[serde(rename = "tuboId")]
    pub tube_id: Uuid,
    #[serde(rename = "numero")]
    pub number: i32,
    #[serde(rename = "cor")]
    pub color: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TubeWithFibers {
    #[serde(flatten)]
    pub tube: Tube,
    #[serde(rename = "fibras")]
    pub fibers: Vec<Fiber>,
}

pub(crate) fn validate_fiber_count(count: i32) -> Result<(), ValidationError> {
    if count < FIBERS_PER_TUBE || count > MAX_FIBER_COUNT || count % FIBERS_PER_TUBE != 0 {
        let mut err = ValidationError::new("fiber_count");
        err.message = Some("O cabo deve ter de 12 a 288 fibras, em múltiplos de 12.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_length(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("O comprimento não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoutePayload {
    #[serde(rename = "cidadeId")]
    pub city_id: Uuid,
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[serde(rename = "tipoCabo")]
    #[validate(length(min = 1, message = "O tipo de cabo é obrigatório."))]
    pub cable_type: String,
    #[serde(rename = "quantidadeFibras")]
    #[validate(custom(function = "validate_fiber_count"))]
    pub fiber_count: i32,
    #[serde(rename = "comprimentoMetros")]
    #[validate(custom(function = "validate_length"))]
    #[schema(value_type = Option<f64>)]
    pub length_meters: Option<Decimal>,
}

// O número de fibras é fixo: os tubos e capilares nascem com a rota.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_route_patch"))]
pub struct UpdateRoutePayload {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,
    #[serde(rename = "tipoCabo")]
    #[validate(length(min = 1, message = "O tipo de cabo não pode ser vazio."))]
    pub cable_type: Option<String>,
    // Ausente: mantém. `null`: apaga.
    #[serde(rename = "comprimentoMetros")]
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub length_meters: Option<Option<Decimal>>,
}

fn validate_route_patch(payload: &UpdateRoutePayload) -> Result<(), ValidationError> {
    match payload.length_meters {
        Some(Some(length)) => validate_length(&length),
        _ => Ok(()),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteFilter {
    pub pagina: Option<i64>,
    pub limite: Option<i64>,
    pub cidade_id: Option<Uuid>,
    pub busca: Option<String>,
}

impl RouteFilter {
    pub fn page(&self) -> PageParams {
        PageParams { pagina: self.pagina, limite: self.limite }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_follow_abnt_sequence_and_wrap() {
        assert_eq!(color_for(1), "Verde");
        assert_eq!(color_for(12), "Aqua");
        assert_eq!(color_for(13), "Verde");
        assert_eq!(color_for(4), "Azul");
    }

    #[test]
    fn fiber_count_must_be_multiple_of_twelve() {
        assert!(validate_fiber_count(12).is_ok());
        assert!(validate_fiber_count(144).is_ok());
        assert!(validate_fiber_count(0).is_err());
        assert!(validate_fiber_count(18).is_err());
        assert!(validate_fiber_count(300).is_err());
    }
}
