// src/models/city.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::{pagination::PageParams, serde_utils::double_option};

// ---
// City (o "Território")
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: Uuid,
    #[serde(rename = "nome")]
    #[schema(example = "Campina Grande")]
    pub name: String,
    #[serde(rename = "uf")]
    #[schema(example = "PB")]
    pub state: String,
    #[schema(value_type = Option<f64>, example = -7.230556)]
    pub latitude: Option<Decimal>,
    #[schema(value_type = Option<f64>, example = -35.881111)]
    pub longitude: Option<Decimal>,
    #[serde(rename = "criadoEm")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "atualizadoEm")]
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn validate_state_code(state: &str) -> Result<(), ValidationError> {
    if state.len() == 2 && state.chars().all(|c| c.is_ascii_uppercase()) {
        return Ok(());
    }
    let mut err = ValidationError::new("state");
    err.message = Some("A UF deve ter duas letras maiúsculas.".into());
    Err(err)
}

pub(crate) fn validate_latitude(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::from(-90) || *val > Decimal::from(90) {
        let mut err = ValidationError::new("range");
        err.message = Some("Latitude fora do intervalo [-90, 90].".into());
        return Err(err);
    }
    Ok(())
}

pub(crate) fn validate_longitude(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::from(-180) || *val > Decimal::from(180) {
        let mut err = ValidationError::new("range");
        err.message = Some("Longitude fora do intervalo [-180, 180].".into());
        return Err(err);
    }
    Ok(())
}

/// Coordenadas de um PATCH: só valores enviados são conferidos.
pub(crate) fn validate_patch_coordinates(
    latitude: Option<Option<Decimal>>,
    longitude: Option<Option<Decimal>>,
) -> Result<(), ValidationError> {
    if let Some(Some(lat)) = latitude {
        validate_latitude(&lat)?;
    }
    if let Some(Some(lon)) = longitude {
        validate_longitude(&lon)?;
    }
    Ok(())
}

fn validate_city_patch(payload: &UpdateCityPayload) -> Result<(), ValidationError> {
    validate_patch_coordinates(payload.latitude, payload.longitude)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCityPayload {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[serde(rename = "uf")]
    #[validate(custom(function = "validate_state_code"))]
    pub state: String,
    #[validate(custom(function = "validate_latitude"))]
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<Decimal>,
    #[validate(custom(function = "validate_longitude"))]
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_city_patch"))]
pub struct UpdateCityPayload {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,
    #[serde(rename = "uf")]
    #[validate(custom(function = "validate_state_code"))]
    pub state: Option<String>,
    // Ausente: mantém. `null`: apaga.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<Option<Decimal>>,
}

// Filtro explícito da listagem de cidades
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityFilter {
    pub pagina: Option<i64>,
    pub limite: Option<i64>,
    pub busca: Option<String>,
    #[serde(rename = "uf")]
    pub state: Option<String>,
}

impl CityFilter {
    pub fn page(&self) -> PageParams {
        PageParams { pagina: self.pagina, limite: self.limite }
    }
}
