// src/models/splice.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::pagination::PageParams;

/// Fusões por requisição: o maior cabo de rota (288 fibras).
pub const MAX_SPLICE_BATCH: u64 = 288;

// Fusão entre dois capilares dentro de uma CEO
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Splice {
    pub id: Uuid,
    #[serde(rename = "caixaId")]
    pub enclosure_id: Uuid,
    #[serde(rename = "bandejaId")]
    pub tray_id: Option<Uuid>,
    #[serde(rename = "fibraOrigemId")]
    pub origin_fiber_id: Uuid,
    #[serde(rename = "fibraDestinoId")]
    pub destination_fiber_id: Uuid,
    #[serde(rename = "observacoes")]
    pub notes: Option<String>,
    #[serde(rename = "criadoPor")]
    pub created_by: Uuid,
    #[serde(rename = "criadoEm")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_distinct_fibers"))]
pub struct CreateSplicePayload {
    #[serde(rename = "caixaId")]
    pub enclosure_id: Uuid,
    #[serde(rename = "bandejaId")]
    pub tray_id: Option<Uuid>,
    #[serde(rename = "fibraOrigemId")]
    pub origin_fiber_id: Uuid,
    #[serde(rename = "fibraDestinoId")]
    pub destination_fiber_id: Uuid,
    #[serde(rename = "observacoes")]
    pub notes: Option<String>,
}

fn validate_distinct_fibers(payload: &CreateSplicePayload) -> Result<(), ValidationError> {
    if payload.origin_fiber_id == payload.destination_fiber_id {
        let mut err = ValidationError::new("distinct_fibers");
        err.message = Some("A fibra de origem e a de destino devem ser diferentes.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpliceBatchPayload {
    #[validate(length(
        min = 1,
        max = MAX_SPLICE_BATCH,
        message = "Informe de 1 a 288 fusões por requisição."
    ))]
    #[validate(nested)]
    pub splices: Vec<CreateSplicePayload>,
}

/// `POST /splices` aceita uma fusão ou `{ "splices": [...] }`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum SplicePayload {
    Batch(CreateSpliceBatchPayload),
    Single(CreateSplicePayload),
}

impl SplicePayload {
    pub fn into_batch(self) -> Vec<CreateSplicePayload> {
        match self {
            SplicePayload::Batch(batch) => batch.splices,
            SplicePayload::Single(single) => vec![single],
        }
    }
}

impl Validate for SplicePayload {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            SplicePayload::Batch(batch) => batch.validate(),
            SplicePayload::Single(single) => single.validate(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpliceFilter {
    pub pagina: Option<i64>,
    pub limite: Option<i64>,
    #[serde(rename = "caixaId")]
    pub enclosure_id: Uuid,
    #[serde(rename = "bandejaId")]
    pub tray_id: Option<Uuid>,
}

impl SpliceFilter {
    pub fn page(&self) -> PageParams {
        PageParams { pagina: self.pagina, limite: self.limite }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_and_batch_payloads_deserialize() {
        let enclosure = Uuid::new_v4();
        let single = json!({
            "caixaId": enclosure,
            "fibraOrigemId": Uuid::new_v4(),
            "fibraDestinoId": Uuid::new_v4(),
        });
        let payload: SplicePayload = serde_json::from_value(single.clone()).unwrap();
        assert_eq!(payload.into_batch().len(), 1);

        let batch = json!({ "splices": [single.clone(), single] });
        let payload: SplicePayload = serde_json::from_value(batch).unwrap();
        assert!(matches!(payload, SplicePayload::Batch(_)));
        assert_eq!(payload.into_batch().len(), 2);
    }

    #[test]
    fn same_fiber_on_both_ends_is_invalid() {
        let fiber = Uuid::new_v4();
        let payload = CreateSplicePayload {
            enclosure_id: Uuid::new_v4(),
            tray_id: None,
            origin_fiber_id: fiber,
            destination_fiber_id: fiber,
            notes: None,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn oversized_batch_is_invalid() {
        let splice = CreateSplicePayload {
            enclosure_id: Uuid::new_v4(),
            tray_id: None,
            origin_fiber_id: Uuid::new_v4(),
            destination_fiber_id: Uuid::new_v4(),
            notes: None,
        };
        let at_limit = CreateSpliceBatchPayload {
            splices: vec![splice.clone(); MAX_SPLICE_BATCH as usize],
        };
        assert!(at_limit.validate().is_ok());

        let over = CreateSpliceBatchPayload {
            splices: vec![splice; MAX_SPLICE_BATCH as usize + 1],
        };
        assert!(over.validate().is_err());
    }

    #[test]
    fn empty_batch_is_invalid() {
        let payload = SplicePayload::Batch(CreateSpliceBatchPayload { splices: vec![] });
        assert!(payload.validate().is_err());
    }
}
