// src/models/enclosure.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::{pagination::PageParams, serde_utils::double_option};
use crate::models::city::{validate_latitude, validate_longitude, validate_patch_coordinates};

/// Maior capacidade declarável de uma caixa (portas da CTO ou fusões da CEO).
pub const MAX_ENCLOSURE_CAPACITY: i32 = 1024;

/// Maior capacidade de uma bandeja individual.
pub const MAX_TRAY_CAPACITY: i32 = 288;

// ---
// 1. Classe da caixa
// ---
// CTO (terminal, com portas) ou CEO (emenda, com bandejas)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "enclosure_kind")]
pub enum EnclosureKind {
    #[serde(rename = "CTO")]
    #[sqlx(rename = "CTO")]
    Terminal,
    #[serde(rename = "CEO")]
    #[sqlx(rename = "CEO")]
    Splice,
}

// ---
// 2. Status da porta
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "port_status")]
pub enum PortStatus {
    #[serde(rename = "Livre")]
    #[sqlx(rename = "LIVRE")]
    Free,
    #[serde(rename = "Reservada")]
    #[sqlx(rename = "RESERVADA")]
    Reserved,
    #[serde(rename = "Ocupada")]
    #[sqlx(rename = "OCUPADA")]
    InUse,
    #[serde(rename = "Defeito")]
    #[sqlx(rename = "DEFEITO")]
    Faulty,
}

// ---
// 3. Enclosure (a "Caixa")
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Enclosure {
    pub id: Uuid,
    #[serde(rename = "cidadeId")]
    pub city_id: Uuid,
    #[serde(rename = "nome")]
    #[schema(example = "CTO-0142")]
    pub name: String,
    #[serde(rename = "tipo")]
    pub kind: EnclosureKind,
    #[serde(rename = "capacidade")]
    #[schema(example = 16)]
    pub capacity: i32,
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<Decimal>,
    #[serde(rename = "observacoes")]
    pub notes: Option<String>,
    #[serde(rename = "criadoEm")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "atualizadoEm")]
    pub updated_at: DateTime<Utc>,
}

// Caixa com as rotas vinculadas e o resumo de uso dos recursos
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnclosureDetail {
    #[serde(flatten)]
    pub enclosure: Enclosure,
    #[serde(rename = "rotaIds")]
    pub route_ids: Vec<Uuid>,
    #[serde(rename = "uso")]
    pub usage: EnclosureUsage,
}

/// Contagens usadas pelas guardas de ciclo de vida.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnclosureUsage {
    #[serde(rename = "portas")]
    pub ports: i64,
    #[serde(rename = "portasOcupadas")]
    pub busy_ports: i64,
    #[serde(rename = "bandejas")]
    pub trays: i64,
    #[serde(rename = "fusoes")]
    pub splices: i64,
}

impl EnclosureUsage {
    /// Algum recurso em uso: porta não-livre ou qualquer fusão.
    pub fn in_use(&self) -> bool {
        self.busy_ports > 0 || self.splices > 0
    }
}

// ---
// 4. Port (a "Porta" da CTO)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: Uuid,
    #[serde(rename = "caixaId")]
    pub enclosure_id: Uuid,
    #[serde(rename = "numero")]
    pub number: i32,
    pub status: PortStatus,
    #[serde(rename = "atualizadoEm")]
    pub updated_at: DateTime<Utc>,
}

// Porta com o cliente que a ocupa (listagem da caixa)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortWithCustomer {
    pub id: Uuid,
    #[serde(rename = "caixaId")]
    pub enclosure_id: Uuid,
    #[serde(rename = "numero")]
    pub number: i32,
    pub status: PortStatus,
    #[serde(rename = "atualizadoEm")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "clienteId")]
    pub customer_id: Option<Uuid>,
    #[serde(rename = "clienteNome")]
    pub customer_name: Option<String>,
}

// ---
// 5. Tray (a "Bandeja" da CEO)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tray {
    pub id: Uuid,
    #[serde(rename = "caixaId")]
    pub enclosure_id: Uuid,
    #[serde(rename = "numero")]
    pub number: i32,
    #[serde(rename = "capacidade")]
    pub capacity: i32,
    #[serde(rename = "atualizadoEm")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrayWithUsage {
    pub id: Uuid,
    #[serde(rename = "caixaId")]
    pub enclosure_id: Uuid,
    #[serde(rename = "numero")]
    pub number: i32,
    #[serde(rename = "capacidade")]
    pub capacity: i32,
    #[serde(rename = "atualizadoEm")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "fusoes")]
    pub splices: i64,
}

// ---
// 6. Maintenance (registro de manutenção)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Maintenance {
    pub id: Uuid,
    #[serde(rename = "caixaId")]
    pub enclosure_id: Uuid,
    #[serde(rename = "autorId")]
    pub author_id: Uuid,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "realizadaEm")]
    #[schema(value_type = String, format = Date, example = "2025-03-14")]
    pub performed_at: NaiveDate,
    #[serde(rename = "criadoEm")]
    pub created_at: DateTime<Utc>,
}

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnclosurePayload {
    #[serde(rename = "cidadeId")]
    pub city_id: Uuid,
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[serde(rename = "tipo")]
    pub kind: EnclosureKind,
    #[serde(rename = "capacidade")]
    #[validate(range(min = 1, max = MAX_ENCLOSURE_CAPACITY, message = "A capacidade deve estar entre 1 e 1024."))]
    pub capacity: i32,
    #[validate(custom(function = "validate_latitude"))]
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<Decimal>,
    #[validate(custom(function = "validate_longitude"))]
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<Decimal>,
    #[serde(rename = "observacoes")]
    pub notes: Option<String>,
    #[serde(rename = "rotaIds")]
    #[serde(default)]
    pub route_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_enclosure_patch"))]
pub struct UpdateEnclosurePayload {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,
    #[serde(rename = "tipo")]
    pub kind: Option<EnclosureKind>,
    #[serde(rename = "capacidade")]
    #[validate(range(min = 1, max = MAX_ENCLOSURE_CAPACITY, message = "A capacidade deve estar entre 1 e 1024."))]
    pub capacity: Option<i32>,
    // Ausente: mantém. `null`: apaga.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<Option<Decimal>>,
    #[serde(rename = "observacoes")]
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    // Quando presente, substitui o conjunto de rotas vinculadas
    #[serde(rename = "rotaIds")]
    pub route_ids: Option<Vec<Uuid>>,
}

fn validate_enclosure_patch(payload: &UpdateEnclosurePayload) -> Result<(), ValidationError> {
    validate_patch_coordinates(payload.latitude, payload.longitude)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaintenancePayload {
    #[serde(rename = "descricao")]
    #[validate(length(min = 1, message = "A descrição é obrigatória."))]
    pub description: String,
    #[serde(rename = "realizadaEm")]
    #[schema(value_type = Option<String>, format = Date)]
    pub performed_at: Option<NaiveDate>,
}

// Atualização de status de uma porta
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePortPayload {
    pub status: PortStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkPortUpdate {
    pub id: Uuid,
    pub status: PortStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkPortsPayload {
    #[serde(rename = "portas")]
    pub ports: Vec<BulkPortUpdate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTrayPayload {
    #[serde(rename = "capacidade")]
    #[validate(range(min = 1, max = MAX_TRAY_CAPACITY, message = "A capacidade da bandeja deve estar entre 1 e 288."))]
    pub capacity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkTrayUpdate {
    pub id: Uuid,
    #[serde(rename = "capacidade")]
    #[validate(range(min = 1, max = MAX_TRAY_CAPACITY, message = "A capacidade da bandeja deve estar entre 1 e 288."))]
    pub capacity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkTraysPayload {
    #[serde(rename = "bandejas")]
    #[validate(nested)]
    pub trays: Vec<BulkTrayUpdate>,
}

// Filtro explícito da listagem de caixas
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnclosureFilter {
    pub pagina: Option<i64>,
    pub limite: Option<i64>,
    pub cidade_id: Option<Uuid>,
    pub tipo: Option<EnclosureKind>,
    pub busca: Option<String>,
}

impl EnclosureFilter {
    pub fn page(&self) -> PageParams {
        PageParams { pagina: self.pagina, limite: self.limite }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cto(capacity: i64) -> CreateEnclosurePayload {
        serde_json::from_value(json!({
            "cidadeId": Uuid::new_v4(),
            "nome": "CTO-01",
            "tipo": "CTO",
            "capacidade": capacity,
        }))
        .unwrap()
    }

    #[test]
    fn enclosure_capacity_is_bounded() {
        assert!(cto(1).validate().is_ok());
        assert!(cto(MAX_ENCLOSURE_CAPACITY as i64).validate().is_ok());
        assert!(cto(0).validate().is_err());
        assert!(cto(MAX_ENCLOSURE_CAPACITY as i64 + 1).validate().is_err());
        assert!(cto(i32::MAX as i64).validate().is_err());

        let patch = UpdateEnclosurePayload { capacity: Some(i32::MAX), ..Default::default() };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn tray_capacity_is_bounded() {
        assert!(UpdateTrayPayload { capacity: MAX_TRAY_CAPACITY }.validate().is_ok());
        assert!(UpdateTrayPayload { capacity: MAX_TRAY_CAPACITY + 1 }.validate().is_err());

        let bulk = BulkTraysPayload {
            trays: vec![BulkTrayUpdate { id: Uuid::new_v4(), capacity: i32::MAX }],
        };
        assert!(bulk.validate().is_err());
    }

    #[test]
    fn wire_keys_are_portuguese() {
        let tray = Tray {
            id: Uuid::new_v4(),
            enclosure_id: Uuid::new_v4(),
            number: 1,
            capacity: 12,
            updated_at: chrono::Utc::now(),
        };
        let body = serde_json::to_value(&tray).unwrap();
        let mut keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["atualizadoEm", "caixaId", "capacidade", "id", "numero"]);

        let usage = serde_json::to_value(EnclosureUsage { ports: 8, busy_ports: 1, trays: 0, splices: 0 }).unwrap();
        assert_eq!(usage, json!({ "portas": 8, "portasOcupadas": 1, "bandejas": 0, "fusoes": 0 }));
    }
}
