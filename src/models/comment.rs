// src/models/comment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::pagination::PageParams;

// Comentário preso a uma caixa OU a uma rota
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    #[serde(rename = "autorId")]
    pub author_id: Uuid,
    #[serde(rename = "caixaId")]
    pub enclosure_id: Option<Uuid>,
    #[serde(rename = "rotaId")]
    pub route_id: Option<Uuid>,
    #[serde(rename = "texto")]
    pub content: String,
    #[serde(rename = "criadoEm")]
    pub created_at: DateTime<Utc>,
}

/// O dono de um comentário (exatamente um dos dois).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentOwner {
    Enclosure(Uuid),
    Route(Uuid),
}

impl CommentOwner {
    pub fn from_parts(enclosure_id: Option<Uuid>, route_id: Option<Uuid>) -> Option<Self> {
        match (enclosure_id, route_id) {
            (Some(id), None) => Some(CommentOwner::Enclosure(id)),
            (None, Some(id)) => Some(CommentOwner::Route(id)),
            _ => None,
        }
    }
}

fn validate_single_owner(payload: &CreateCommentPayload) -> Result<(), ValidationError> {
    if CommentOwner::from_parts(payload.enclosure_id, payload.route_id).is_none() {
        let mut err = ValidationError::new("owner");
        err.message = Some("Informe exatamente um entre 'caixaId' e 'rotaId'.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_single_owner"))]
pub struct CreateCommentPayload {
    #[serde(rename = "caixaId")]
    pub enclosure_id: Option<Uuid>,
    #[serde(rename = "rotaId")]
    pub route_id: Option<Uuid>,
    #[serde(rename = "texto")]
    #[validate(length(min = 1, max = 2000, message = "O comentário deve ter entre 1 e 2000 caracteres."))]
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentFilter {
    pub pagina: Option<i64>,
    pub limite: Option<i64>,
    #[serde(rename = "caixaId")]
    pub enclosure_id: Option<Uuid>,
    #[serde(rename = "rotaId")]
    pub route_id: Option<Uuid>,
}

impl CommentFilter {
    pub fn page(&self) -> PageParams {
        PageParams { pagina: self.pagina, limite: self.limite }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_owner_is_required() {
        let id = Uuid::new_v4();
        assert_eq!(CommentOwner::from_parts(Some(id), None), Some(CommentOwner::Enclosure(id)));
        assert_eq!(CommentOwner::from_parts(None, Some(id)), Some(CommentOwner::Route(id)));
        assert_eq!(CommentOwner::from_parts(None, None), None);
        assert_eq!(CommentOwner::from_parts(Some(id), Some(id)), None);
    }
}
