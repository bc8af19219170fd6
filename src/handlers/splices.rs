// src/handlers/splices.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{OpCampo, OpExclusao, OpLeitura, RequireRole},
    },
    models::splice::{SpliceFilter, SplicePayload},
};

#[utoipa::path(
    get,
    path = "/api/splices",
    tag = "Fusões",
    params(
        ("caixaId" = Uuid, Query, description = "CEO das fusões"),
        ("bandejaId" = Option<Uuid>, Query, description = "Filtra por bandeja"),
        ("pagina" = Option<i64>, Query, description = "Página (padrão 1)"),
        ("limite" = Option<i64>, Query, description = "Itens por página")
    ),
    responses((status = 200, description = "Lista paginada de fusões")),
    security(("api_jwt" = []))
)]
pub async fn list_splices(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpLeitura>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(filter): Query<SpliceFilter>,
) -> Result<impl IntoResponse, AppError> {
    let (fusoes, total) = app_state.splice_service.list_splices(&principal, &filter).await?;

    Ok(Json(json!({ "fusoes": fusoes, "paginacao": filter.page().describe(total) })))
}

// Aceita uma fusão avulsa ou um lote `{ "splices": [...] }`
#[utoipa::path(
    post,
    path = "/api/splices",
    tag = "Fusões",
    request_body = SplicePayload,
    responses(
        (status = 201, description = "Fusões registradas"),
        (status = 400, description = "Bandeja sem capacidade ou caixa não é CEO")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_splices(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpCampo>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<SplicePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let fusoes = app_state
        .splice_service
        .create_splices(&principal, &payload.into_batch())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "mensagem": "Fusões registradas com sucesso.", "fusoes": fusoes })),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/splices/{id}",
    tag = "Fusões",
    params(("id" = Uuid, Path, description = "ID da fusão")),
    responses((status = 200, description = "Fusão removida")),
    security(("api_jwt" = []))
)]
pub async fn delete_splice(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpExclusao>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.splice_service.delete_splice(&principal, id).await?;

    Ok(Json(json!({ "mensagem": "Fusão removida com sucesso." })))
}
