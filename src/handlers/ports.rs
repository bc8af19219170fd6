// src/handlers/ports.rs

use axum::{
    extract::{Path, State},
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
        rbac::{OpCampo, OpExclusao, OpProjeto, RequireRole},
    },
    models::enclosure::{Port, TrayWithUsage, UpdatePortPayload, UpdateTrayPayload},
};

// ---
// Portas
// ---

#[utoipa::path(
    patch,
    path = "/api/ports/{id}",
    tag = "Portas",
    request_body = UpdatePortPayload,
    params(("id" = Uuid, Path, description = "ID da porta")),
    responses(
        (status = 200, description = "Status alterado", body = Port),
        (status = 400, description = "Transição não permitida")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_port(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpCampo>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePortPayload>,
) -> Result<impl IntoResponse, AppError> {
    let porta = app_state.port_service.update_status(&principal, id, payload.status).await?;

    Ok(Json(json!({ "mensagem": "Status da porta atualizado.", "porta": porta })))
}

// Portas só somem junto com a redução de capacidade da caixa
#[utoipa::path(
    delete,
    path = "/api/ports/{id}",
    tag = "Portas",
    params(("id" = Uuid, Path, description = "ID da porta")),
    responses((status = 400, description = "Remoção individual de porta não é permitida")),
    security(("api_jwt" = []))
)]
pub async fn delete_port(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpExclusao>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.port_service.delete_port(&principal, id).await?;

    Ok(Json(json!({ "mensagem": "Porta removida com sucesso." })))
}

// ---
// Bandejas
// ---

#[utoipa::path(
    patch,
    path = "/api/trays/{id}",
    tag = "Bandejas",
    request_body = UpdateTrayPayload,
    params(("id" = Uuid, Path, description = "ID da bandeja")),
    responses(
        (status = 200, description = "Capacidade alterada", body = TrayWithUsage),
        (status = 400, description = "Capacidade menor que as fusões existentes")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_tray(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpProjeto>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTrayPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let bandeja = app_state
        .tray_service
        .update_capacity(&principal, id, payload.capacity)
        .await?;

    Ok(Json(json!({ "mensagem": "Bandeja atualizada com sucesso.", "bandeja": bandeja })))
}
