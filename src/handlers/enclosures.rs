// src/handlers/enclosures.rs

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
        rbac::{OpCampo, OpExclusao, OpLeitura, OpProjeto, RequireRole},
    },
    models::enclosure::{
        BulkPortsPayload, BulkTraysPayload, CreateEnclosurePayload, CreateMaintenancePayload,
        EnclosureDetail, EnclosureFilter, Maintenance, PortWithCustomer, TrayWithUsage,
        UpdateEnclosurePayload,
    },
};

// =============================================================================
//  ÁREA 1: CAIXAS (CTO / CEO)
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/enclosures",
    tag = "Caixas",
    params(
        ("pagina" = Option<i64>, Query, description = "Página (padrão 1)"),
        ("limite" = Option<i64>, Query, description = "Itens por página"),
        ("cidadeId" = Option<Uuid>, Query, description = "Filtra por cidade"),
        ("tipo" = Option<String>, Query, description = "CTO ou CEO"),
        ("busca" = Option<String>, Query, description = "Trecho do nome")
    ),
    responses((status = 200, description = "Lista paginada de caixas")),
    security(("api_jwt" = []))
)]
pub async fn list_enclosures(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpLeitura>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(filter): Query<EnclosureFilter>,
) -> Result<impl IntoResponse, AppError> {
    let (caixas, total) = app_state.enclosure_service.list_enclosures(&principal, &filter).await?;

    Ok(Json(json!({ "caixas": caixas, "paginacao": filter.page().describe(total) })))
}

#[utoipa::path(
    get,
    path = "/api/enclosures/{id}",
    tag = "Caixas",
    params(("id" = Uuid, Path, description = "ID da caixa")),
    responses(
        (status = 200, description = "Caixa com rotas e uso", body = EnclosureDetail),
        (status = 404, description = "Caixa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_enclosure(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpLeitura>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<EnclosureDetail>, AppError> {
    let detail = app_state.enclosure_service.get_enclosure(&principal, id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    post,
    path = "/api/enclosures",
    tag = "Caixas",
    request_body = CreateEnclosurePayload,
    responses(
        (status = 201, description = "Caixa criada com portas ou bandejas", body = EnclosureDetail),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_enclosure(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpProjeto>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<CreateEnclosurePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let caixa = app_state.enclosure_service.create_enclosure(&principal, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "mensagem": "Caixa criada com sucesso.", "caixa": caixa })),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/enclosures/{id}",
    tag = "Caixas",
    request_body = UpdateEnclosurePayload,
    params(("id" = Uuid, Path, description = "ID da caixa")),
    responses(
        (status = 200, description = "Caixa atualizada", body = EnclosureDetail),
        (status = 400, description = "A mudança removeria recursos em uso")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_enclosure(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpProjeto>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEnclosurePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let caixa = app_state.enclosure_service.update_enclosure(&principal, id, &payload).await?;

    Ok(Json(json!({ "mensagem": "Caixa atualizada com sucesso.", "caixa": caixa })))
}

#[utoipa::path(
    delete,
    path = "/api/enclosures/{id}",
    tag = "Caixas",
    params(("id" = Uuid, Path, description = "ID da caixa")),
    responses(
        (status = 200, description = "Caixa removida"),
        (status = 400, description = "A caixa possui portas ocupadas ou fusões")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_enclosure(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpExclusao>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.enclosure_service.delete_enclosure(&principal, id).await?;

    Ok(Json(json!({ "mensagem": "Caixa removida com sucesso." })))
}

// =============================================================================
//  ÁREA 2: PORTAS E BANDEJAS DA CAIXA
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/enclosures/{id}/ports",
    tag = "Caixas",
    params(("id" = Uuid, Path, description = "ID da caixa")),
    responses((status = 200, description = "Portas da CTO", body = Vec<PortWithCustomer>)),
    security(("api_jwt" = []))
)]
pub async fn list_ports(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpLeitura>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let portas = app_state.enclosure_service.list_ports(&principal, id).await?;

    Ok(Json(json!({ "portas": portas })))
}

#[utoipa::path(
    put,
    path = "/api/enclosures/{id}/ports",
    tag = "Caixas",
    request_body = BulkPortsPayload,
    params(("id" = Uuid, Path, description = "ID da caixa")),
    responses(
        (status = 200, description = "Portas atualizadas (tudo ou nada)"),
        (status = 400, description = "Transição inválida ou porta de outra caixa")
    ),
    security(("api_jwt" = []))
)]
pub async fn bulk_update_ports(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpCampo>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<BulkPortsPayload>,
) -> Result<impl IntoResponse, AppError> {
    let portas = app_state.port_service.bulk_update(&principal, id, &payload.ports).await?;

    Ok(Json(json!({ "mensagem": "Portas atualizadas com sucesso.", "portas": portas })))
}

#[utoipa::path(
    get,
    path = "/api/enclosures/{id}/trays",
    tag = "Caixas",
    params(("id" = Uuid, Path, description = "ID da caixa")),
    responses((status = 200, description = "Bandejas da CEO com ocupação", body = Vec<TrayWithUsage>)),
    security(("api_jwt" = []))
)]
pub async fn list_trays(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpLeitura>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let bandejas = app_state.enclosure_service.list_trays(&principal, id).await?;

    Ok(Json(json!({ "bandejas": bandejas })))
}

#[utoipa::path(
    put,
    path = "/api/enclosures/{id}/trays",
    tag = "Caixas",
    request_body = BulkTraysPayload,
    params(("id" = Uuid, Path, description = "ID da caixa")),
    responses(
        (status = 200, description = "Bandejas atualizadas (tudo ou nada)"),
        (status = 400, description = "Capacidade menor que as fusões existentes")
    ),
    security(("api_jwt" = []))
)]
pub async fn bulk_update_trays(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpProjeto>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<BulkTraysPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let bandejas = app_state.tray_service.bulk_update(&principal, id, &payload.trays).await?;

    Ok(Json(json!({ "mensagem": "Bandejas atualizadas com sucesso.", "bandejas": bandejas })))
}

// =============================================================================
//  ÁREA 3: MANUTENÇÕES
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/enclosures/{id}/maintenances",
    tag = "Caixas",
    params(("id" = Uuid, Path, description = "ID da caixa")),
    responses((status = 200, description = "Histórico de manutenções", body = Vec<Maintenance>)),
    security(("api_jwt" = []))
)]
pub async fn list_maintenances(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpLeitura>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let manutencoes = app_state.enclosure_service.list_maintenances(&principal, id).await?;

    Ok(Json(json!({ "manutencoes": manutencoes })))
}

#[utoipa::path(
    post,
    path = "/api/enclosures/{id}/maintenances",
    tag = "Caixas",
    request_body = CreateMaintenancePayload,
    params(("id" = Uuid, Path, description = "ID da caixa")),
    responses((status = 201, description = "Manutenção registrada", body = Maintenance)),
    security(("api_jwt" = []))
)]
pub async fn create_maintenance(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpCampo>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateMaintenancePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let manutencao = app_state
        .enclosure_service
        .create_maintenance(&principal, id, &payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "mensagem": "Manutenção registrada com sucesso.", "manutencao": manutencao })),
    ))
}
