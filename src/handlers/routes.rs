// src/handlers/routes.rs

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
        rbac::{OpExclusao, OpLeitura, OpProjeto, RequireRole},
    },
    models::route::{CreateRoutePayload, Route, RouteFilter, TubeWithFibers, UpdateRoutePayload},
};

#[utoipa::path(
    get,
    path = "/api/routes",
    tag = "Rotas",
    params(
        ("pagina" = Option<i64>, Query, description = "Página (padrão 1)"),
        ("limite" = Option<i64>, Query, description = "Itens por página"),
        ("cidadeId" = Option<Uuid>, Query, description = "Filtra por cidade"),
        ("busca" = Option<String>, Query, description = "Trecho do nome")
    ),
    responses((status = 200, description = "Lista paginada de rotas")),
    security(("api_jwt" = []))
)]
pub async fn list_routes(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpLeitura>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(filter): Query<RouteFilter>,
) -> Result<impl IntoResponse, AppError> {
    let (rotas, total) = app_state.route_service.list_routes(&principal, &filter).await?;

    Ok(Json(json!({ "rotas": rotas, "paginacao": filter.page().describe(total) })))
}

#[utoipa::path(
    get,
    path = "/api/routes/{id}",
    tag = "Rotas",
    params(("id" = Uuid, Path, description = "ID da rota")),
    responses(
        (status = 200, description = "Rota", body = Route),
        (status = 404, description = "Rota não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_route(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpLeitura>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Route>, AppError> {
    let route = app_state.route_service.get_route(&principal, id).await?;
    Ok(Json(route))
}

// Tubos e capilares do cabo, em ordem
#[utoipa::path(
    get,
    path = "/api/routes/{id}/tubes",
    tag = "Rotas",
    params(("id" = Uuid, Path, description = "ID da rota")),
    responses((status = 200, description = "Tubos com suas fibras", body = Vec<TubeWithFibers>)),
    security(("api_jwt" = []))
)]
pub async fn list_tubes(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpLeitura>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let tubos = app_state.route_service.list_tubes(&principal, id).await?;

    Ok(Json(json!({ "tubos": tubos })))
}

#[utoipa::path(
    post,
    path = "/api/routes",
    tag = "Rotas",
    request_body = CreateRoutePayload,
    responses(
        (status = 201, description = "Rota criada com tubos e fibras", body = Route),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_route(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpProjeto>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<CreateRoutePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let rota = app_state.route_service.create_route(&principal, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "mensagem": "Rota criada com sucesso.", "rota": rota })),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/routes/{id}",
    tag = "Rotas",
    request_body = UpdateRoutePayload,
    params(("id" = Uuid, Path, description = "ID da rota")),
    responses((status = 200, description = "Rota atualizada", body = Route)),
    security(("api_jwt" = []))
)]
pub async fn update_route(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpProjeto>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoutePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let rota = app_state.route_service.update_route(&principal, id, &payload).await?;

    Ok(Json(json!({ "mensagem": "Rota atualizada com sucesso.", "rota": rota })))
}

#[utoipa::path(
    delete,
    path = "/api/routes/{id}",
    tag = "Rotas",
    params(("id" = Uuid, Path, description = "ID da rota")),
    responses(
        (status = 200, description = "Rota removida"),
        (status = 400, description = "Fibras da rota possuem fusões")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_route(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpExclusao>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.route_service.delete_route(&principal, id).await?;

    Ok(Json(json!({ "mensagem": "Rota removida com sucesso." })))
}
