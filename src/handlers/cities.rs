// src/handlers/cities.rs

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
        rbac::{OpAdministracao, OpLeitura, RequireRole},
    },
    models::city::{City, CityFilter, CreateCityPayload, UpdateCityPayload},
};

// Técnicos e engenheiros só enxergam as próprias cidades
#[utoipa::path(
    get,
    path = "/api/cities",
    tag = "Cidades",
    params(
        ("pagina" = Option<i64>, Query, description = "Página (padrão 1)"),
        ("limite" = Option<i64>, Query, description = "Itens por página"),
        ("busca" = Option<String>, Query, description = "Trecho do nome"),
        ("uf" = Option<String>, Query, description = "UF")
    ),
    responses((status = 200, description = "Lista paginada de cidades")),
    security(("api_jwt" = []))
)]
pub async fn list_cities(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpLeitura>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(filter): Query<CityFilter>,
) -> Result<impl IntoResponse, AppError> {
    let (cidades, total) = app_state.city_service.list_cities(&principal, &filter).await?;

    Ok(Json(json!({ "cidades": cidades, "paginacao": filter.page().describe(total) })))
}

#[utoipa::path(
    get,
    path = "/api/cities/{id}",
    tag = "Cidades",
    params(("id" = Uuid, Path, description = "ID da cidade")),
    responses(
        (status = 200, description = "Cidade", body = City),
        (status = 403, description = "Fora do território"),
        (status = 404, description = "Cidade não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_city(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpLeitura>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<City>, AppError> {
    let city = app_state.city_service.get_city(&principal, id).await?;
    Ok(Json(city))
}

#[utoipa::path(
    post,
    path = "/api/cities",
    tag = "Cidades",
    request_body = CreateCityPayload,
    responses(
        (status = 201, description = "Cidade criada", body = City),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_city(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpAdministracao>,
    Json(payload): Json<CreateCityPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let cidade = app_state.city_service.create_city(&payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "mensagem": "Cidade criada com sucesso.", "cidade": cidade })),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/cities/{id}",
    tag = "Cidades",
    request_body = UpdateCityPayload,
    params(("id" = Uuid, Path, description = "ID da cidade")),
    responses((status = 200, description = "Cidade atualizada", body = City)),
    security(("api_jwt" = []))
)]
pub async fn update_city(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpAdministracao>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCityPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let cidade = app_state.city_service.update_city(id, &payload).await?;

    Ok(Json(json!({ "mensagem": "Cidade atualizada com sucesso.", "cidade": cidade })))
}

#[utoipa::path(
    delete,
    path = "/api/cities/{id}",
    tag = "Cidades",
    params(("id" = Uuid, Path, description = "ID da cidade")),
    responses(
        (status = 200, description = "Cidade removida"),
        (status = 400, description = "A cidade ainda tem rotas ou caixas")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_city(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpAdministracao>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.city_service.delete_city(id).await?;

    Ok(Json(json!({ "mensagem": "Cidade removida com sucesso." })))
}
