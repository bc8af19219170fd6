// src/handlers/users.rs

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
    common::{error::AppError, pagination::PageParams},
    config::AppState,
    middleware::rbac::{OpAdministracao, RequireRole},
    models::auth::{AssignCitiesPayload, CreateUserPayload, UpdateUserPayload, UserWithCities},
};

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Usuários",
    params(
        ("pagina" = Option<i64>, Query, description = "Página (padrão 1)"),
        ("limite" = Option<i64>, Query, description = "Itens por página (padrão 20, máx. 100)")
    ),
    responses(
        (status = 200, description = "Lista paginada de usuários"),
        (status = 403, description = "Somente Gerente")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpAdministracao>,
    Query(page): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let (usuarios, total) = app_state.user_service.list_users(page).await?;

    Ok(Json(json!({ "usuarios": usuarios, "paginacao": page.describe(total) })))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Usuários",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Usuário com suas cidades", body = UserWithCities),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpAdministracao>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserWithCities>, AppError> {
    let user = app_state.user_service.get_user(id).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Usuários",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = UserWithCities),
        (status = 409, description = "E-mail já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpAdministracao>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let usuario = app_state.user_service.create_user(&payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "mensagem": "Usuário criado com sucesso.", "usuario": usuario })),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    tag = "Usuários",
    request_body = UpdateUserPayload,
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses((status = 200, description = "Usuário atualizado", body = UserWithCities)),
    security(("api_jwt" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpAdministracao>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let usuario = app_state.user_service.update_user(id, &payload).await?;

    Ok(Json(json!({ "mensagem": "Usuário atualizado com sucesso.", "usuario": usuario })))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}/cities",
    tag = "Usuários",
    request_body = AssignCitiesPayload,
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses((status = 200, description = "Território substituído", body = UserWithCities)),
    security(("api_jwt" = []))
)]
pub async fn assign_cities(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpAdministracao>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignCitiesPayload>,
) -> Result<impl IntoResponse, AppError> {
    let usuario = app_state.user_service.assign_cities(id, &payload.city_ids).await?;

    Ok(Json(json!({ "mensagem": "Cidades do usuário atualizadas.", "usuario": usuario })))
}
