// src/handlers/customers.rs

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
        rbac::{OpCampo, OpLeitura, RequireRole},
    },
    models::customer::{CreateCustomerPayload, Customer, CustomerFilter, UpdateCustomerPayload},
};

#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Clientes",
    params(
        ("pagina" = Option<i64>, Query, description = "Página (padrão 1)"),
        ("limite" = Option<i64>, Query, description = "Itens por página"),
        ("cidadeId" = Option<Uuid>, Query, description = "Filtra por cidade"),
        ("caixaId" = Option<Uuid>, Query, description = "Clientes de uma CTO"),
        ("busca" = Option<String>, Query, description = "Nome, documento ou e-mail")
    ),
    responses((status = 200, description = "Lista paginada de clientes")),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpLeitura>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(filter): Query<CustomerFilter>,
) -> Result<impl IntoResponse, AppError> {
    let (clientes, total) = app_state.customer_service.list_customers(&principal, &filter).await?;

    Ok(Json(json!({ "clientes": clientes, "paginacao": filter.page().describe(total) })))
}

#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Clientes",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente", body = Customer),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpLeitura>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Customer>, AppError> {
    let customer = app_state.customer_service.get_customer(&principal, id).await?;
    Ok(Json(customer))
}

#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "Clientes",
    request_body = CreateCustomerPayload,
    responses(
        (status = 201, description = "Cliente criado (e porta ocupada, se informada)", body = Customer),
        (status = 400, description = "Porta indisponível"),
        (status = 409, description = "Porta já atribuída")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpCampo>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<CreateCustomerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let cliente = app_state.customer_service.create_customer(&principal, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "mensagem": "Cliente criado com sucesso.", "cliente": cliente })),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/customers/{id}",
    tag = "Clientes",
    request_body = UpdateCustomerPayload,
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses((status = 200, description = "Cliente atualizado", body = Customer)),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpCampo>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let cliente = app_state.customer_service.update_customer(&principal, id, &payload).await?;

    Ok(Json(json!({ "mensagem": "Cliente atualizado com sucesso.", "cliente": cliente })))
}

#[utoipa::path(
    delete,
    path = "/api/customers/{id}",
    tag = "Clientes",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses((status = 200, description = "Cliente removido e porta liberada")),
    security(("api_jwt" = []))
)]
pub async fn delete_customer(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpCampo>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.customer_service.delete_customer(&principal, id).await?;

    Ok(Json(json!({ "mensagem": "Cliente removido com sucesso." })))
}
