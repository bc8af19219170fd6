// src/handlers/comments.rs

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
    models::comment::{Comment, CommentFilter, CreateCommentPayload},
};

#[utoipa::path(
    get,
    path = "/api/comments",
    tag = "Comentários",
    params(
        ("caixaId" = Option<Uuid>, Query, description = "Comentários de uma caixa"),
        ("rotaId" = Option<Uuid>, Query, description = "Comentários de uma rota"),
        ("pagina" = Option<i64>, Query, description = "Página (padrão 1)"),
        ("limite" = Option<i64>, Query, description = "Itens por página")
    ),
    responses((status = 200, description = "Lista paginada de comentários")),
    security(("api_jwt" = []))
)]
pub async fn list_comments(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpLeitura>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(filter): Query<CommentFilter>,
) -> Result<impl IntoResponse, AppError> {
    let (comentarios, total) = app_state.comment_service.list_comments(&principal, &filter).await?;

    Ok(Json(json!({ "comentarios": comentarios, "paginacao": filter.page().describe(total) })))
}

#[utoipa::path(
    post,
    path = "/api/comments",
    tag = "Comentários",
    request_body = CreateCommentPayload,
    responses((status = 201, description = "Comentário criado", body = Comment)),
    security(("api_jwt" = []))
)]
pub async fn create_comment(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpCampo>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<CreateCommentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let comentario = app_state.comment_service.create_comment(&principal, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "mensagem": "Comentário criado com sucesso.", "comentario": comentario })),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/comments/{id}",
    tag = "Comentários",
    params(("id" = Uuid, Path, description = "ID do comentário")),
    responses(
        (status = 200, description = "Comentário removido"),
        (status = 403, description = "Somente o autor ou um Gerente")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_comment(
    State(app_state): State<AppState>,
    _guard: RequireRole<OpCampo>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.comment_service.delete_comment(&principal, id).await?;

    Ok(Json(json!({ "mensagem": "Comentário removido com sucesso." })))
}
