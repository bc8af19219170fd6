// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    models::auth::{Principal, Role},
};

/// Classes de operação. Cada handler declara a sua no próprio tipo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Leitura,
    Campo,
    Projeto,
    Exclusao,
    Administracao,
}

impl Operation {
    /// A tabela estática cargo x operação.
    pub fn allowed_roles(self) -> &'static [Role] {
        match self {
            Operation::Leitura | Operation::Campo => &[Role::Technician, Role::Engineer, Role::Manager],
            Operation::Projeto | Operation::Exclusao => &[Role::Engineer, Role::Manager],
            Operation::Administracao => &[Role::Manager],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Operation::Leitura => "Leitura",
            Operation::Campo => "Campo",
            Operation::Projeto => "Projeto",
            Operation::Exclusao => "Exclusao",
            Operation::Administracao => "Administracao",
        }
    }
}

/// Decisão pura: nenhum acesso ao banco.
pub fn authorize(principal: Option<&Principal>, operation: Operation) -> Result<(), AppError> {
    let principal = principal.ok_or(AppError::Unauthorized)?;
    if operation.allowed_roles().contains(&principal.role) {
        Ok(())
    } else {
        Err(AppError::ForbiddenRole(operation.label().to_string()))
    }
}

/// 1. O Trait que liga um tipo marcador à sua classe de operação
pub trait OperationDef: Send + Sync + 'static {
    fn operation() -> Operation;
}

/// 2. O Extractor (Guardião)
pub struct RequireRole<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: OperationDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        authorize(parts.extensions.get::<Principal>(), T::operation())?;
        Ok(RequireRole(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS OPERAÇÕES (TIPOS)
// ---

pub struct OpLeitura;
impl OperationDef for OpLeitura {
    fn operation() -> Operation { Operation::Leitura }
}

pub struct OpCampo;
impl OperationDef for OpCampo {
    fn operation() -> Operation { Operation::Campo }
}

pub struct OpProjeto;
impl OperationDef for OpProjeto {
    fn operation() -> Operation { Operation::Projeto }
}

pub struct OpExclusao;
impl OperationDef for OpExclusao {
    fn operation() -> Operation { Operation::Exclusao }
}

pub struct OpAdministracao;
impl OperationDef for OpAdministracao {
    fn operation() -> Operation { Operation::Administracao }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    fn principal(role: Role) -> Principal {
        Principal { user_id: Uuid::new_v4(), role }
    }

    #[test]
    fn role_table() {
        use Operation::*;
        let tech = principal(Role::Technician);
        let eng = principal(Role::Engineer);
        let manager = principal(Role::Manager);

        for op in [Leitura, Campo] {
            assert!(authorize(Some(&tech), op).is_ok());
        }
        for op in [Projeto, Exclusao, Administracao] {
            assert!(matches!(authorize(Some(&tech), op), Err(AppError::ForbiddenRole(_))));
        }
        for op in [Leitura, Campo, Projeto, Exclusao] {
            assert!(authorize(Some(&eng), op).is_ok());
        }
        assert!(authorize(Some(&eng), Administracao).is_err());
        for op in [Leitura, Campo, Projeto, Exclusao, Administracao] {
            assert!(authorize(Some(&manager), op).is_ok());
        }
    }

    #[test]
    fn missing_principal_is_unauthorized_not_forbidden() {
        assert!(matches!(authorize(None, Operation::Leitura), Err(AppError::Unauthorized)));
    }

    async fn admin_only(_guard: RequireRole<OpAdministracao>) -> &'static str {
        "ok"
    }

    fn app() -> Router {
        Router::new().route("/", get(admin_only))
    }

    #[tokio::test]
    async fn extractor_allows_manager() {
        let mut req = Request::get("/").body(Body::empty()).unwrap();
        req.extensions_mut().insert(principal(Role::Manager));

        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn extractor_denies_engineer_on_administration() {
        let mut req = Request::get("/").body(Body::empty()).unwrap();
        req.extensions_mut().insert(principal(Role::Engineer));

        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn extractor_without_principal_is_401() {
        let req = Request::get("/").body(Body::empty()).unwrap();

        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
