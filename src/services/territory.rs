// src/services/territory.rs

//! Autorização por território.
//!
//! Toda entidade pertence a uma cidade por uma cadeia de posse
//! (porta -> caixa -> cidade, capilar -> tubo -> rota -> cidade, ...). Gerentes passam
//! direto; os demais precisam estar vinculados à cidade em `user_cities`.
//! O dono é sempre resolvido primeiro, então um alvo inexistente é 404
//! para qualquer cargo.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{common::error::AppError, db::TerritoryRepository, models::auth::Principal};

/// Entidade cujo território será verificado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    City(Uuid),
    Route(Uuid),
    Fiber(Uuid),
    Enclosure(Uuid),
    Port(Uuid),
    Tray(Uuid),
    Splice(Uuid),
    Customer(Uuid),
    Comment(Uuid),
}

impl Target {
    pub fn id(self) -> Uuid {
        match self {
            Target::City(id)
            | Target::Route(id)
            | Target::Fiber(id)
            | Target::Enclosure(id)
            | Target::Port(id)
            | Target::Tray(id)
            | Target::Splice(id)
            | Target::Customer(id)
            | Target::Comment(id) => id,
        }
    }

    pub fn entity_label(self) -> &'static str {
        match self {
            Target::City(_) => "Cidade",
            Target::Route(_) => "Rota",
            Target::Fiber(_) => "Fibra",
            Target::Enclosure(_) => "Caixa",
            Target::Port(_) => "Porta",
            Target::Tray(_) => "Bandeja",
            Target::Splice(_) => "Fusão",
            Target::Customer(_) => "Cliente",
            Target::Comment(_) => "Comentário",
        }
    }
}

/// Decisão pura, depois que o dono já foi resolvido.
pub fn decide(principal: &Principal, is_member: bool) -> Result<(), AppError> {
    if principal.role.is_manager() || is_member {
        Ok(())
    } else {
        Err(AppError::ForbiddenTerritory)
    }
}

#[derive(Clone, Default)]
pub struct TerritoryAuthorizer {
    repo: TerritoryRepository,
}

impl TerritoryAuthorizer {
    pub fn new(repo: TerritoryRepository) -> Self {
        Self { repo }
    }

    /// Resolve a cidade dona do alvo e verifica o acesso. Devolve a cidade.
    pub async fn authorize(
        &self,
        conn: &mut PgConnection,
        principal: &Principal,
        target: Target,
    ) -> Result<Uuid, AppError> {
        let city_id = self
            .repo
            .owning_city(&mut *conn, target)
            .await?
            .ok_or(AppError::NotFound(target.entity_label()))?;

        if principal.role.is_manager() {
            return Ok(city_id);
        }

        let member = self.repo.is_member(&mut *conn, principal.user_id, city_id).await?;
        decide(principal, member)?;
        Ok(city_id)
    }

    /// Atalho para payloads que trazem `cidadeId` (criação de rota, caixa, cliente).
    pub async fn authorize_city(
        &self,
        conn: &mut PgConnection,
        principal: &Principal,
        city_id: Uuid,
    ) -> Result<(), AppError> {
        self.authorize(conn, principal, Target::City(city_id)).await.map(|_| ())
    }

    /// Cidades visíveis numa listagem. `None` = sem restrição (Gerente).
    ///
    /// Um filtro explícito de cidade fora do território do usuário é 403,
    /// não uma lista vazia.
    pub async fn scope(
        &self,
        conn: &mut PgConnection,
        principal: &Principal,
        requested_city: Option<Uuid>,
    ) -> Result<Option<Vec<Uuid>>, AppError> {
        if principal.role.is_manager() {
            return Ok(None);
        }

        let cities = self.repo.member_cities(&mut *conn, principal.user_id).await?;
        if let Some(city_id) = requested_city {
            if !cities.contains(&city_id) {
                return Err(AppError::ForbiddenTerritory);
            }
        }
        Ok(Some(cities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;

    fn principal(role: Role) -> Principal {
        Principal { user_id: Uuid::new_v4(), role }
    }

    #[test]
    fn managers_bypass_membership() {
        assert!(decide(&principal(Role::Manager), false).is_ok());
    }

    #[test]
    fn members_are_allowed() {
        assert!(decide(&principal(Role::Technician), true).is_ok());
        assert!(decide(&principal(Role::Engineer), true).is_ok());
    }

    #[test]
    fn non_members_are_forbidden() {
        let err = decide(&principal(Role::Engineer), false).unwrap_err();
        assert!(matches!(err, AppError::ForbiddenTerritory));
    }

    #[test]
    fn target_exposes_id_and_label() {
        let id = Uuid::new_v4();
        assert_eq!(Target::Tray(id).id(), id);
        assert_eq!(Target::Tray(id).entity_label(), "Bandeja");
        assert_eq!(Target::Comment(id).entity_label(), "Comentário");
        assert_eq!(Target::Fiber(id).entity_label(), "Fibra");
    }
}
