// src/services/port_service.rs

use std::collections::HashSet;

use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CustomerRepository, EnclosureRepository, PortRepository},
    models::{
        auth::Principal,
        enclosure::{BulkPortUpdate, Port, PortStatus},
    },
    services::{
        port_state::{self, PortEvent},
        territory::{Target, TerritoryAuthorizer},
    },
};

#[derive(Clone)]
pub struct PortService {
    repo: PortRepository,
    enclosure_repo: EnclosureRepository,
    customer_repo: CustomerRepository,
    territory: TerritoryAuthorizer,
    pool: PgPool,
}

impl PortService {
    pub fn new(
        repo: PortRepository,
        enclosure_repo: EnclosureRepository,
        customer_repo: CustomerRepository,
        territory: TerritoryAuthorizer,
        pool: PgPool,
    ) -> Self {
        Self { repo, enclosure_repo, customer_repo, territory, pool }
    }

    /// Mudança manual de status (reserva, liberação, defeito, reparo).
    pub async fn update_status(
        &self,
        principal: &Principal,
        port_id: Uuid,
        requested: PortStatus,
    ) -> Result<Port, AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize(&mut *tx, principal, Target::Port(port_id)).await?;

        // Caixa antes da porta, a mesma ordem das mudanças de capacidade
        self.enclosure_repo
            .lock_owner_of_port(&mut *tx, port_id)
            .await?
            .ok_or(AppError::NotFound("Porta"))?;
        let port = self.repo
            .find_for_update(&mut *tx, port_id)
            .await?
            .ok_or(AppError::NotFound("Porta"))?;

        let port = self.apply_manual(&mut *tx, port, requested).await?;
        tx.commit().await?;
        Ok(port)
    }

    /// Várias portas da mesma caixa, tudo ou nada.
    pub async fn bulk_update(
        &self,
        principal: &Principal,
        enclosure_id: Uuid,
        updates: &[BulkPortUpdate],
    ) -> Result<Vec<Port>, AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize(&mut *tx, principal, Target::Enclosure(enclosure_id)).await?;

        let ids: Vec<Uuid> = updates.iter().map(|u| u.id).collect::<HashSet<_>>().into_iter().collect();
        if ids.len() != updates.len() {
            return Err(AppError::InvalidInput("A mesma porta aparece mais de uma vez.".into()));
        }

        self.enclosure_repo
            .find_for_update(&mut *tx, enclosure_id)
            .await?
            .ok_or(AppError::NotFound("Caixa"))?;
        let locked = self.repo.lock_many(&mut *tx, &ids).await?;
        let foreign: Vec<Uuid> = ids
            .iter()
            .filter(|id| !locked.iter().any(|p| p.id == **id && p.enclosure_id == enclosure_id))
            .copied()
            .collect();
        if !foreign.is_empty() {
            return Err(AppError::invariant(
                "Portas inexistentes ou de outra caixa.",
                json!({ "portas": foreign }),
            ));
        }

        let mut result = Vec::with_capacity(updates.len());
        for update in updates {
            let port = locked
                .iter()
                .find(|p| p.id == update.id)
                .cloned()
                .ok_or(AppError::NotFound("Porta"))?;
            result.push(self.apply_manual(&mut *tx, port, update.status).await?);
        }

        tx.commit().await?;
        result.sort_by_key(|p| p.number);

        tracing::info!("{} porta(s) atualizadas na caixa {}", result.len(), enclosure_id);
        Ok(result)
    }

    /// Portas só deixam de existir por mudança de capacidade da caixa.
    pub async fn delete_port(&self, principal: &Principal, port_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize(&mut *tx, principal, Target::Port(port_id)).await?;

        let enclosure = self.enclosure_repo
            .lock_owner_of_port(&mut *tx, port_id)
            .await?
            .ok_or(AppError::NotFound("Porta"))?;
        let port = self.repo
            .find_for_update(&mut *tx, port_id)
            .await?
            .ok_or(AppError::NotFound("Porta"))?;

        if let Some(customer) = self.customer_repo.find_by_port(&mut *tx, port_id).await? {
            return Err(AppError::invariant(
                "A porta está atribuída a um cliente.",
                json!({ "portaId": port_id, "clienteId": customer.id }),
            ));
        }

        Err(AppError::invariant(
            "Remover a porta quebraria a capacidade da caixa. Reduza a capacidade da CTO.",
            json!({
                "caixaId": enclosure.id,
                "capacidade": enclosure.capacity,
                "porta": port.number,
            }),
        ))
    }

    async fn apply_manual(&self, conn: &mut PgConnection, port: Port, requested: PortStatus) -> Result<Port, AppError> {
        let Some(event) = port_state::manual_event(port.status, requested)? else {
            return Ok(port);
        };
        let next = port_state::transition(port.status, event)?;

        // Ocupada -> Defeito: o cliente sai da porta junto
        if event == PortEvent::MarkFaulty && port.status == PortStatus::InUse {
            let detached = self.customer_repo.clear_port(&mut *conn, port.id).await?;
            tracing::warn!("Porta {} com defeito: {} cliente(s) desvinculado(s)", port.id, detached);
        }

        self.repo.set_status(&mut *conn, port.id, next).await
    }
}
