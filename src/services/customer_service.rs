// src/services/customer_service.rs

use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{error::AppError, serde_utils::merge_patch},
    db::{customer_repo::CustomerRow, CustomerRepository, EnclosureRepository, PortRepository},
    models::{
        auth::Principal,
        customer::{CreateCustomerPayload, Customer, CustomerFilter, UpdateCustomerPayload},
        enclosure::Port,
    },
    services::{
        port_state::{self, PortEvent},
        territory::{Target, TerritoryAuthorizer},
    },
};

// Clientes e a ocupação das portas: `Ocupada` <=> exatamente um cliente na porta.
#[derive(Clone)]
pub struct CustomerService {
    repo: CustomerRepository,
    port_repo: PortRepository,
    enclosure_repo: EnclosureRepository,
    territory: TerritoryAuthorizer,
    pool: PgPool,
}

/// O que fazer com a porta do cliente numa atualização.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortChange {
    Keep,
    Release(Uuid),
    Assign(Uuid),
    Move { from: Uuid, to: Uuid },
}

impl PortChange {
    pub fn resolve(current: Option<Uuid>, requested: Option<Option<Uuid>>) -> Self {
        match (current, requested) {
            (_, None) => PortChange::Keep,
            (None, Some(None)) => PortChange::Keep,
            (Some(from), Some(None)) => PortChange::Release(from),
            (None, Some(Some(to))) => PortChange::Assign(to),
            (Some(from), Some(Some(to))) if from == to => PortChange::Keep,
            (Some(from), Some(Some(to))) => PortChange::Move { from, to },
        }
    }
}

impl CustomerService {
    pub fn new(
        repo: CustomerRepository,
        port_repo: PortRepository,
        enclosure_repo: EnclosureRepository,
        territory: TerritoryAuthorizer,
        pool: PgPool,
    ) -> Self {
        Self { repo, port_repo, enclosure_repo, territory, pool }
    }

    pub async fn list_customers(
        &self,
        principal: &Principal,
        filter: &CustomerFilter,
    ) -> Result<(Vec<Customer>, i64), AppError> {
        let mut conn = self.pool.acquire().await?;
        let allowed = self.territory.scope(&mut *conn, principal, filter.cidade_id).await?;
        if let Some(enclosure_id) = filter.enclosure_id {
            self.territory.authorize(&mut *conn, principal, Target::Enclosure(enclosure_id)).await?;
        }
        drop(conn);

        self.repo.list_customers(filter, allowed).await
    }

    pub async fn get_customer(&self, principal: &Principal, id: Uuid) -> Result<Customer, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.territory.authorize(&mut *conn, principal, Target::Customer(id)).await?;

        self.repo
            .find_by_id(&mut *conn, id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))
    }

    pub async fn create_customer(
        &self,
        principal: &Principal,
        payload: &CreateCustomerPayload,
    ) -> Result<Customer, AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize_city(&mut *tx, principal, payload.city_id).await?;

        if let Some(port_id) = payload.port_id {
            let port = self.lock_port_in_city(&mut *tx, principal, port_id, payload.city_id).await?;
            self.occupy(&mut *tx, &port).await?;
        }

        let customer = self.repo
            .create_customer(
                &mut *tx,
                payload.city_id,
                &CustomerRow {
                    name: &payload.name,
                    document: payload.document.as_deref(),
                    email: payload.email.as_deref(),
                    phone: payload.phone.as_deref(),
                    address: payload.address.as_deref(),
                    port_id: payload.port_id,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Cliente {} criado (porta {:?})", customer.id, customer.port_id);
        Ok(customer)
    }

    /// Atualiza os dados e, se pedido, troca/libera a porta na mesma transação.
    pub async fn update_customer(
        &self,
        principal: &Principal,
        id: Uuid,
        payload: &UpdateCustomerPayload,
    ) -> Result<Customer, AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize(&mut *tx, principal, Target::Customer(id)).await?;

        let current = self.repo
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;

        let change = PortChange::resolve(current.port_id, payload.port_id);
        let port_id = match change {
            PortChange::Keep => current.port_id,
            PortChange::Release(from) => {
                self.release(&mut *tx, from).await?;
                None
            }
            PortChange::Assign(to) => {
                let port = self.lock_port_in_city(&mut *tx, principal, to, current.city_id).await?;
                self.occupy(&mut *tx, &port).await?;
                Some(to)
            }
            PortChange::Move { from, to } => {
                // Caixas e depois as duas portas, cada grupo na ordem dos ids
                let pair = [from, to];
                self.enclosure_repo.lock_owners_of_ports(&mut *tx, &pair).await?;
                self.port_repo.lock_many(&mut *tx, &pair).await?;

                let port = self.lock_port_in_city(&mut *tx, principal, to, current.city_id).await?;
                self.occupy(&mut *tx, &port).await?;
                self.release(&mut *tx, from).await?;
                Some(to)
            }
        };

        let customer = self.repo
            .update_customer(
                &mut *tx,
                id,
                &CustomerRow {
                    name: payload.name.as_deref().unwrap_or(&current.name),
                    document: merge_patch(current.document.as_deref(), payload.document.as_ref().map(|v| v.as_deref())),
                    email: merge_patch(current.email.as_deref(), payload.email.as_ref().map(|v| v.as_deref())),
                    phone: merge_patch(current.phone.as_deref(), payload.phone.as_ref().map(|v| v.as_deref())),
                    address: merge_patch(current.address.as_deref(), payload.address.as_ref().map(|v| v.as_deref())),
                    port_id,
                },
            )
            .await?;

        tx.commit().await?;

        if change != PortChange::Keep {
            tracing::info!("Cliente {}: porta {:?} -> {:?}", id, current.port_id, customer.port_id);
        }
        Ok(customer)
    }

    /// Remove o cliente e libera a porta que ele ocupava.
    pub async fn delete_customer(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize(&mut *tx, principal, Target::Customer(id)).await?;

        let customer = self.repo
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;

        self.repo.delete_customer(&mut *tx, id).await?;
        if let Some(port_id) = customer.port_id {
            self.release(&mut *tx, port_id).await?;
        }

        tx.commit().await?;

        tracing::info!("Cliente {} removido", id);
        Ok(())
    }

    // ---
    // Portas
    // ---

    /// Trava a porta e confere território e cidade do cliente.
    async fn lock_port_in_city(
        &self,
        conn: &mut PgConnection,
        principal: &Principal,
        port_id: Uuid,
        city_id: Uuid,
    ) -> Result<Port, AppError> {
        let port_city = self.territory.authorize(&mut *conn, principal, Target::Port(port_id)).await?;
        if port_city != city_id {
            return Err(AppError::invariant(
                "A porta pertence a uma caixa de outra cidade.",
                json!({ "portaId": port_id, "cidadeId": city_id }),
            ));
        }

        self.enclosure_repo.lock_owners_of_ports(&mut *conn, &[port_id]).await?;
        self.port_repo
            .find_for_update(&mut *conn, port_id)
            .await?
            .ok_or(AppError::NotFound("Porta"))
    }

    async fn occupy(&self, conn: &mut PgConnection, port: &Port) -> Result<(), AppError> {
        let next = port_state::transition(port.status, PortEvent::Assign)?;
        self.port_repo.set_status(&mut *conn, port.id, next).await?;
        Ok(())
    }

    async fn release(&self, conn: &mut PgConnection, port_id: Uuid) -> Result<(), AppError> {
        self.enclosure_repo.lock_owners_of_ports(&mut *conn, &[port_id]).await?;
        let port = self.port_repo
            .find_for_update(&mut *conn, port_id)
            .await?
            .ok_or(AppError::NotFound("Porta"))?;
        let next = port_state::transition(port.status, PortEvent::Unassign)?;
        self.port_repo.set_status(&mut *conn, port_id, next).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_port_field_keeps_the_port() {
        let port = Uuid::new_v4();
        assert_eq!(PortChange::resolve(Some(port), None), PortChange::Keep);
        assert_eq!(PortChange::resolve(None, None), PortChange::Keep);
    }

    #[test]
    fn null_releases_the_current_port() {
        let port = Uuid::new_v4();
        assert_eq!(PortChange::resolve(Some(port), Some(None)), PortChange::Release(port));
        assert_eq!(PortChange::resolve(None, Some(None)), PortChange::Keep);
    }

    #[test]
    fn new_port_assigns_or_moves() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(PortChange::resolve(None, Some(Some(a))), PortChange::Assign(a));
        assert_eq!(PortChange::resolve(Some(a), Some(Some(b))), PortChange::Move { from: a, to: b });
        assert_eq!(PortChange::resolve(Some(a), Some(Some(a))), PortChange::Keep);
    }

    // ---
    // Com banco
    // ---

    use crate::{
        models::enclosure::{EnclosureKind, PortStatus},
        test_support,
    };

    #[sqlx::test]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn moving_a_customer_swaps_both_ports_together(pool: PgPool) {
        let state = test_support::state(pool);
        let manager = test_support::manager(&state).await;
        let city = test_support::city(&state).await;
        let cto = test_support::enclosure(&state, &manager, city.id, EnclosureKind::Terminal, 4).await;
        let ports = state.enclosure_service.list_ports(&manager, cto.enclosure.id).await.unwrap();
        let (p, q) = (ports[0].id, ports[1].id);

        let customer = state
            .customer_service
            .create_customer(
                &manager,
                &CreateCustomerPayload {
                    city_id: city.id,
                    name: "Cliente de teste".into(),
                    document: Some("123.456.789-00".into()),
                    email: Some("cliente@teste.com".into()),
                    phone: None,
                    address: None,
                    port_id: Some(p),
                },
            )
            .await
            .unwrap();

        let patch = UpdateCustomerPayload {
            port_id: Some(Some(q)),
            email: Some(None),
            ..Default::default()
        };
        let moved = state.customer_service.update_customer(&manager, customer.id, &patch).await.unwrap();
        assert_eq!(moved.port_id, Some(q));
        assert_eq!(moved.email, None);
        assert_eq!(moved.document.as_deref(), Some("123.456.789-00"));

        let ports = state.enclosure_service.list_ports(&manager, cto.enclosure.id).await.unwrap();
        let status_of = |id: Uuid| ports.iter().find(|port| port.id == id).map(|port| port.status);
        assert_eq!(status_of(p), Some(PortStatus::Free));
        assert_eq!(status_of(q), Some(PortStatus::InUse));
        let occupant = ports.iter().find(|port| port.id == q).and_then(|port| port.customer_id);
        assert_eq!(occupant, Some(customer.id));
    }
}
