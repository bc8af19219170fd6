// src/services/enclosure_service.rs

use std::collections::HashSet;

use chrono::Utc;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{error::AppError, serde_utils::merge_patch},
    db::{
        enclosure_repo::EnclosureRow, EnclosureRepository, PortRepository, RouteRepository,
        TrayRepository,
    },
    models::{
        auth::Principal,
        enclosure::{
            CreateEnclosurePayload, CreateMaintenancePayload, Enclosure, EnclosureDetail,
            EnclosureFilter, EnclosureKind, Maintenance, PortWithCustomer, TrayWithUsage,
            UpdateEnclosurePayload,
        },
    },
    services::{
        layout::{self, PortPlan, TrayPlan},
        territory::{Target, TerritoryAuthorizer},
    },
};

// Ciclo de vida das caixas: a capacidade declarada e os recursos físicos
// (portas da CTO, bandejas da CEO) mudam sempre juntos, na mesma transação.
#[derive(Clone)]
pub struct EnclosureService {
    repo: EnclosureRepository,
    port_repo: PortRepository,
    tray_repo: TrayRepository,
    route_repo: RouteRepository,
    territory: TerritoryAuthorizer,
    pool: PgPool,
}

impl EnclosureService {
    pub fn new(
        repo: EnclosureRepository,
        port_repo: PortRepository,
        tray_repo: TrayRepository,
        route_repo: RouteRepository,
        territory: TerritoryAuthorizer,
        pool: PgPool,
    ) -> Self {
        Self { repo, port_repo, tray_repo, route_repo, territory, pool }
    }

    // ---
    // Leitura
    // ---

    pub async fn list_enclosures(
        &self,
        principal: &Principal,
        filter: &EnclosureFilter,
    ) -> Result<(Vec<Enclosure>, i64), AppError> {
        let mut conn = self.pool.acquire().await?;
        let allowed = self.territory.scope(&mut *conn, principal, filter.cidade_id).await?;
        drop(conn);

        self.repo.list_enclosures(filter, allowed).await
    }

    pub async fn get_enclosure(&self, principal: &Principal, id: Uuid) -> Result<EnclosureDetail, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.territory.authorize(&mut *conn, principal, Target::Enclosure(id)).await?;

        let enclosure = self.repo
            .find_by_id(&mut *conn, id)
            .await?
            .ok_or(AppError::NotFound("Caixa"))?;
        self.detail(&mut *conn, enclosure).await
    }

    pub async fn list_ports(&self, principal: &Principal, id: Uuid) -> Result<Vec<PortWithCustomer>, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.territory.authorize(&mut *conn, principal, Target::Enclosure(id)).await?;
        drop(conn);

        self.port_repo.list_with_customers(id).await
    }

    pub async fn list_trays(&self, principal: &Principal, id: Uuid) -> Result<Vec<TrayWithUsage>, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.territory.authorize(&mut *conn, principal, Target::Enclosure(id)).await?;
        drop(conn);

        self.tray_repo.list_for_enclosure(id).await
    }

    // ---
    // Criação
    // ---

    /// Cria a caixa e deriva os recursos: `capacity` portas livres (CTO) ou
    /// `ceil(capacity / 12)` bandejas (CEO).
    pub async fn create_enclosure(
        &self,
        principal: &Principal,
        payload: &CreateEnclosurePayload,
    ) -> Result<EnclosureDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize_city(&mut *tx, principal, payload.city_id).await?;

        let route_ids = self.check_routes(&mut *tx, &payload.route_ids, payload.city_id).await?;

        let enclosure = self.repo
            .create_enclosure(
                &mut *tx,
                payload.city_id,
                &EnclosureRow {
                    name: &payload.name,
                    kind: payload.kind,
                    capacity: payload.capacity,
                    latitude: payload.latitude,
                    longitude: payload.longitude,
                    notes: payload.notes.as_deref(),
                },
            )
            .await?;

        match enclosure.kind {
            EnclosureKind::Terminal => {
                self.apply_port_plan(&mut *tx, enclosure.id, &layout::fresh_ports(enclosure.capacity)).await?
            }
            EnclosureKind::Splice => {
                self.apply_tray_plan(&mut *tx, enclosure.id, &layout::fresh_trays(enclosure.capacity)).await?
            }
        }
        self.repo.replace_routes(&mut *tx, enclosure.id, &route_ids).await?;

        let detail = self.detail(&mut *tx, enclosure).await?;
        tx.commit().await?;

        tracing::info!(
            "Caixa {} ({:?}) criada com capacidade {}",
            detail.enclosure.id,
            detail.enclosure.kind,
            detail.enclosure.capacity
        );
        Ok(detail)
    }

    // ---
    // Atualização
    // ---

    /// Aplica o patch e reconcilia os recursos com a nova classe/capacidade.
    ///
    /// - troca de classe: só com a caixa ociosa; os recursos antigos são
    ///   removidos e os da nova classe derivados do zero;
    /// - troca de capacidade: números que continuam válidos são mantidos,
    ///   os excedentes removidos e os que faltam criados. Nada em uso é
    ///   removido ou encolhido.
    pub async fn update_enclosure(
        &self,
        principal: &Principal,
        id: Uuid,
        payload: &UpdateEnclosurePayload,
    ) -> Result<EnclosureDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        let city_id = self.territory.authorize(&mut *tx, principal, Target::Enclosure(id)).await?;

        let current = self.repo
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Caixa"))?;

        let kind = payload.kind.unwrap_or(current.kind);
        let capacity = payload.capacity.unwrap_or(current.capacity);

        if kind != current.kind {
            // Trava as portas antes de contar: mudanças de status só travam a porta
            self.port_repo.list_for_update(&mut *tx, id).await?;
            let usage = self.repo.usage(&mut *tx, id).await?;
            layout::check_kind_change(&usage)?;

            self.port_repo.delete_all(&mut *tx, id).await?;
            self.tray_repo.delete_all(&mut *tx, id).await?;
            match kind {
                EnclosureKind::Terminal => {
                    self.apply_port_plan(&mut *tx, id, &layout::fresh_ports(capacity)).await?
                }
                EnclosureKind::Splice => {
                    self.apply_tray_plan(&mut *tx, id, &layout::fresh_trays(capacity)).await?
                }
            }
            tracing::info!("Caixa {} mudou de {:?} para {:?}", id, current.kind, kind);
        } else if capacity != current.capacity {
            self.resize(&mut *tx, id, kind, capacity).await?;
            tracing::info!("Caixa {} redimensionada: {} -> {}", id, current.capacity, capacity);
        }

        if let Some(route_ids) = &payload.route_ids {
            let route_ids = self.check_routes(&mut *tx, route_ids, city_id).await?;
            self.repo.replace_routes(&mut *tx, id, &route_ids).await?;
        }

        let enclosure = self.repo
            .update_enclosure(
                &mut *tx,
                id,
                &EnclosureRow {
                    name: payload.name.as_deref().unwrap_or(&current.name),
                    kind,
                    capacity,
                    latitude: merge_patch(current.latitude, payload.latitude),
                    longitude: merge_patch(current.longitude, payload.longitude),
                    notes: merge_patch(
                        current.notes.as_deref(),
                        payload.notes.as_ref().map(|n| n.as_deref()),
                    ),
                },
            )
            .await?;

        let detail = self.detail(&mut *tx, enclosure).await?;
        tx.commit().await?;
        Ok(detail)
    }

    async fn resize(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        kind: EnclosureKind,
        capacity: i32,
    ) -> Result<(), AppError> {
        match kind {
            EnclosureKind::Terminal => {
                let ports = self.port_repo.list_for_update(&mut *conn, id).await?;
                let plan = layout::plan_port_resize(&ports, capacity)?;
                self.apply_port_plan(conn, id, &plan).await
            }
            EnclosureKind::Splice => {
                let usage = self.repo.usage(&mut *conn, id).await?;
                let trays = self.tray_repo.list_with_usage(&mut *conn, id).await?;
                let plan = layout::plan_tray_resize(&trays, capacity, usage.splices)?;
                self.apply_tray_plan(conn, id, &plan).await
            }
        }
    }

    // ---
    // Remoção
    // ---

    /// Remove a caixa se nenhum recurso estiver em uso.
    pub async fn delete_enclosure(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize(&mut *tx, principal, Target::Enclosure(id)).await?;

        self.repo
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Caixa"))?;

        self.port_repo.list_for_update(&mut *tx, id).await?;
        let usage = self.repo.usage(&mut *tx, id).await?;
        if usage.in_use() {
            return Err(AppError::invariant(
                "A caixa possui recursos em uso e não pode ser removida.",
                json!({ "portasEmUso": usage.busy_ports, "fusoes": usage.splices }),
            ));
        }

        self.port_repo.delete_all(&mut *tx, id).await?;
        self.tray_repo.delete_all(&mut *tx, id).await?;
        self.repo.delete_with_dependents(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("Caixa {} removida", id);
        Ok(())
    }

    // ---
    // Manutenções
    // ---

    pub async fn list_maintenances(&self, principal: &Principal, id: Uuid) -> Result<Vec<Maintenance>, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.territory.authorize(&mut *conn, principal, Target::Enclosure(id)).await?;
        drop(conn);

        self.repo.list_maintenances(id).await
    }

    pub async fn create_maintenance(
        &self,
        principal: &Principal,
        id: Uuid,
        payload: &CreateMaintenancePayload,
    ) -> Result<Maintenance, AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize(&mut *tx, principal, Target::Enclosure(id)).await?;

        let performed_at = payload.performed_at.unwrap_or_else(|| Utc::now().date_naive());
        let maintenance = self.repo
            .create_maintenance(&mut *tx, id, principal.user_id, &payload.description, performed_at)
            .await?;

        tx.commit().await?;
        Ok(maintenance)
    }

    // ---
    // Auxiliares
    // ---

    async fn detail(&self, conn: &mut PgConnection, enclosure: Enclosure) -> Result<EnclosureDetail, AppError> {
        let route_ids = self.repo.route_ids(&mut *conn, enclosure.id).await?;
        let usage = self.repo.usage(&mut *conn, enclosure.id).await?;
        Ok(EnclosureDetail { enclosure, route_ids, usage })
    }

    /// As rotas vinculadas precisam existir e ser da mesma cidade da caixa.
    async fn check_routes(
        &self,
        conn: &mut PgConnection,
        route_ids: &[Uuid],
        city_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError> {
        let requested: Vec<Uuid> = route_ids
            .iter()
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if requested.is_empty() {
            return Ok(requested);
        }

        let found: HashSet<Uuid> = self.route_repo
            .ids_in_city(&mut *conn, &requested, city_id)
            .await?
            .into_iter()
            .collect();

        let missing: Vec<Uuid> = requested.iter().filter(|id| !found.contains(id)).copied().collect();
        if !missing.is_empty() {
            return Err(AppError::invariant(
                "Rotas inexistentes ou de outra cidade.",
                json!({ "rotas": missing }),
            ));
        }
        Ok(requested)
    }

    async fn apply_port_plan(&self, conn: &mut PgConnection, id: Uuid, plan: &PortPlan) -> Result<(), AppError> {
        if plan.is_empty() {
            return Ok(());
        }
        self.port_repo.delete_many(&mut *conn, &plan.delete).await?;
        self.port_repo.insert_many(&mut *conn, id, &plan.create).await
    }

    async fn apply_tray_plan(&self, conn: &mut PgConnection, id: Uuid, plan: &TrayPlan) -> Result<(), AppError> {
        if plan.is_empty() {
            return Ok(());
        }
        self.tray_repo.delete_many(&mut *conn, &plan.delete).await?;
        for (tray_id, capacity) in &plan.resize {
            self.tray_repo.set_capacity(&mut *conn, *tray_id, *capacity).await?;
        }
        self.tray_repo.insert_many(&mut *conn, id, &plan.create).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{auth::Role, customer::CreateCustomerPayload},
        test_support,
    };
    use rust_decimal::Decimal;

    #[sqlx::test]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn refused_delete_removes_nothing(pool: PgPool) {
        let state = test_support::state(pool);
        let manager = test_support::manager(&state).await;
        let city = test_support::city(&state).await;
        let cto = test_support::enclosure(&state, &manager, city.id, EnclosureKind::Terminal, 3).await;
        let id = cto.enclosure.id;
        let port = state.enclosure_service.list_ports(&manager, id).await.unwrap()[0].id;

        let customer = state
            .customer_service
            .create_customer(
                &manager,
                &CreateCustomerPayload {
                    city_id: city.id,
                    name: "Cliente de teste".into(),
                    document: None,
                    email: None,
                    phone: None,
                    address: None,
                    port_id: Some(port),
                },
            )
            .await
            .unwrap();

        let err = state.enclosure_service.delete_enclosure(&manager, id).await.unwrap_err();
        match err {
            AppError::InvariantViolation { details, .. } => assert_eq!(details["portasEmUso"], json!(1)),
            other => panic!("esperava violação de invariante, veio {other:?}"),
        }

        let detail = state.enclosure_service.get_enclosure(&manager, id).await.unwrap();
        assert_eq!(detail.usage.ports, 3);
        assert_eq!(detail.usage.busy_ports, 1);
        assert_eq!(state.enclosure_service.list_ports(&manager, id).await.unwrap().len(), 3);
        let customer = state.customer_service.get_customer(&manager, customer.id).await.unwrap();
        assert_eq!(customer.port_id, Some(port));
    }

    #[sqlx::test]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn technician_sees_enclosure_only_after_joining_the_city(pool: PgPool) {
        let state = test_support::state(pool);
        let manager = test_support::manager(&state).await;
        let city = test_support::city(&state).await;
        let cto = test_support::enclosure(&state, &manager, city.id, EnclosureKind::Terminal, 2).await;

        let technician = test_support::user(&state, Role::Technician, Vec::new()).await;
        let err = state.enclosure_service.get_enclosure(&technician, cto.enclosure.id).await.unwrap_err();
        assert!(matches!(err, AppError::ForbiddenTerritory));

        state.user_service.assign_cities(technician.user_id, &[city.id]).await.unwrap();
        let detail = state.enclosure_service.get_enclosure(&technician, cto.enclosure.id).await.unwrap();
        assert_eq!(detail.enclosure.city_id, city.id);
    }

    #[sqlx::test]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn null_in_patch_clears_the_field(pool: PgPool) {
        let state = test_support::state(pool);
        let manager = test_support::manager(&state).await;
        let city = test_support::city(&state).await;
        let cto = test_support::enclosure(&state, &manager, city.id, EnclosureKind::Terminal, 2).await;
        let id = cto.enclosure.id;

        let set = UpdateEnclosurePayload {
            latitude: Some(Some(Decimal::new(-72_300, 3))),
            notes: Some(Some("Poste 14".into())),
            ..Default::default()
        };
        let detail = state.enclosure_service.update_enclosure(&manager, id, &set).await.unwrap();
        assert_eq!(detail.enclosure.notes.as_deref(), Some("Poste 14"));

        // Ausente mantém, null apaga
        let clear = UpdateEnclosurePayload { notes: Some(None), ..Default::default() };
        let detail = state.enclosure_service.update_enclosure(&manager, id, &clear).await.unwrap();
        assert_eq!(detail.enclosure.notes, None);
        assert_eq!(detail.enclosure.latitude, Some(Decimal::new(-72_300, 3)));
    }
    #[sqlx::test]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn idle_enclosure_changes_kind_and_busy_one_does_not(pool: PgPool) {
        let state = test_support::state(pool);
        let manager = test_support::manager(&state).await;
        let city = test_support::city(&state).await;
        let cto = test_support::enclosure(&state, &manager, city.id, EnclosureKind::Terminal, 3).await;
        let id = cto.enclosure.id;

        let to_ceo = UpdateEnclosurePayload {
            kind: Some(EnclosureKind::Splice),
            capacity: Some(30),
            ..Default::default()
        };
        let detail = state.enclosure_service.update_enclosure(&manager, id, &to_ceo).await.unwrap();
        assert_eq!(detail.usage.ports, 0);
        assert_eq!(detail.usage.trays, 3);
        let capacities: Vec<i32> = state
            .enclosure_service
            .list_trays(&manager, id)
            .await
            .unwrap()
            .iter()
            .map(|t| t.capacity)
            .collect();
        assert_eq!(capacities, vec![12, 12, 6]);

        let to_cto = UpdateEnclosurePayload {
            kind: Some(EnclosureKind::Terminal),
            capacity: Some(3),
            ..Default::default()
        };
        let detail = state.enclosure_service.update_enclosure(&manager, id, &to_cto).await.unwrap();
        assert_eq!((detail.usage.ports, detail.usage.trays), (3, 0));

        let port = state.enclosure_service.list_ports(&manager, id).await.unwrap()[0].id;
        state
            .customer_service
            .create_customer(
                &manager,
                &CreateCustomerPayload {
                    city_id: city.id,
                    name: "Cliente de teste".into(),
                    document: None,
                    email: None,
                    phone: None,
                    address: None,
                    port_id: Some(port),
                },
            )
            .await
            .unwrap();

        let err = state.enclosure_service.update_enclosure(&manager, id, &to_ceo).await.unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation { .. }));

        let detail = state.enclosure_service.get_enclosure(&manager, id).await.unwrap();
        assert_eq!(detail.enclosure.kind, EnclosureKind::Terminal);
        assert_eq!(detail.enclosure.capacity, 3);
        assert_eq!((detail.usage.ports, detail.usage.busy_ports, detail.usage.trays), (3, 1, 0));
    }
}
