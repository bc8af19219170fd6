// src/services/splice_service.rs

use std::collections::BTreeSet;

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{EnclosureRepository, SpliceRepository, TrayRepository},
    models::{
        auth::Principal,
        enclosure::EnclosureKind,
        splice::{CreateSplicePayload, Splice, SpliceFilter},
    },
    services::{
        territory::{Target, TerritoryAuthorizer},
        tray_packer,
    },
};

/// Todo capilar fusionado numa caixa precisa passar por rota da mesma cidade.
pub fn check_fiber_cities(enclosure_city: Uuid, fiber_cities: &[(Uuid, Uuid)]) -> Result<(), AppError> {
    let foreign: Vec<Uuid> = fiber_cities
        .iter()
        .filter(|(_, city_id)| *city_id != enclosure_city)
        .map(|(fiber_id, _)| *fiber_id)
        .collect();
    if !foreign.is_empty() {
        return Err(AppError::invariant(
            "Os capilares devem pertencer a rotas da mesma cidade da caixa.",
            json!({ "cidadeId": enclosure_city, "fibras": foreign }),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct SpliceService {
    repo: SpliceRepository,
    enclosure_repo: EnclosureRepository,
    tray_repo: TrayRepository,
    territory: TerritoryAuthorizer,
    pool: PgPool,
}

impl SpliceService {
    pub fn new(
        repo: SpliceRepository,
        enclosure_repo: EnclosureRepository,
        tray_repo: TrayRepository,
        territory: TerritoryAuthorizer,
        pool: PgPool,
    ) -> Self {
        Self { repo, enclosure_repo, tray_repo, territory, pool }
    }

    /// Grava uma fusão ou um lote. Todas as bandejas do lote são travadas e
    /// conferidas antes da primeira inserção; qualquer recusa desfaz o lote.
    pub async fn create_splices(
        &self,
        principal: &Principal,
        splices: &[CreateSplicePayload],
    ) -> Result<Vec<Splice>, AppError> {
        let enclosure_id = tray_packer::batch_enclosure(splices)?;

        let mut tx = self.pool.begin().await?;
        self.territory.authorize(&mut *tx, principal, Target::Enclosure(enclosure_id)).await?;

        // Serializa com as mudanças de capacidade da caixa
        let enclosure = self.enclosure_repo
            .find_for_update(&mut *tx, enclosure_id)
            .await?
            .ok_or(AppError::NotFound("Caixa"))?;
        if enclosure.kind != EnclosureKind::Splice {
            return Err(AppError::invariant(
                "Fusões só podem ser registradas em caixas de emenda (CEO).",
                json!({ "caixaId": enclosure_id, "tipo": enclosure.kind }),
            ));
        }

        // Os dois capilares de cada fusão: existem (404), estão no território
        // do usuário (403) e são da mesma cidade da caixa (400)
        let fiber_ids: BTreeSet<Uuid> = splices
            .iter()
            .flat_map(|s| [s.origin_fiber_id, s.destination_fiber_id])
            .collect();
        let mut fiber_cities = Vec::with_capacity(fiber_ids.len());
        for fiber_id in fiber_ids {
            let city_id = self.territory.authorize(&mut *tx, principal, Target::Fiber(fiber_id)).await?;
            fiber_cities.push((fiber_id, city_id));
        }
        check_fiber_cities(enclosure.city_id, &fiber_cities)?;

        let per_tray = tray_packer::requested_per_tray(splices);
        let tray_ids: Vec<Uuid> = per_tray.keys().copied().collect();
        let trays = self.tray_repo.lock_many(&mut *tx, &tray_ids).await?;
        let existing = self.repo.counts_for_trays(&mut *tx, &tray_ids).await?;
        tray_packer::check_batch(enclosure_id, &trays, &per_tray, &existing)?;

        let mut created = Vec::with_capacity(splices.len());
        for payload in splices {
            created.push(self.repo.create_splice(&mut *tx, payload, principal.user_id).await?);
        }

        tx.commit().await?;

        tracing::info!("{} fusão(ões) registradas na caixa {}", created.len(), enclosure_id);
        Ok(created)
    }

    pub async fn list_splices(
        &self,
        principal: &Principal,
        filter: &SpliceFilter,
    ) -> Result<(Vec<Splice>, i64), AppError> {
        let mut conn = self.pool.acquire().await?;
        self.territory
            .authorize(&mut *conn, principal, Target::Enclosure(filter.enclosure_id))
            .await?;
        drop(conn);

        self.repo.list_splices(filter).await
    }

    pub async fn delete_splice(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize(&mut *tx, principal, Target::Splice(id)).await?;

        self.repo.delete_splice(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("Fusão {} removida", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fibers_of_the_enclosure_city_pass() {
        let city = Uuid::new_v4();
        let fibers = [(Uuid::new_v4(), city), (Uuid::new_v4(), city)];
        assert!(check_fiber_cities(city, &fibers).is_ok());
        assert!(check_fiber_cities(city, &[]).is_ok());
    }

    #[test]
    fn fiber_from_another_city_is_listed() {
        let city = Uuid::new_v4();
        let local = Uuid::new_v4();
        let foreign = Uuid::new_v4();

        let err = check_fiber_cities(city, &[(local, city), (foreign, Uuid::new_v4())]).unwrap_err();
        match err {
            AppError::InvariantViolation { details, .. } => {
                assert_eq!(details["cidadeId"], json!(city));
                assert_eq!(details["fibras"], json!([foreign]));
            }
            other => panic!("esperava violação de invariante, veio {other:?}"),
        }
    }

    // ---
    // Com banco
    // ---

    use crate::{models::auth::Role, test_support};

    fn splice(enclosure_id: Uuid, tray_id: Uuid, origin: Uuid, destination: Uuid) -> CreateSplicePayload {
        CreateSplicePayload {
            enclosure_id,
            tray_id: Some(tray_id),
            origin_fiber_id: origin,
            destination_fiber_id: destination,
            notes: None,
        }
    }

    #[sqlx::test]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn overflowing_tray_rolls_back_the_whole_batch(pool: PgPool) {
        let state = test_support::state(pool);
        let manager = test_support::manager(&state).await;
        let city = test_support::city(&state).await;
        let route = test_support::route(&state, &manager, city.id, 12).await;
        let fibers = test_support::fibers(&state, &manager, route.id).await;
        // 16 fibras: bandejas de 12 e de 4
        let ceo = test_support::enclosure(&state, &manager, city.id, EnclosureKind::Splice, 16).await;
        let enclosure_id = ceo.enclosure.id;

        let trays = state.enclosure_service.list_trays(&manager, enclosure_id).await.unwrap();
        let (large, small) = (&trays[0], &trays[1]);
        assert_eq!((large.capacity, small.capacity), (12, 4));

        let mut batch: Vec<_> = (0..2)
            .map(|_| splice(enclosure_id, large.id, fibers[0].id, fibers[1].id))
            .collect();
        batch.extend((0..5).map(|_| splice(enclosure_id, small.id, fibers[2].id, fibers[3].id)));

        let err = state.splice_service.create_splices(&manager, &batch).await.unwrap_err();
        match err {
            AppError::InvariantViolation { details, .. } => assert_eq!(details["bandejaId"], json!(small.id)),
            other => panic!("esperava violação de invariante, veio {other:?}"),
        }

        let filter = SpliceFilter { pagina: None, limite: None, enclosure_id, tray_id: None };
        let (_, total) = state.splice_service.list_splices(&manager, &filter).await.unwrap();
        assert_eq!(total, 0);

        batch.pop();
        let created = state.splice_service.create_splices(&manager, &batch).await.unwrap();
        assert_eq!(created.len(), 6);
    }

    #[sqlx::test]
    #[ignore = "precisa de Postgres (DATABASE_URL)"]
    async fn fibers_are_checked_against_territory_and_enclosure_city(pool: PgPool) {
        let state = test_support::state(pool);
        let manager = test_support::manager(&state).await;
        let home = test_support::city(&state).await;
        let other = test_support::city(&state).await;

        let other_route = test_support::route(&state, &manager, other.id, 12).await;
        let foreign = test_support::fibers(&state, &manager, other_route.id).await;
        let ceo = test_support::enclosure(&state, &manager, home.id, EnclosureKind::Splice, 12).await;
        let enclosure_id = ceo.enclosure.id;
        let tray_id = state.enclosure_service.list_trays(&manager, enclosure_id).await.unwrap()[0].id;
        let batch = [splice(enclosure_id, tray_id, foreign[0].id, foreign[1].id)];

        // Gerente vê as duas cidades: a recusa é pela cidade da caixa
        let err = state.splice_service.create_splices(&manager, &batch).await.unwrap_err();
        match err {
            AppError::InvariantViolation { details, .. } => {
                assert_eq!(details["cidadeId"], json!(home.id));
                assert_eq!(details["fibras"].as_array().map(Vec::len), Some(2));
            }
            other => panic!("esperava violação de invariante, veio {other:?}"),
        }

        // Técnico só da cidade da caixa nem chega a saber da outra rota
        let technician = test_support::user(&state, Role::Technician, vec![home.id]).await;
        let err = state.splice_service.create_splices(&technician, &batch).await.unwrap_err();
        assert!(matches!(err, AppError::ForbiddenTerritory));

        // Capilares inexistentes: 404, não 403
        let missing = [splice(enclosure_id, tray_id, Uuid::new_v4(), Uuid::new_v4())];
        let err = state.splice_service.create_splices(&technician, &missing).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("Fibra")));
    }
}
