// src/services/route_service.rs

use std::collections::HashMap;

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::RouteRepository,
    models::{
        auth::Principal,
        route::{
            color_for, CreateRoutePayload, Fiber, Route, RouteFilter, TubeWithFibers, UpdateRoutePayload,
            FIBERS_PER_TUBE,
        },
    },
    services::territory::{Target, TerritoryAuthorizer},
};

#[derive(Clone)]
pub struct RouteService {
    repo: RouteRepository,
    territory: TerritoryAuthorizer,
    pool: PgPool,
}

/// (tubos, capilares) de um cabo com `fiber_count` fibras.
/// Tubos = (id, número, cor); capilares = (tubo, número, cor).
pub fn cable_structure(fiber_count: i32) -> (Vec<(Uuid, i32, String)>, Vec<(Uuid, i32, String)>) {
    let tube_count = fiber_count / FIBERS_PER_TUBE;
    let mut tubes = Vec::with_capacity(tube_count as usize);
    let mut fibers = Vec::with_capacity(fiber_count as usize);

    for number in 1..=tube_count {
        let tube_id = Uuid::new_v4();
        tubes.push((tube_id, number, color_for(number).to_string()));
        for fiber in 1..=FIBERS_PER_TUBE {
            fibers.push((tube_id, fiber, color_for(fiber).to_string()));
        }
    }
    (tubes, fibers)
}

impl RouteService {
    pub fn new(repo: RouteRepository, territory: TerritoryAuthorizer, pool: PgPool) -> Self {
        Self { repo, territory, pool }
    }

    pub async fn list_routes(
        &self,
        principal: &Principal,
        filter: &RouteFilter,
    ) -> Result<(Vec<Route>, i64), AppError> {
        let mut conn = self.pool.acquire().await?;
        let allowed = self.territory.scope(&mut *conn, principal, filter.cidade_id).await?;
        drop(conn);

        self.repo.list_routes(filter, allowed).await
    }

    pub async fn get_route(&self, principal: &Principal, id: Uuid) -> Result<Route, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.territory.authorize(&mut *conn, principal, Target::Route(id)).await?;

        self.repo
            .find_by_id(&mut *conn, id)
            .await?
            .ok_or(AppError::NotFound("Rota"))
    }

    /// Cria a rota com todos os tubos e capilares numa única transação.
    pub async fn create_route(&self, principal: &Principal, payload: &CreateRoutePayload) -> Result<Route, AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize_city(&mut *tx, principal, payload.city_id).await?;

        let route = self.repo
            .create_route(
                &mut *tx,
                payload.city_id,
                &payload.name,
                &payload.cable_type,
                payload.fiber_count,
                payload.length_meters,
            )
            .await?;

        let (tubes, fibers) = cable_structure(route.fiber_count);
        self.repo.insert_tubes(&mut *tx, route.id, &tubes).await?;
        self.repo.insert_fibers(&mut *tx, &fibers).await?;

        tx.commit().await?;

        tracing::info!(
            "Rota {} criada com {} tubos / {} fibras",
            route.id,
            tubes.len(),
            fibers.len()
        );
        Ok(route)
    }

    pub async fn update_route(
        &self,
        principal: &Principal,
        id: Uuid,
        payload: &UpdateRoutePayload,
    ) -> Result<Route, AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize(&mut *tx, principal, Target::Route(id)).await?;

        let route = self.repo
            .update_route(
                &mut *tx,
                id,
                payload.name.as_deref(),
                payload.cable_type.as_deref(),
                payload.length_meters,
            )
            .await?
            .ok_or(AppError::NotFound("Rota"))?;

        tx.commit().await?;
        Ok(route)
    }

    /// Remove a rota se nenhuma fibra dela estiver fusionada.
    pub async fn delete_route(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize(&mut *tx, principal, Target::Route(id)).await?;

        let splices = self.repo.count_splices_on_route(&mut *tx, id).await?;
        if splices > 0 {
            return Err(AppError::invariant(
                "A rota possui fibras com fusões registradas.",
                json!({ "rotaId": id, "fusoes": splices }),
            ));
        }

        self.repo.delete_route_comments(&mut *tx, id).await?;
        self.repo.delete_route(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("Rota {} removida", id);
        Ok(())
    }

    /// Tubos da rota, cada um com seus capilares.
    pub async fn list_tubes(&self, principal: &Principal, id: Uuid) -> Result<Vec<TubeWithFibers>, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.territory.authorize(&mut *conn, principal, Target::Route(id)).await?;
        drop(conn);

        let tubes = self.repo.list_tubes(id).await?;
        let mut by_tube: HashMap<Uuid, Vec<Fiber>> = HashMap::new();
        for fiber in self.repo.list_fibers(id).await? {
            by_tube.entry(fiber.tube_id).or_default().push(fiber);
        }

        Ok(tubes
            .into_iter()
            .map(|tube| {
                let fibers = by_tube.remove(&tube.id).unwrap_or_default();
                TubeWithFibers { tube, fibers }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cable_has_one_tube_per_twelve_fibers() {
        let (tubes, fibers) = cable_structure(36);
        assert_eq!(tubes.len(), 3);
        assert_eq!(fibers.len(), 36);

        let numbers: Vec<i32> = tubes.iter().map(|t| t.1).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(tubes[0].2, "Verde");
        assert_eq!(tubes[2].2, "Branco");
    }

    #[test]
    fn fibers_restart_numbering_in_each_tube() {
        let (tubes, fibers) = cable_structure(24);
        let second_tube: Vec<&(Uuid, i32, String)> =
            fibers.iter().filter(|f| f.0 == tubes[1].0).collect();
        assert_eq!(second_tube.len(), 12);
        assert_eq!(second_tube[0].1, 1);
        assert_eq!(second_tube[11].1, 12);
        assert_eq!(second_tube[11].2, "Aqua");
    }
}
