// src/services/city_service.rs

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CityRepository,
    models::{
        auth::Principal,
        city::{City, CityFilter, CreateCityPayload, UpdateCityPayload},
    },
    services::territory::{Target, TerritoryAuthorizer},
};

#[derive(Clone)]
pub struct CityService {
    repo: CityRepository,
    territory: TerritoryAuthorizer,
    pool: PgPool,
}

impl CityService {
    pub fn new(repo: CityRepository, territory: TerritoryAuthorizer, pool: PgPool) -> Self {
        Self { repo, territory, pool }
    }

    pub async fn list_cities(
        &self,
        principal: &Principal,
        filter: &CityFilter,
    ) -> Result<(Vec<City>, i64), AppError> {
        let mut conn = self.pool.acquire().await?;
        let allowed = self.territory.scope(&mut *conn, principal, None).await?;
        drop(conn);

        self.repo.list_cities(filter, allowed).await
    }

    pub async fn get_city(&self, principal: &Principal, id: Uuid) -> Result<City, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.territory.authorize(&mut *conn, principal, Target::City(id)).await?;

        self.repo
            .find_by_id(&mut *conn, id)
            .await?
            .ok_or(AppError::NotFound("Cidade"))
    }

    pub async fn create_city(&self, payload: &CreateCityPayload) -> Result<City, AppError> {
        let city = self.repo
            .create_city(&self.pool, &payload.name, &payload.state, payload.latitude, payload.longitude)
            .await?;

        tracing::info!("Cidade {} criada: {}/{}", city.id, city.name, city.state);
        Ok(city)
    }

    pub async fn update_city(&self, id: Uuid, payload: &UpdateCityPayload) -> Result<City, AppError> {
        self.repo
            .update_city(
                &self.pool,
                id,
                payload.name.as_deref(),
                payload.state.as_deref(),
                payload.latitude,
                payload.longitude,
            )
            .await?
            .ok_or(AppError::NotFound("Cidade"))
    }

    /// Só remove cidades sem rotas e sem caixas.
    pub async fn delete_city(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        self.repo
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Cidade"))?;

        let (routes, enclosures) = self.repo.count_dependents(&mut *tx, id).await?;
        if routes > 0 || enclosures > 0 {
            return Err(AppError::invariant(
                "A cidade ainda possui rotas ou caixas.",
                json!({ "rotas": routes, "caixas": enclosures }),
            ));
        }

        self.repo.delete_city(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("Cidade {} removida", id);
        Ok(())
    }
}
