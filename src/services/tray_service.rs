// src/services/tray_service.rs

use std::collections::HashSet;

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{EnclosureRepository, SpliceRepository, TrayRepository},
    models::{
        auth::Principal,
        enclosure::{BulkTrayUpdate, TrayWithUsage},
    },
    services::{
        territory::{Target, TerritoryAuthorizer},
        tray_packer,
    },
};

#[derive(Clone)]
pub struct TrayService {
    repo: TrayRepository,
    enclosure_repo: EnclosureRepository,
    splice_repo: SpliceRepository,
    territory: TerritoryAuthorizer,
    pool: PgPool,
}

impl TrayService {
    pub fn new(
        repo: TrayRepository,
        enclosure_repo: EnclosureRepository,
        splice_repo: SpliceRepository,
        territory: TerritoryAuthorizer,
        pool: PgPool,
    ) -> Self {
        Self { repo, enclosure_repo, splice_repo, territory, pool }
    }

    pub async fn update_capacity(
        &self,
        principal: &Principal,
        tray_id: Uuid,
        capacity: i32,
    ) -> Result<TrayWithUsage, AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize(&mut *tx, principal, Target::Tray(tray_id)).await?;

        // Caixa antes da bandeja, a mesma ordem das fusões e do redimensionamento
        self.enclosure_repo
            .lock_owner_of_tray(&mut *tx, tray_id)
            .await?
            .ok_or(AppError::NotFound("Bandeja"))?;
        self.repo
            .lock_many(&mut *tx, &[tray_id])
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::NotFound("Bandeja"))?;

        let existing = self.splice_repo.count_for_tray(&mut *tx, tray_id).await?;
        tray_packer::check_tray_capacity(tray_id, capacity, existing)?;
        self.repo.set_capacity(&mut *tx, tray_id, capacity).await?;

        let tray = self.repo
            .find_with_usage(&mut *tx, tray_id)
            .await?
            .ok_or(AppError::NotFound("Bandeja"))?;

        tx.commit().await?;
        Ok(tray)
    }

    /// Ajusta várias bandejas de uma CEO. Uma recusa desfaz todas.
    pub async fn bulk_update(
        &self,
        principal: &Principal,
        enclosure_id: Uuid,
        updates: &[BulkTrayUpdate],
    ) -> Result<Vec<TrayWithUsage>, AppError> {
        let mut tx = self.pool.begin().await?;
        self.territory.authorize(&mut *tx, principal, Target::Enclosure(enclosure_id)).await?;

        let ids: Vec<Uuid> = updates.iter().map(|u| u.id).collect::<HashSet<_>>().into_iter().collect();
        if ids.len() != updates.len() {
            return Err(AppError::InvalidInput("A mesma bandeja aparece mais de uma vez.".into()));
        }

        self.enclosure_repo
            .find_for_update(&mut *tx, enclosure_id)
            .await?
            .ok_or(AppError::NotFound("Caixa"))?;

        let locked = self.repo.lock_many(&mut *tx, &ids).await?;
        let foreign: Vec<Uuid> = ids
            .iter()
            .filter(|id| !locked.iter().any(|t| t.id == **id && t.enclosure_id == enclosure_id))
            .copied()
            .collect();
        if !foreign.is_empty() {
            return Err(AppError::invariant(
                "Bandejas inexistentes ou de outra caixa.",
                json!({ "bandejas": foreign }),
            ));
        }

        for update in updates {
            let existing = self.splice_repo.count_for_tray(&mut *tx, update.id).await?;
            tray_packer::check_tray_capacity(update.id, update.capacity, existing)?;
            self.repo.set_capacity(&mut *tx, update.id, update.capacity).await?;
        }

        let trays = self.repo.list_with_usage(&mut *tx, enclosure_id).await?;
        tx.commit().await?;

        tracing::info!("{} bandeja(s) ajustadas na caixa {}", updates.len(), enclosure_id);
        Ok(trays)
    }
}
