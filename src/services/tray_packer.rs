// src/services/tray_packer.rs

//! Regra de ocupação das bandejas: `existentes + solicitadas <= capacidade`.

use std::collections::{BTreeMap, HashMap};

use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{enclosure::Tray, splice::CreateSplicePayload},
};

/// Verifica se a bandeja comporta mais `requested` fusões.
pub fn reserve_capacity(
    tray_id: Uuid,
    capacity: i32,
    existing: i64,
    requested: i64,
) -> Result<(), AppError> {
    if existing + requested > capacity as i64 {
        return Err(AppError::invariant(
            "A bandeja não comporta as fusões solicitadas.",
            json!({
                "bandejaId": tray_id,
                "capacidade": capacity,
                "existentes": existing,
                "solicitadas": requested,
            }),
        ));
    }
    Ok(())
}

/// Nova capacidade declarada de uma bandeja precisa acomodar as fusões atuais.
pub fn check_tray_capacity(tray_id: Uuid, capacity: i32, existing: i64) -> Result<(), AppError> {
    if (capacity as i64) < existing {
        return Err(AppError::invariant(
            "A capacidade da bandeja não pode ficar abaixo das fusões existentes.",
            json!({
                "bandejaId": tray_id,
                "capacidade": capacity,
                "existentes": existing,
            }),
        ));
    }
    Ok(())
}

/// A caixa comum a todas as fusões de um lote.
pub fn batch_enclosure(splices: &[CreateSplicePayload]) -> Result<Uuid, AppError> {
    let first = splices
        .first()
        .ok_or_else(|| AppError::InvalidInput("Informe ao menos uma fusão.".into()))?
        .enclosure_id;

    if splices.iter().any(|s| s.enclosure_id != first) {
        return Err(AppError::InvalidInput(
            "Todas as fusões de um lote devem pertencer à mesma caixa.".into(),
        ));
    }
    Ok(first)
}

/// Quantidade solicitada por bandeja. Fusões sem bandeja não entram.
/// A ordem é estável (por id) para que os locks sejam tomados sempre na
/// mesma sequência.
pub fn requested_per_tray(splices: &[CreateSplicePayload]) -> BTreeMap<Uuid, i64> {
    let mut per_tray = BTreeMap::new();
    for tray_id in splices.iter().filter_map(|s| s.tray_id) {
        *per_tray.entry(tray_id).or_insert(0) += 1;
    }
    per_tray
}

/// Confere todas as bandejas de um lote antes de qualquer inserção.
///
/// `trays` são as bandejas travadas, `existing` as fusões já gravadas em
/// cada uma. A primeira bandeja recusada (na ordem dos ids) decide o erro.
pub fn check_batch(
    enclosure_id: Uuid,
    trays: &[Tray],
    per_tray: &BTreeMap<Uuid, i64>,
    existing: &HashMap<Uuid, i64>,
) -> Result<(), AppError> {
    for (tray_id, requested) in per_tray {
        let tray = trays
            .iter()
            .find(|t| t.id == *tray_id)
            .ok_or(AppError::NotFound("Bandeja"))?;
        if tray.enclosure_id != enclosure_id {
            return Err(AppError::invariant(
                "A bandeja não pertence à caixa informada.",
                json!({ "bandejaId": tray_id, "caixaId": enclosure_id }),
            ));
        }

        let already = existing.get(tray_id).copied().unwrap_or(0);
        reserve_capacity(*tray_id, tray.capacity, already, *requested)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tray(enclosure_id: Uuid, number: i32, capacity: i32) -> Tray {
        Tray { id: Uuid::new_v4(), enclosure_id, number, capacity, updated_at: Utc::now() }
    }

    fn splice(enclosure_id: Uuid, tray_id: Option<Uuid>) -> CreateSplicePayload {
        CreateSplicePayload {
            enclosure_id,
            tray_id,
            origin_fiber_id: Uuid::new_v4(),
            destination_fiber_id: Uuid::new_v4(),
            notes: None,
        }
    }

    #[test]
    fn capacity_is_inclusive() {
        let tray = Uuid::new_v4();
        assert!(reserve_capacity(tray, 12, 11, 1).is_ok());
        assert!(reserve_capacity(tray, 12, 12, 1).is_err());
    }

    #[test]
    fn five_splices_into_a_tray_of_four_are_rejected_with_detail() {
        let tray = Uuid::new_v4();
        match reserve_capacity(tray, 4, 0, 5) {
            Err(AppError::InvariantViolation { details, .. }) => {
                assert_eq!(details["capacidade"], 4);
                assert_eq!(details["existentes"], 0);
                assert_eq!(details["solicitadas"], 5);
            }
            other => panic!("resultado inesperado: {:?}", other),
        }
    }

    #[test]
    fn requests_are_summed_per_tray() {
        let enclosure = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let batch = vec![
            splice(enclosure, Some(a)),
            splice(enclosure, Some(b)),
            splice(enclosure, Some(a)),
            splice(enclosure, None),
        ];
        let per_tray = requested_per_tray(&batch);
        assert_eq!(per_tray.len(), 2);
        assert_eq!(per_tray[&a], 2);
        assert_eq!(per_tray[&b], 1);
    }

    #[test]
    fn batch_must_target_a_single_enclosure() {
        let enclosure = Uuid::new_v4();
        let same = vec![splice(enclosure, None), splice(enclosure, None)];
        assert_eq!(batch_enclosure(&same).unwrap(), enclosure);

        let mixed = vec![splice(enclosure, None), splice(Uuid::new_v4(), None)];
        assert!(batch_enclosure(&mixed).is_err());
        assert!(batch_enclosure(&[]).is_err());
    }

    #[test]
    fn tray_capacity_cannot_drop_below_existing_splices() {
        let tray = Uuid::new_v4();
        assert!(check_tray_capacity(tray, 6, 6).is_ok());
        assert!(check_tray_capacity(tray, 5, 6).is_err());
    }

    #[test]
    fn one_overflowing_tray_rejects_the_whole_batch() {
        let enclosure = Uuid::new_v4();
        let (full, small) = (tray(enclosure, 1, 12), tray(enclosure, 2, 4));

        let mut batch: Vec<CreateSplicePayload> = (0..2).map(|_| splice(enclosure, Some(full.id))).collect();
        batch.extend((0..5).map(|_| splice(enclosure, Some(small.id))));
        let per_tray = requested_per_tray(&batch);

        let trays = vec![full.clone(), small.clone()];
        match check_batch(enclosure, &trays, &per_tray, &HashMap::new()) {
            Err(AppError::InvariantViolation { details, .. }) => {
                assert_eq!(details["bandejaId"], serde_json::json!(small.id));
                assert_eq!(details["capacidade"], 4);
                assert_eq!(details["solicitadas"], 5);
            }
            other => panic!("resultado inesperado: {:?}", other),
        }

        // Quatro cabem na bandeja pequena
        let mut fits: Vec<CreateSplicePayload> = (0..2).map(|_| splice(enclosure, Some(full.id))).collect();
        fits.extend((0..4).map(|_| splice(enclosure, Some(small.id))));
        assert!(check_batch(enclosure, &trays, &requested_per_tray(&fits), &HashMap::new()).is_ok());
    }

    #[test]
    fn existing_splices_count_against_the_batch() {
        let enclosure = Uuid::new_v4();
        let t = tray(enclosure, 1, 12);
        let per_tray = requested_per_tray(&[splice(enclosure, Some(t.id)), splice(enclosure, Some(t.id))]);

        let existing = HashMap::from([(t.id, 10)]);
        assert!(check_batch(enclosure, std::slice::from_ref(&t), &per_tray, &existing).is_ok());

        let existing = HashMap::from([(t.id, 11)]);
        assert!(check_batch(enclosure, std::slice::from_ref(&t), &per_tray, &existing).is_err());
    }

    #[test]
    fn unknown_or_foreign_trays_are_refused() {
        let enclosure = Uuid::new_v4();
        let foreign = tray(Uuid::new_v4(), 1, 12);
        let per_tray = requested_per_tray(&[splice(enclosure, Some(foreign.id))]);

        let err = check_batch(enclosure, std::slice::from_ref(&foreign), &per_tray, &HashMap::new()).unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation { .. }));

        let err = check_batch(enclosure, &[], &per_tray, &HashMap::new()).unwrap_err();
        assert!(matches!(err, AppError::NotFound("Bandeja")));
    }
}
