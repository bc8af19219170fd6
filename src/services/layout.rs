// src/services/layout.rs

//! Derivação dos recursos físicos de uma caixa a partir de `kind` + `capacity`.
//!
//! Invariante mantido aqui:
//! - CTO: existe exatamente uma porta para cada número `1..=capacity`;
//! - CEO: existem `ceil(capacity / 12)` bandejas; todas com 12 fibras,
//!   exceto a última, que fica com o resto.
//!
//! As funções são puras: recebem o estado atual já lido (e travado) pelo
//! serviço e devolvem o plano de escrita, ou a violação que impede a mudança.

use std::collections::HashSet;

use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::enclosure::{EnclosureUsage, Port, PortStatus, TrayWithUsage},
};

/// Fibras por bandeja quando as bandejas são derivadas da caixa.
pub const FIBERS_PER_TRAY: i32 = 12;

/// Capacidades das bandejas de uma CEO com `capacity` fibras.
pub fn tray_layout(capacity: i32) -> Vec<i32> {
    if capacity <= 0 {
        return Vec::new();
    }
    let mut layout = vec![FIBERS_PER_TRAY; (capacity / FIBERS_PER_TRAY) as usize];
    let remainder = capacity % FIBERS_PER_TRAY;
    if remainder > 0 {
        layout.push(remainder);
    }
    layout
}

/// Escritas necessárias para deixar as portas de uma CTO iguais à capacidade.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PortPlan {
    pub delete: Vec<Uuid>,
    pub create: Vec<i32>,
}

impl PortPlan {
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.create.is_empty()
    }
}

/// Escritas necessárias para deixar as bandejas de uma CEO iguais ao layout.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TrayPlan {
    pub delete: Vec<Uuid>,
    /// (bandeja, nova capacidade)
    pub resize: Vec<(Uuid, i32)>,
    /// (número, capacidade)
    pub create: Vec<(i32, i32)>,
}

impl TrayPlan {
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.resize.is_empty() && self.create.is_empty()
    }
}

/// Portas de uma CTO recém-criada (ou que acabou de mudar de classe).
pub fn fresh_ports(capacity: i32) -> PortPlan {
    PortPlan {
        delete: Vec::new(),
        create: (1..=capacity).collect(),
    }
}

/// Bandejas de uma CEO recém-criada (ou que acabou de mudar de classe).
pub fn fresh_trays(capacity: i32) -> TrayPlan {
    TrayPlan {
        create: tray_layout(capacity)
            .into_iter()
            .enumerate()
            .map(|(i, cap)| (i as i32 + 1, cap))
            .collect(),
        ..TrayPlan::default()
    }
}

/// Mudança de classe só é aceita com a caixa ociosa.
pub fn check_kind_change(usage: &EnclosureUsage) -> Result<(), AppError> {
    if usage.in_use() {
        return Err(AppError::invariant(
            "A classe da caixa só pode mudar quando nenhum recurso está em uso.",
            json!({
                "portasEmUso": usage.busy_ports,
                "fusoes": usage.splices,
            }),
        ));
    }
    Ok(())
}

/// Reconcilia as portas existentes com a nova capacidade.
///
/// Portas cujo número continua válido são mantidas (com status e cliente);
/// as que passam da capacidade são removidas e as que faltam são criadas.
pub fn plan_port_resize(existing: &[Port], capacity: i32) -> Result<PortPlan, AppError> {
    let busy = existing.iter().filter(|p| p.status != PortStatus::Free).count() as i64;
    if (capacity as i64) < busy {
        return Err(AppError::invariant(
            "A nova capacidade é menor que a quantidade de portas em uso.",
            json!({ "capacidade": capacity, "portasEmUso": busy }),
        ));
    }

    let mut blocked: Vec<i32> = existing
        .iter()
        .filter(|p| p.number > capacity && p.status != PortStatus::Free)
        .map(|p| p.number)
        .collect();
    if !blocked.is_empty() {
        blocked.sort_unstable();
        return Err(AppError::invariant(
            "A redução removeria portas que não estão livres.",
            json!({ "capacidade": capacity, "portasBloqueadas": blocked }),
        ));
    }

    let kept: HashSet<i32> = existing
        .iter()
        .filter(|p| p.number <= capacity)
        .map(|p| p.number)
        .collect();

    Ok(PortPlan {
        delete: existing
            .iter()
            .filter(|p| p.number > capacity)
            .map(|p| p.id)
            .collect(),
        create: (1..=capacity).filter(|n| !kept.contains(n)).collect(),
    })
}

/// Reconcilia as bandejas existentes com o layout da nova capacidade.
///
/// `total_splices` conta todas as fusões da caixa, inclusive as que não estão
/// em nenhuma bandeja.
pub fn plan_tray_resize(
    existing: &[TrayWithUsage],
    capacity: i32,
    total_splices: i64,
) -> Result<TrayPlan, AppError> {
    if (capacity as i64) < total_splices {
        return Err(AppError::invariant(
            "A nova capacidade é menor que a quantidade de fusões da caixa.",
            json!({ "capacidade": capacity, "fusoes": total_splices }),
        ));
    }

    let layout = tray_layout(capacity);
    let mut plan = TrayPlan::default();
    let mut blocked = Vec::new();
    let mut kept = HashSet::new();

    for tray in existing {
        match layout.get((tray.number - 1) as usize) {
            Some(&target) => {
                if tray.splices > target as i64 {
                    blocked.push(json!({
                        "bandeja": tray.number,
                        "capacidade": target,
                        "fusoes": tray.splices,
                    }));
                } else if tray.capacity != target {
                    plan.resize.push((tray.id, target));
                }
                kept.insert(tray.number);
            }
            _ => {
                if tray.splices > 0 {
                    blocked.push(json!({
                        "bandeja": tray.number,
                        "capacidade": 0,
                        "fusoes": tray.splices,
                    }));
                }
                plan.delete.push(tray.id);
            }
        }
    }

    if !blocked.is_empty() {
        return Err(AppError::invariant(
            "A nova capacidade removeria ou encolheria bandejas com fusões.",
            json!({ "capacidade": capacity, "bandejasBloqueadas": blocked }),
        ));
    }

    plan.create = layout
        .iter()
        .enumerate()
        .map(|(i, &cap)| (i as i32 + 1, cap))
        .filter(|(number, _)| !kept.contains(number))
        .collect();

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn port(number: i32, status: PortStatus) -> Port {
        Port {
            id: Uuid::new_v4(),
            enclosure_id: Uuid::nil(),
            number,
            status,
            updated_at: Utc::now(),
        }
    }

    fn ports(capacity: i32) -> Vec<Port> {
        (1..=capacity).map(|n| port(n, PortStatus::Free)).collect()
    }

    fn tray(number: i32, capacity: i32, splices: i64) -> TrayWithUsage {
        TrayWithUsage {
            id: Uuid::new_v4(),
            enclosure_id: Uuid::nil(),
            number,
            capacity,
            updated_at: Utc::now(),
            splices,
        }
    }

    fn trays(capacity: i32) -> Vec<TrayWithUsage> {
        tray_layout(capacity)
            .into_iter()
            .enumerate()
            .map(|(i, cap)| tray(i as i32 + 1, cap, 0))
            .collect()
    }

    fn details(err: AppError) -> serde_json::Value {
        match err {
            AppError::InvariantViolation { details, .. } => details,
            other => panic!("esperava InvariantViolation, veio {:?}", other),
        }
    }

    #[test]
    fn tray_layout_uses_twelve_per_tray_with_remainder_last() {
        assert_eq!(tray_layout(12), vec![12]);
        assert_eq!(tray_layout(30), vec![12, 12, 6]);
        assert_eq!(tray_layout(5), vec![5]);
        assert_eq!(tray_layout(48), vec![12, 12, 12, 12]);
        assert!(tray_layout(0).is_empty());
    }

    #[test]
    fn fresh_derivation_matches_capacity() {
        assert_eq!(fresh_ports(8).create, (1..=8).collect::<Vec<_>>());
        let plan = fresh_trays(30);
        assert_eq!(plan.create, vec![(1, 12), (2, 12), (3, 6)]);
        let total: i32 = plan.create.iter().map(|(_, c)| c).sum();
        assert_eq!(total, 30);
    }

    #[test]
    fn growing_a_terminal_only_creates_missing_ports() {
        let existing = ports(8);
        let plan = plan_port_resize(&existing, 16).unwrap();
        assert!(plan.delete.is_empty());
        assert_eq!(plan.create, (9..=16).collect::<Vec<_>>());
    }

    #[test]
    fn shrinking_a_terminal_removes_tail_free_ports() {
        let mut existing = ports(16);
        existing[2].status = PortStatus::InUse;
        let tail: Vec<Uuid> = existing[8..].iter().map(|p| p.id).collect();

        let plan = plan_port_resize(&existing, 8).unwrap();
        assert_eq!(plan.delete, tail);
        assert!(plan.create.is_empty());
        // 8 mantidas, incluindo a ocupada
        assert_eq!(existing.len() - plan.delete.len() + plan.create.len(), 8);
    }

    #[test]
    fn shrinking_below_busy_ports_is_rejected() {
        let mut existing = ports(8);
        for p in existing.iter_mut().take(5) {
            p.status = PortStatus::InUse;
        }
        let d = details(plan_port_resize(&existing, 4).unwrap_err());
        assert_eq!(d["portasEmUso"], 5);
        assert_eq!(d["capacidade"], 4);
    }

    #[test]
    fn reserved_and_faulty_ports_count_as_busy() {
        let mut existing = ports(4);
        existing[0].status = PortStatus::Reserved;
        existing[1].status = PortStatus::Faulty;
        existing[2].status = PortStatus::InUse;
        let d = details(plan_port_resize(&existing, 2).unwrap_err());
        assert_eq!(d["portasEmUso"], 3);
    }

    #[test]
    fn shrinking_past_a_busy_tail_port_is_rejected() {
        let mut existing = ports(16);
        existing[15].status = PortStatus::InUse;
        let d = details(plan_port_resize(&existing, 8).unwrap_err());
        assert_eq!(d["portasBloqueadas"], json!([16]));
    }

    #[test]
    fn unchanged_capacity_yields_empty_port_plan() {
        let existing = ports(8);
        assert!(plan_port_resize(&existing, 8).unwrap().is_empty());
    }

    #[test]
    fn missing_port_numbers_are_backfilled() {
        let mut existing = ports(8);
        existing.remove(3);
        let plan = plan_port_resize(&existing, 8).unwrap();
        assert_eq!(plan.create, vec![4]);
    }

    #[test]
    fn growing_a_splice_enclosure_resizes_last_tray_and_adds_trays() {
        let existing = trays(18); // [12, 6]
        let plan = plan_tray_resize(&existing, 30, 0).unwrap();
        assert_eq!(plan.resize, vec![(existing[1].id, 12)]);
        assert_eq!(plan.create, vec![(3, 6)]);
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn shrinking_a_splice_enclosure_below_splice_count_is_rejected() {
        let mut existing = trays(24);
        existing[0].splices = 10;
        let d = details(plan_tray_resize(&existing, 8, 10).unwrap_err());
        assert_eq!(d["fusoes"], 10);
    }

    #[test]
    fn unassigned_splices_still_count_against_capacity() {
        let existing = trays(24);
        assert!(plan_tray_resize(&existing, 12, 13).is_err());
        assert!(plan_tray_resize(&existing, 12, 12).is_ok());
    }

    #[test]
    fn removing_a_tray_that_holds_splices_is_rejected() {
        let mut existing = trays(36);
        existing[2].splices = 1;
        let d = details(plan_tray_resize(&existing, 24, 1).unwrap_err());
        assert_eq!(d["bandejasBloqueadas"][0]["bandeja"], 3);
    }

    #[test]
    fn shrinking_a_tray_below_its_splices_is_rejected() {
        let mut existing = trays(24);
        existing[1].splices = 8;
        let d = details(plan_tray_resize(&existing, 18, 8).unwrap_err());
        assert_eq!(d["bandejasBloqueadas"][0]["capacidade"], 6);
    }

    #[test]
    fn idle_trays_are_removed_on_shrink() {
        let existing = trays(36);
        let plan = plan_tray_resize(&existing, 12, 0).unwrap();
        assert_eq!(plan.delete, vec![existing[1].id, existing[2].id]);
        assert!(plan.create.is_empty());
        assert!(plan.resize.is_empty());
    }

    #[test]
    fn kind_change_requires_an_idle_enclosure() {
        let idle = EnclosureUsage { ports: 8, busy_ports: 0, trays: 0, splices: 0 };
        assert!(check_kind_change(&idle).is_ok());

        let busy = EnclosureUsage { busy_ports: 1, ..idle };
        assert!(check_kind_change(&busy).is_err());

        let spliced = EnclosureUsage { ports: 0, busy_ports: 0, trays: 2, splices: 1 };
        assert!(check_kind_change(&spliced).is_err());
    }
}
